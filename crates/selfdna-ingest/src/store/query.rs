// Read queries over the variants table

use super::{Result, TABLE_NAME};
use selfdna_common::types::VariantColumn;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};
use std::fmt;

/// Row predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Equals(VariantColumn, String),
    NotNull(VariantColumn),
    /// Neither NULL nor the empty string
    NonEmpty(VariantColumn),
    /// Substring match (`LIKE %value%`)
    Contains(VariantColumn, String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Projection, filters, ordering and paging for a read.
///
/// Column names only ever come from [`VariantColumn`]; user values are bound.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantQuery {
    columns: Vec<VariantColumn>,
    filters: Vec<Filter>,
    sort: Option<(VariantColumn, SortDirection)>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl Default for VariantQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl VariantQuery {
    /// Every column, every row, insertion order
    pub fn new() -> Self {
        Self {
            columns: VariantColumn::ALL.to_vec(),
            filters: Vec::new(),
            sort: None,
            limit: None,
            offset: None,
        }
    }

    /// Variants with a GWAS association summary
    pub fn associations_view() -> Self {
        Self::new()
            .columns([
                VariantColumn::Chrom,
                VariantColumn::Pos,
                VariantColumn::Id,
                VariantColumn::Ref,
                VariantColumn::Alt,
                VariantColumn::Qual,
                VariantColumn::Filter,
                VariantColumn::Region,
                VariantColumn::Function,
                VariantColumn::MinPValue,
                VariantColumn::Associations,
            ])
            .filter(Filter::NonEmpty(VariantColumn::Associations))
    }

    /// Variants with a clinical significance
    pub fn pathogenicity_view() -> Self {
        Self::new()
            .columns([
                VariantColumn::Chrom,
                VariantColumn::Pos,
                VariantColumn::Id,
                VariantColumn::Ref,
                VariantColumn::Alt,
                VariantColumn::Qual,
                VariantColumn::Filter,
                VariantColumn::Region,
                VariantColumn::Function,
                VariantColumn::Pathogenicity,
            ])
            .filter(Filter::NonEmpty(VariantColumn::Pathogenicity))
    }

    /// Replace the projection; an empty list keeps every column
    pub fn columns(mut self, columns: impl IntoIterator<Item = VariantColumn>) -> Self {
        let columns: Vec<_> = columns.into_iter().collect();
        if !columns.is_empty() {
            self.columns = columns;
        }
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn sort_by(mut self, column: VariantColumn, direction: SortDirection) -> Self {
        self.sort = Some((column, direction));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn projection(&self) -> &[VariantColumn] {
        &self.columns
    }

    pub(crate) fn to_builder(&self) -> QueryBuilder<'static, Sqlite> {
        let mut builder = QueryBuilder::new("SELECT ");
        builder.push(
            self.columns
                .iter()
                .map(VariantColumn::as_str)
                .collect::<Vec<_>>()
                .join(", "),
        );
        builder.push(" FROM ").push(TABLE_NAME);

        for (idx, filter) in self.filters.iter().enumerate() {
            builder.push(if idx == 0 { " WHERE " } else { " AND " });
            match filter {
                Filter::Equals(column, value) => {
                    builder.push(column.as_str()).push(" = ").push_bind(value.clone());
                },
                Filter::NotNull(column) => {
                    builder.push(column.as_str()).push(" IS NOT NULL");
                },
                Filter::NonEmpty(column) => {
                    builder
                        .push(column.as_str())
                        .push(" IS NOT NULL AND ")
                        .push(column.as_str())
                        .push(" != ''");
                },
                Filter::Contains(column, value) => {
                    builder
                        .push(column.as_str())
                        .push(" LIKE ")
                        .push_bind(format!("%{}%", value));
                },
            }
        }

        match self.sort {
            Some((column, direction)) => {
                builder
                    .push(" ORDER BY ")
                    .push(column.as_str())
                    .push(" ")
                    .push(direction.as_sql())
                    .push(", rowid");
            },
            None => {
                builder.push(" ORDER BY rowid");
            },
        }

        // SQLite only accepts OFFSET after a LIMIT; -1 means unbounded
        if self.limit.is_some() || self.offset.is_some() {
            let limit = self.limit.map_or(-1, clamp_i64);
            builder.push(" LIMIT ").push_bind(limit);
        }
        if let Some(offset) = self.offset {
            builder.push(" OFFSET ").push_bind(clamp_i64(offset));
        }

        builder
    }
}

fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// A single cell of a query result
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Integer(v) => write!(f, "{}", v),
            CellValue::Real(v) => write!(f, "{}", v),
            CellValue::Text(v) => f.write_str(v),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            CellValue::Null => serializer.serialize_none(),
            CellValue::Integer(v) => serializer.serialize_i64(*v),
            CellValue::Real(v) => serializer.serialize_f64(*v),
            CellValue::Text(v) => serializer.serialize_str(v),
        }
    }
}

/// One result row, cells in projection order
#[derive(Debug, Clone, PartialEq)]
pub struct VariantRow {
    cells: Vec<(VariantColumn, CellValue)>,
}

impl VariantRow {
    pub(crate) fn from_row(row: &SqliteRow, columns: &[VariantColumn]) -> Result<Self> {
        let cells = columns
            .iter()
            .enumerate()
            .map(|(idx, column)| -> Result<(VariantColumn, CellValue)> {
                let value = match column.sql_type() {
                    "INTEGER" => row
                        .try_get::<Option<i64>, _>(idx)?
                        .map_or(CellValue::Null, CellValue::Integer),
                    "REAL" => row
                        .try_get::<Option<f64>, _>(idx)?
                        .map_or(CellValue::Null, CellValue::Real),
                    _ => row
                        .try_get::<Option<String>, _>(idx)?
                        .map_or(CellValue::Null, CellValue::Text),
                };
                Ok((*column, value))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { cells })
    }

    pub fn cells(&self) -> &[(VariantColumn, CellValue)] {
        &self.cells
    }

    pub fn get(&self, column: VariantColumn) -> Option<&CellValue> {
        self.cells
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, value)| value)
    }
}

impl Serialize for VariantRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (column, value) in &self.cells {
            map.serialize_entry(column.as_str(), value)?;
        }
        map.end()
    }
}
