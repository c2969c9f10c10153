// Variant store
//
// One SQLite database per sample with a single append-only `variants` table.
// Column names and affinities are fixed by `VariantColumn` and are read by
// other tools, so they must not change.

pub mod query;

pub use query::{CellValue, Filter, SortDirection, VariantQuery, VariantRow};

use selfdna_common::types::{AnnotationResult, EnrichedVariant, VariantColumn, VariantRecord};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

pub const TABLE_NAME: &str = "variants";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Result type for store operations
pub type Result<T> = std::result::Result<T, sqlx::Error>;

/// Handle to one sample's variant database
#[derive(Debug, Clone)]
pub struct VariantStore {
    pool: SqlitePool,
}

impl VariantStore {
    /// Open (creating if needed) the database file at `path`
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let newly_created = !path.exists();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        if newly_created {
            info!("Initialized new variant database: {}", path.display());
        } else {
            info!("Opened existing variant database: {}", path.display());
        }

        Ok(Self { pool })
    }

    /// Private in-memory database, mostly for tests
    pub async fn in_memory() -> Result<Self> {
        // every connection to :memory: is a separate database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the `variants` table if it does not exist
    pub async fn create_schema(&self) -> Result<()> {
        sqlx::query(&create_table_sql()).execute(&self.pool).await?;
        debug!(table = TABLE_NAME, "Ensured variant schema");
        Ok(())
    }

    /// Start an all-or-nothing batch of inserts
    pub async fn begin(&self) -> Result<VariantWriter> {
        Ok(VariantWriter {
            tx: self.pool.begin().await?,
            insert_sql: insert_sql(),
            written: 0,
        })
    }

    /// Number of committed rows
    pub async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", TABLE_NAME))
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// All rows in insertion order
    pub async fn variants(&self) -> Result<Vec<EnrichedVariant>> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY rowid",
            column_list(&VariantColumn::ALL),
            TABLE_NAME
        );

        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(enriched_from_row).collect()
    }

    /// Run a read query against committed rows
    pub async fn query(&self, query: &VariantQuery) -> Result<Vec<VariantRow>> {
        let mut builder = query.to_builder();
        let rows = builder.build().fetch_all(&self.pool).await?;

        debug!(rows = rows.len(), sql = builder.sql(), "Executed variant query");

        rows.iter()
            .map(|row| VariantRow::from_row(row, query.projection()))
            .collect()
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Pending inserts inside one transaction.
///
/// Dropping a writer without committing discards its rows.
pub struct VariantWriter {
    tx: Transaction<'static, Sqlite>,
    insert_sql: String,
    written: u64,
}

impl VariantWriter {
    pub async fn insert(&mut self, variant: &EnrichedVariant) -> Result<()> {
        let record = &variant.record;
        let annotation = &variant.annotation;
        let position =
            i64::try_from(record.position).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

        sqlx::query(&self.insert_sql)
            .bind(&record.chromosome)
            .bind(position)
            .bind(&record.identifier)
            .bind(&record.reference)
            .bind(&record.alternate)
            .bind(record.quality)
            .bind(&record.filter)
            .bind(&annotation.region)
            .bind(&annotation.functional_class)
            .bind(annotation.min_p_value)
            .bind(&annotation.associations)
            .bind(&variant.pathogenicity)
            .execute(&mut *self.tx)
            .await?;

        self.written += 1;
        Ok(())
    }

    /// Rows inserted so far (not yet visible to readers)
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Make every insert visible; returns the row count
    pub async fn commit(self) -> Result<u64> {
        self.tx.commit().await?;
        Ok(self.written)
    }

    pub async fn rollback(self) -> Result<()> {
        self.tx.rollback().await
    }
}

fn column_list(columns: &[VariantColumn]) -> String {
    columns
        .iter()
        .map(VariantColumn::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn create_table_sql() -> String {
    let columns = VariantColumn::ALL
        .iter()
        .map(|c| format!("    {} {}", c.as_str(), c.sql_type()))
        .collect::<Vec<_>>()
        .join(",\n");

    format!("CREATE TABLE IF NOT EXISTS {} (\n{}\n)", TABLE_NAME, columns)
}

/// Placeholders follow `VariantColumn::ALL` order
fn insert_sql() -> String {
    let placeholders = vec!["?"; VariantColumn::ALL.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        TABLE_NAME,
        column_list(&VariantColumn::ALL),
        placeholders
    )
}

fn enriched_from_row(row: &SqliteRow) -> Result<EnrichedVariant> {
    let position: i64 = row.try_get(VariantColumn::Pos.as_str())?;

    let record = VariantRecord {
        chromosome: row.try_get(VariantColumn::Chrom.as_str())?,
        position: u64::try_from(position).map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        identifier: row.try_get(VariantColumn::Id.as_str())?,
        reference: row.try_get(VariantColumn::Ref.as_str())?,
        alternate: row.try_get(VariantColumn::Alt.as_str())?,
        quality: row.try_get(VariantColumn::Qual.as_str())?,
        filter: row.try_get(VariantColumn::Filter.as_str())?,
        info: String::new(),
    };

    let annotation = AnnotationResult {
        functional_class: row.try_get(VariantColumn::Function.as_str())?,
        region: row.try_get(VariantColumn::Region.as_str())?,
        min_p_value: row.try_get(VariantColumn::MinPValue.as_str())?,
        associations: row.try_get(VariantColumn::Associations.as_str())?,
    };

    Ok(EnrichedVariant {
        record,
        annotation,
        pathogenicity: row.try_get(VariantColumn::Pathogenicity.as_str())?,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn variant(id: &str, annotation: AnnotationResult) -> EnrichedVariant {
        EnrichedVariant::new(
            VariantRecord {
                chromosome: "20".to_string(),
                position: 14370,
                identifier: id.to_string(),
                reference: "G".to_string(),
                alternate: "A".to_string(),
                quality: None,
                filter: "PASS".to_string(),
                info: "NS=3".to_string(),
            },
            annotation,
        )
    }

    #[test]
    fn test_schema_sql_lists_every_column() {
        let sql = create_table_sql();
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS variants"));
        assert!(sql.contains("POS INTEGER"));
        assert!(sql.contains("MINPVALUE REAL"));
        assert!(sql.contains("PATHOGENICITY TEXT"));
    }

    #[test]
    fn test_insert_sql_placeholders() {
        assert_eq!(insert_sql().matches('?').count(), 12);
    }

    #[tokio::test]
    async fn test_insert_commit_and_read_back() {
        let store = VariantStore::in_memory().await.unwrap();
        store.create_schema().await.unwrap();

        let annotated = AnnotationResult {
            functional_class: Some("intron_variant".to_string()),
            region: Some("20q12".to_string()),
            min_p_value: Some(0.01),
            associations: Some("Height [p = 0.01] [PubMed: 1]".to_string()),
        };

        let mut writer = store.begin().await.unwrap();
        writer.insert(&variant("rs1", annotated.clone())).await.unwrap();
        writer.insert(&variant(".", AnnotationResult::absent())).await.unwrap();
        assert_eq!(writer.written(), 2);
        assert_eq!(writer.commit().await.unwrap(), 2);

        let rows = store.variants().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].record.identifier, "rs1");
        assert_eq!(rows[0].annotation, annotated);
        assert_eq!(rows[1].record.identifier, ".");
        assert!(rows[1].annotation.is_absent());
        assert!(rows.iter().all(|r| r.pathogenicity.is_none()));
    }

    #[tokio::test]
    async fn test_rollback_discards_rows() {
        let store = VariantStore::in_memory().await.unwrap();
        store.create_schema().await.unwrap();

        let mut writer = store.begin().await.unwrap();
        writer.insert(&variant("rs1", AnnotationResult::absent())).await.unwrap();
        writer.rollback().await.unwrap();

        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_schema_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sample.db");

        let store = VariantStore::open(&path).await.unwrap();
        store.create_schema().await.unwrap();
        store.create_schema().await.unwrap();
        assert!(path.exists());
        assert_eq!(store.count().await.unwrap(), 0);
        store.close().await;
    }
}
