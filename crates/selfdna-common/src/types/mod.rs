//! Domain types shared by the parser, the annotation client, the ingestion
//! pipeline and the variant store.

use crate::error::SelfDnaError;
use serde::{Deserialize, Serialize};

/// Placeholder VCF uses for an unknown value.
pub const MISSING_VALUE: &str = ".";

// ============================================================================
// Variant Records
// ============================================================================

/// One data line of a variant call file, before enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantRecord {
    pub chromosome: String,
    /// 1-based position, always positive
    pub position: u64,
    /// Identifier as written in the file (may be empty or `.`)
    pub identifier: String,
    pub reference: String,
    pub alternate: String,
    /// `None` when the file carries the `.` placeholder
    pub quality: Option<f64>,
    pub filter: String,
    /// Raw INFO column, kept for completeness but unused by enrichment
    pub info: String,
}

impl VariantRecord {
    /// Identifier suitable for a remote lookup, or `None` when the file has
    /// no identifier for this variant.
    pub fn lookup_id(&self) -> Option<&str> {
        let id = self.identifier.trim();
        if id.is_empty() || id == MISSING_VALUE {
            None
        } else {
            Some(id)
        }
    }
}

/// Compact summary of the remote association lookup for one variant.
///
/// A failed lookup, including one that finds no association with a numeric
/// p-value, yields every field absent. On success `min_p_value` and
/// `associations` are set; `functional_class`/`region` only when the catalog
/// has them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationResult {
    pub functional_class: Option<String>,
    pub region: Option<String>,
    pub min_p_value: Option<f64>,
    pub associations: Option<String>,
}

impl AnnotationResult {
    /// The "no annotation" result
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn is_absent(&self) -> bool {
        self.functional_class.is_none()
            && self.region.is_none()
            && self.min_p_value.is_none()
            && self.associations.is_none()
    }
}

/// The unit persisted to the variant store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedVariant {
    pub record: VariantRecord,
    pub annotation: AnnotationResult,
    /// Clinical significance, populated by a separate subsystem; always
    /// `None` at ingestion time.
    pub pathogenicity: Option<String>,
}

impl EnrichedVariant {
    pub fn new(record: VariantRecord, annotation: AnnotationResult) -> Self {
        Self {
            record,
            annotation,
            pathogenicity: None,
        }
    }
}

// ============================================================================
// Progress
// ============================================================================

/// Total used when no ingestion is running or being displayed.
pub const IDLE_TOTAL: u64 = 1;

/// `(processed, total)` pair observed by progress pollers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    pub processed: u64,
    pub total: u64,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self {
            processed: 0,
            total: IDLE_TOTAL,
        }
    }
}

impl ProgressState {
    pub fn new(processed: u64, total: u64) -> Self {
        Self { processed, total }
    }

    /// A total of 1 means "nothing to show", not "one record".
    pub fn is_idle(&self) -> bool {
        self.total == IDLE_TOTAL
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.processed as f64 / self.total as f64) * 100.0
    }

    /// Status line for display, `None` while idle or for an empty run
    pub fn render(&self) -> Option<String> {
        if self.is_idle() || self.total == 0 {
            return None;
        }
        Some(format!(
            "Processing: {}/{} variants ({:.2}%).",
            self.processed,
            self.total,
            self.percent()
        ))
    }
}

// ============================================================================
// Variant Store Column Contract
// ============================================================================

/// Columns of the `variants` table. Names are an on-disk contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariantColumn {
    Chrom,
    Pos,
    Id,
    Ref,
    Alt,
    Qual,
    Filter,
    Region,
    Function,
    MinPValue,
    Associations,
    Pathogenicity,
}

impl VariantColumn {
    /// All columns in table order
    pub const ALL: [VariantColumn; 12] = [
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
        VariantColumn::Pathogenicity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VariantColumn::Chrom => "CHROM",
            VariantColumn::Pos => "POS",
            VariantColumn::Id => "ID",
            VariantColumn::Ref => "REF",
            VariantColumn::Alt => "ALT",
            VariantColumn::Qual => "QUAL",
            VariantColumn::Filter => "FILTER",
            VariantColumn::Region => "REGION",
            VariantColumn::Function => "FUNCTION",
            VariantColumn::MinPValue => "MINPVALUE",
            VariantColumn::Associations => "ASSOCIATIONS",
            VariantColumn::Pathogenicity => "PATHOGENICITY",
        }
    }

    /// SQLite affinity of the column
    pub fn sql_type(&self) -> &'static str {
        match self {
            VariantColumn::Pos => "INTEGER",
            VariantColumn::Qual | VariantColumn::MinPValue => "REAL",
            _ => "TEXT",
        }
    }
}

impl std::str::FromStr for VariantColumn {
    type Err = SelfDnaError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        VariantColumn::ALL
            .into_iter()
            .find(|c| c.as_str() == upper)
            .ok_or_else(|| SelfDnaError::Parse(format!("Unknown variant column: {}", s)))
    }
}

impl std::fmt::Display for VariantColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(identifier: &str) -> VariantRecord {
        VariantRecord {
            chromosome: "20".to_string(),
            position: 14370,
            identifier: identifier.to_string(),
            reference: "G".to_string(),
            alternate: "A".to_string(),
            quality: Some(29.0),
            filter: "PASS".to_string(),
            info: ".".to_string(),
        }
    }

    #[test]
    fn test_lookup_id_skips_placeholders() {
        assert_eq!(record("rs6054257").lookup_id(), Some("rs6054257"));
        assert_eq!(record(".").lookup_id(), None);
        assert_eq!(record("").lookup_id(), None);
    }

    #[test]
    fn test_enriched_variant_has_no_pathogenicity() {
        let enriched = EnrichedVariant::new(record("rs1"), AnnotationResult::absent());
        assert!(enriched.pathogenicity.is_none());
        assert!(enriched.annotation.is_absent());
    }

    #[test]
    fn test_idle_progress_renders_nothing() {
        assert!(ProgressState::default().is_idle());
        assert_eq!(ProgressState::default().render(), None);
        assert_eq!(
            ProgressState::new(1, 4).render().as_deref(),
            Some("Processing: 1/4 variants (25.00%).")
        );
    }

    #[test]
    fn test_column_from_str_is_case_insensitive() {
        assert_eq!("minpvalue".parse::<VariantColumn>().unwrap(), VariantColumn::MinPValue);
        assert_eq!(" Chrom ".parse::<VariantColumn>().unwrap(), VariantColumn::Chrom);
        assert!("DROP TABLE".parse::<VariantColumn>().is_err());
    }

    proptest! {
        #[test]
        fn prop_percent_within_bounds(total in 2u64..1_000_000, frac in 0.0f64..=1.0) {
            let processed = ((total as f64) * frac) as u64;
            let pct = ProgressState::new(processed, total).percent();
            prop_assert!((0.0..=100.0).contains(&pct));
        }
    }
}
