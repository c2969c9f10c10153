// Variant Call Format (VCF) reading
//
// Lines starting with '#' are metadata/header lines. The '#CHROM' header
// declares the samples; every other retained line is a tab-delimited variant
// with at least eight positional columns:
// CHROM POS ID REF ALT QUAL FILTER INFO [FORMAT SAMPLE...]

pub mod reader;

pub use reader::{parse_line, VcfRecords, VcfSource};

use selfdna_common::types::VariantRecord;

/// Minimum number of tab-separated columns on a data line
pub const REQUIRED_FIELDS: usize = 8;

/// Result type for VCF operations
pub type Result<T> = std::result::Result<T, VcfError>;

/// Errors that abort an ingestion run
#[derive(Debug, thiserror::Error)]
pub enum VcfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Line {line}: expected at least 8 tab-separated fields, found {found}")]
    MalformedLine { line: usize, found: usize },

    #[error("Line {line}: invalid position '{value}'")]
    InvalidPosition { line: usize, value: String },

    #[error("Line {line}: invalid quality '{value}'")]
    InvalidQuality { line: usize, value: String },
}

/// Read access to a variant file, independent of where its bytes live.
///
/// `records` may be called more than once; every call starts a fresh pass
/// from the first line, which is what lets the pipeline count before it
/// processes.
pub trait VariantSource: Send + Sync {
    /// Sample names declared on the `#CHROM` header line
    fn samples(&self) -> &[String];

    /// Number of data lines (metadata, header and blank lines excluded)
    fn count_records(&self) -> Result<u64>;

    /// Lazy pass over the data lines in file order
    fn records(&self) -> Result<VcfRecords<'_>>;
}

/// Iterator item produced by [`VcfRecords`]
pub type RecordResult = Result<VariantRecord>;
