// GWAS Catalog Annotation Module
//
// Enriches a variant with data from the NHGRI-EBI GWAS Catalog REST API
// (https://www.ebi.ac.uk/gwas/rest/api/). One annotation is a chain of three
// GET requests:
// - Variant: singleNucleotidePolymorphisms/{rsid} -> functional class, region,
//   link to the variant's associations
// - Associations: list of reported associations, each with a p-value and a
//   link to its originating study
// - Study: trait name and PubMed reference
//
// Annotation is best-effort. Failures anywhere in the chain collapse to an
// absent AnnotationResult at the client boundary; GwasError never escapes
// `Annotator::annotate`.

pub mod client;
pub mod config;
pub mod models;

pub use client::{format_p_value, GwasClient, ASSOCIATION_SEPARATOR};
pub use config::{GwasConfig, GwasConfigBuilder};

use async_trait::async_trait;
use selfdna_common::types::AnnotationResult;

/// Result type for GWAS lookups
pub type Result<T> = std::result::Result<T, GwasError>;

/// Reasons a single lookup chain fails
#[derive(Debug, thiserror::Error)]
pub enum GwasError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Missing field in response: {0}")]
    MissingField(&'static str),

    #[error("No associations with a numeric p-value")]
    NoAssociations,

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Configuration error: {0}")]
    Config(#[from] selfdna_common::SelfDnaError),
}

impl From<url::ParseError> for GwasError {
    fn from(err: url::ParseError) -> Self {
        GwasError::InvalidUrl(err.to_string())
    }
}

/// Source of variant annotations
///
/// Implementations never fail: any problem yields [`AnnotationResult::absent`].
#[async_trait]
pub trait Annotator: Send + Sync {
    /// `alt_allele` is only used for logging; the risk allele is not compared.
    async fn annotate(&self, identifier: &str, alt_allele: &str) -> AnnotationResult;
}
