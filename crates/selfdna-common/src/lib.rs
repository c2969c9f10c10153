//! selfdna common library
//!
//! Shared types, logging, and error handling for the selfdna workspace.
//!
//! # Overview
//!
//! - **Types**: variant records, annotation results, progress state and the
//!   fixed column contract of the variant store
//! - **Error Handling**: common error type and result alias
//! - **Logging**: `tracing` subscriber setup shared by every binary
//!
//! # Example
//!
//! ```no_run
//! use selfdna_common::types::{AnnotationResult, EnrichedVariant, VariantRecord};
//!
//! fn enrich(record: VariantRecord) -> EnrichedVariant {
//!     EnrichedVariant::new(record, AnnotationResult::absent())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{Result, SelfDnaError};
