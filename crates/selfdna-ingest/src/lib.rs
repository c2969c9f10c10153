//! selfdna ingest library
//!
//! Turns a personal variant call file into a queryable SQLite database,
//! enriching each variant with GWAS Catalog associations on the way.
//!
//! # Modules
//!
//! - **vcf**: lazy reading and parsing of VCF data lines
//! - **gwas**: best-effort GWAS Catalog annotation client
//! - **progress**: lock-free progress reporting and display
//! - **pipeline**: count, annotate and store one file transactionally
//! - **store**: the per-sample `variants` table and read queries
//! - **session**: sample to database mapping
//!
//! # Example
//!
//! ```no_run
//! use selfdna_ingest::config::IngestConfig;
//! use selfdna_ingest::gwas::{GwasClient, GwasConfig};
//! use selfdna_ingest::pipeline::IngestPipeline;
//! use selfdna_ingest::store::VariantStore;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = GwasClient::new(GwasConfig::default())?;
//!     let pipeline = IngestPipeline::new(client, IngestConfig::default());
//!     let store = VariantStore::open("databases/sample.db").await?;
//!
//!     let report = pipeline
//!         .ingest_file("sample.vcf", &store, &CancellationToken::new())
//!         .await?;
//!     println!("{} variants stored", report.rows_written);
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod gwas;
pub mod pipeline;
pub mod progress;
pub mod session;
pub mod store;
pub mod vcf;
