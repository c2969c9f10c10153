// Variant ingestion pipeline
//
// Reads a variant file, annotates each record and appends it to a variant
// store inside one transaction:
// 1. Ensure the destination table exists
// 2. Count data lines (first pass) and reset progress to (0, total)
//    (an empty file leaves progress idle)
// 3. Annotate and insert records in file order (second pass)
// 4. Commit
//
// A parse error, storage error or cancellation rolls the transaction back so
// the destination never holds a partial file, and returns progress to idle. Annotation failures are not
// errors; the record is stored without annotation.

use crate::config::IngestConfig;
use crate::gwas::Annotator;
use crate::progress::ProgressReporter;
use crate::store::{VariantStore, VariantWriter};
use crate::vcf::{VariantSource, VcfError, VcfSource};
use futures::stream::{self, StreamExt};
use selfdna_common::types::{AnnotationResult, EnrichedVariant, VariantRecord};
use selfdna_common::SelfDnaError;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Result type for ingestion
pub type Result<T> = std::result::Result<T, IngestError>;

/// Fatal ingestion failures. Nothing is committed when one is returned.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Parse error: {0}")]
    Parse(#[from] VcfError),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] SelfDnaError),

    #[error("Ingestion cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IngestStatus {
    /// Every lookup that was attempted produced an annotation
    Complete,
    /// All rows stored, but some lookups came back empty
    PartiallyAnnotated,
}

/// Outcome of a successful run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Data lines counted in the first pass
    pub total: u64,
    pub rows_written: u64,
    pub annotated: u64,
    /// Lookups that ended without an annotation
    pub lookup_failed: u64,
    /// Records with no identifier to look up
    pub skipped_no_id: u64,
}

impl IngestReport {
    pub fn status(&self) -> IngestStatus {
        if self.lookup_failed > 0 {
            IngestStatus::PartiallyAnnotated
        } else {
            IngestStatus::Complete
        }
    }

    fn record(&mut self, lookup: &Lookup) {
        self.rows_written += 1;
        match lookup {
            Lookup::Annotated(_) => self.annotated += 1,
            Lookup::Failed => self.lookup_failed += 1,
            Lookup::Skipped => self.skipped_no_id += 1,
        }
    }
}

/// What annotation produced for one record
enum Lookup {
    Annotated(AnnotationResult),
    Failed,
    Skipped,
}

impl Lookup {
    fn into_annotation(self) -> AnnotationResult {
        match self {
            Lookup::Annotated(annotation) => annotation,
            Lookup::Failed | Lookup::Skipped => AnnotationResult::absent(),
        }
    }
}

/// Drives one file into one store
pub struct IngestPipeline<A> {
    annotator: Arc<A>,
    progress: Arc<ProgressReporter>,
    config: IngestConfig,
}

impl<A: Annotator> IngestPipeline<A> {
    pub fn new(annotator: A, config: IngestConfig) -> Self {
        Self {
            annotator: Arc::new(annotator),
            progress: Arc::new(ProgressReporter::new()),
            config,
        }
    }

    /// Report progress through a reporter shared with observers
    pub fn with_progress(mut self, progress: Arc<ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn progress(&self) -> Arc<ProgressReporter> {
        Arc::clone(&self.progress)
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Open a VCF by path and ingest it
    pub async fn ingest_file(
        &self,
        path: impl AsRef<Path>,
        store: &VariantStore,
        cancel: &CancellationToken,
    ) -> Result<IngestReport> {
        let source = VcfSource::open(path)?;
        self.ingest(&source, store, cancel).await
    }

    /// Ingest every record of `source` into `store`.
    ///
    /// Records are written and progress advanced strictly in file order, even
    /// when several lookups are in flight.
    #[instrument(skip_all, fields(concurrency = self.config.concurrency))]
    pub async fn ingest<S>(
        &self,
        source: &S,
        store: &VariantStore,
        cancel: &CancellationToken,
    ) -> Result<IngestReport>
    where
        S: VariantSource + ?Sized,
    {
        self.config.validate()?;

        info!("Step 1/4: Preparing variant table...");
        store.create_schema().await?;

        info!("Step 2/4: Counting variants...");
        let total = source.count_records()?;
        if total == 0 {
            self.progress.clear();
        } else {
            self.progress.reset(total);
        }
        info!("Found {} variants", total);

        info!("Step 3/4: Annotating and storing variants...");
        let mut writer = store.begin().await?;
        let report = match self.write_records(source, &mut writer, total, cancel).await {
            Ok(report) => report,
            Err(e) => {
                self.progress.clear();
                if let Err(rollback_err) = writer.rollback().await {
                    error!(error = %rollback_err, "Rollback failed");
                }
                return Err(e);
            },
        };

        info!("Step 4/4: Committing {} rows...", report.rows_written);
        writer.commit().await?;

        info!(
            rows = report.rows_written,
            annotated = report.annotated,
            lookup_failed = report.lookup_failed,
            skipped_no_id = report.skipped_no_id,
            "Ingestion complete"
        );

        Ok(report)
    }

    /// Annotate and insert every record; the caller commits or rolls back
    async fn write_records<S>(
        &self,
        source: &S,
        writer: &mut VariantWriter,
        total: u64,
        cancel: &CancellationToken,
    ) -> Result<IngestReport>
    where
        S: VariantSource + ?Sized,
    {
        let mut report = IngestReport {
            total,
            ..IngestReport::default()
        };

        let annotator = self.annotator.as_ref();
        let enriched = stream::iter(source.records()?)
            .map(|item| async move {
                let record = item?;
                let lookup = enrich(annotator, &record).await;
                Ok::<_, VcfError>((record, lookup))
            })
            .buffered(self.config.concurrency.max(1));
        let mut enriched = std::pin::pin!(enriched);

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(rows = report.rows_written, "Ingestion cancelled, rolling back");
                    return Err(IngestError::Cancelled);
                },
                next = enriched.next() => next,
            };

            let Some(item) = next else {
                break;
            };

            let (record, lookup) = match item {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(error = %e, rows = report.rows_written, "Parse failure, rolling back");
                    return Err(e.into());
                },
            };

            report.record(&lookup);
            writer
                .insert(&EnrichedVariant::new(record, lookup.into_annotation()))
                .await?;
            self.progress.advance(report.rows_written, total);
        }

        Ok(report)
    }
}

async fn enrich<A: Annotator + ?Sized>(annotator: &A, record: &VariantRecord) -> Lookup {
    let Some(id) = record.lookup_id() else {
        debug!(
            chrom = %record.chromosome,
            pos = record.position,
            "No identifier, skipping lookup"
        );
        return Lookup::Skipped;
    };

    let annotation = annotator.annotate(id, &record.alternate).await;
    if annotation.is_absent() {
        Lookup::Failed
    } else {
        Lookup::Annotated(annotation)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Annotates identifiers listed in `known`; everything else fails
    struct FakeAnnotator {
        known: Vec<&'static str>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeAnnotator {
        fn new(known: Vec<&'static str>) -> Self {
            Self {
                known,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Annotator for FakeAnnotator {
        async fn annotate(&self, identifier: &str, _alt_allele: &str) -> AnnotationResult {
            self.calls.lock().unwrap().push(identifier.to_string());
            if self.known.iter().any(|known| *known == identifier) {
                AnnotationResult {
                    functional_class: Some("missense_variant".to_string()),
                    region: Some("1p36.33".to_string()),
                    min_p_value: Some(1e-9),
                    associations: Some(format!("Trait of {} [p = 1e-09] [PubMed: 1]", identifier)),
                }
            } else {
                AnnotationResult::absent()
            }
        }
    }

    const VCF: &str = "##fileformat=VCFv4.2\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tS1\n\
1\t100\trs1\tA\tG\t50\tPASS\t.\tGT\t0/1\n\
1\t200\t.\tC\tT\t.\tPASS\t.\tGT\t1/1\n\
1\t300\trs3\tG\tA\t20\tq10\t.\tGT\t0/1\n";

    #[test]
    fn test_report_status() {
        let mut report = IngestReport::default();
        report.record(&Lookup::Skipped);
        assert_eq!(report.status(), IngestStatus::Complete);
        report.record(&Lookup::Failed);
        assert_eq!(report.status(), IngestStatus::PartiallyAnnotated);
        assert_eq!(report.rows_written, 2);
    }

    #[tokio::test]
    async fn test_ingest_counts_outcomes() {
        let source = VcfSource::from_reader(VCF.as_bytes()).unwrap();
        let store = VariantStore::in_memory().await.unwrap();
        let pipeline = IngestPipeline::new(FakeAnnotator::new(vec!["rs1"]), IngestConfig::default());

        let report = pipeline
            .ingest(&source, &store, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.total, 3);
        assert_eq!(report.rows_written, 3);
        assert_eq!(report.annotated, 1);
        assert_eq!(report.lookup_failed, 1);
        assert_eq!(report.skipped_no_id, 1);
        assert_eq!(report.status(), IngestStatus::PartiallyAnnotated);

        // the record without an identifier never reaches the annotator
        assert_eq!(*pipeline.annotator.calls.lock().unwrap(), vec!["rs1", "rs3"]);

        let rows = store.variants().await.unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows[0].annotation.associations.is_some());
        assert!(rows[1].annotation.is_absent());
        assert!(rows[2].annotation.is_absent());
        assert_eq!(pipeline.progress().snapshot().processed, 3);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_commits_nothing() {
        let source = VcfSource::from_reader(VCF.as_bytes()).unwrap();
        let store = VariantStore::in_memory().await.unwrap();
        let pipeline = IngestPipeline::new(FakeAnnotator::new(vec![]), IngestConfig::default());

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = pipeline.ingest(&source, &store, &cancel).await.unwrap_err();
        assert!(matches!(err, IngestError::Cancelled));
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
