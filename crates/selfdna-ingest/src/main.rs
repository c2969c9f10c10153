//! selfdna-ingest - VCF ingestion and annotation tool

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::ProgressBar;
use selfdna_common::logging::{init_logging, LogConfig, LogLevel};
use selfdna_common::types::VariantColumn;
use selfdna_ingest::config::IngestConfig;
use selfdna_ingest::gwas::{GwasClient, GwasConfig};
use selfdna_ingest::pipeline::{IngestPipeline, IngestStatus};
use selfdna_ingest::progress::{create_progress_bar, spawn_monitor};
use selfdna_ingest::session::SampleSession;
use selfdna_ingest::store::{SortDirection, VariantQuery, VariantStore};
use selfdna_ingest::vcf::{VariantSource, VcfSource};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "selfdna-ingest")]
#[command(author, version, about = "Ingest personal VCF files with GWAS Catalog annotations")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Annotate a VCF file and store it in a sample database
    Ingest {
        /// VCF file (plain or gzip compressed)
        vcf: PathBuf,

        /// Destination database (defaults to the first sample's database)
        #[arg(long)]
        db: Option<PathBuf>,

        /// Directory for per-sample databases
        #[arg(long, env = "SELFDNA_DB_DIR")]
        db_dir: Option<PathBuf>,

        /// Annotation lookups in flight at once
        #[arg(short, long, env = "SELFDNA_CONCURRENCY")]
        concurrency: Option<usize>,

        /// GWAS Catalog REST API base URL
        #[arg(long, env = "GWAS_BASE_URL")]
        gwas_url: Option<String>,

        /// Disable the progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// List the samples declared by a VCF file
    Samples {
        /// VCF file (plain or gzip compressed)
        vcf: PathBuf,
    },

    /// Read variants back from a sample database
    Query {
        /// Sample database
        db: PathBuf,

        /// Preset view
        #[arg(long, value_enum)]
        view: Option<View>,

        /// Column to sort by (e.g. MINPVALUE)
        #[arg(long)]
        sort: Option<String>,

        /// Sort descending
        #[arg(long)]
        desc: bool,

        #[arg(long)]
        limit: Option<u64>,

        #[arg(long)]
        offset: Option<u64>,

        /// Print rows as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum View {
    Associations,
    Pathogenicity,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("selfdna-ingest")
        .build();

    // Environment variables take precedence
    let log_config = LogConfig::from_env_with(log_config)?;
    let _guard = init_logging(&log_config)?;

    match cli.command {
        Command::Ingest {
            vcf,
            db,
            db_dir,
            concurrency,
            gwas_url,
            no_progress,
        } => {
            let mut config = IngestConfig::from_env()?;
            if let Some(dir) = db_dir {
                config.db_dir = dir;
            }
            if let Some(n) = concurrency {
                config.concurrency = n;
            }
            config.validate()?;

            let mut gwas_config = GwasConfig::from_env()?;
            if let Some(url) = gwas_url {
                gwas_config.base_url = url;
            }

            run_ingest(vcf, db, config, gwas_config, no_progress).await
        },
        Command::Samples { vcf } => run_samples(vcf),
        Command::Query {
            db,
            view,
            sort,
            desc,
            limit,
            offset,
            json,
        } => {
            let mut query = match view {
                Some(View::Associations) => VariantQuery::associations_view(),
                Some(View::Pathogenicity) => VariantQuery::pathogenicity_view(),
                None => VariantQuery::new(),
            };
            if let Some(column) = sort {
                let column: VariantColumn = column.parse()?;
                let direction = if desc {
                    SortDirection::Desc
                } else {
                    SortDirection::Asc
                };
                query = query.sort_by(column, direction);
            }
            if let Some(limit) = limit {
                query = query.limit(limit);
            }
            if let Some(offset) = offset {
                query = query.offset(offset);
            }

            run_query(db, query, json).await
        },
    }
}

async fn run_ingest(
    vcf: PathBuf,
    db: Option<PathBuf>,
    config: IngestConfig,
    gwas_config: GwasConfig,
    no_progress: bool,
) -> Result<()> {
    let source =
        VcfSource::open(&vcf).with_context(|| format!("Failed to open {}", vcf.display()))?;

    let session = SampleSession::new(source.samples(), &config.db_dir);
    for entry in session.entries() {
        info!(
            sample = %entry.sample,
            internal_id = %entry.internal_id,
            db = %entry.db_path.display(),
            "Registered sample"
        );
    }

    let db_path = match (db, session.primary()) {
        (Some(path), _) => path,
        (None, Some(entry)) => entry.db_path.clone(),
        (None, None) => bail!(
            "{} declares no samples; pass --db to choose a destination",
            vcf.display()
        ),
    };

    let store = VariantStore::open(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    let client = GwasClient::new(gwas_config)?;
    let pipeline = IngestPipeline::new(client, config.clone());

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling ingestion");
                cancel.cancel();
            }
        })
    };

    let bar = if no_progress {
        ProgressBar::hidden()
    } else {
        create_progress_bar(0, &format!("Processing {}", vcf.display()))
    };
    let stop_monitor = CancellationToken::new();
    let monitor = spawn_monitor(
        pipeline.progress(),
        config.progress_interval(),
        bar.clone(),
        stop_monitor.clone(),
    );

    let result = pipeline.ingest(&source, &store, &cancel).await;

    stop_monitor.cancel();
    if let Err(e) = monitor.await {
        warn!(error = %e, "Progress monitor failed");
    }
    interrupt.abort();
    bar.finish_and_clear();
    store.close().await;

    let report = result?;

    match report.status() {
        IngestStatus::Complete => info!("All lookups succeeded"),
        IngestStatus::PartiallyAnnotated => warn!(
            lookup_failed = report.lookup_failed,
            "Some variants were stored without annotation"
        ),
    }

    println!(
        "Stored {} variants in {}",
        report.rows_written,
        db_path.display()
    );
    println!(
        "  annotated: {}, lookup failed: {}, no identifier: {}",
        report.annotated, report.lookup_failed, report.skipped_no_id
    );

    Ok(())
}

fn run_samples(vcf: PathBuf) -> Result<()> {
    let source =
        VcfSource::open(&vcf).with_context(|| format!("Failed to open {}", vcf.display()))?;

    if source.samples().is_empty() {
        println!("{} declares no samples", vcf.display());
    }
    for sample in source.samples() {
        println!("{}", sample);
    }

    Ok(())
}

async fn run_query(db: PathBuf, query: VariantQuery, json: bool) -> Result<()> {
    if !db.exists() {
        bail!("Database not found: {}", db.display());
    }

    let store = VariantStore::open(&db).await?;
    let rows = store.query(&query).await?;
    store.close().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let header: Vec<&str> = query.projection().iter().map(VariantColumn::as_str).collect();
    println!("{}", header.join("\t"));
    for row in &rows {
        let cells: Vec<String> = row.cells().iter().map(|(_, v)| v.to_string()).collect();
        println!("{}", cells.join("\t"));
    }
    info!(rows = rows.len(), "Query complete");

    Ok(())
}
