mod aggregate;
mod dedup;
mod error;
mod normalize;
mod parser;
mod reader;
mod record;
mod settings;
mod sink;
mod stats;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use dedup::DedupStrategy;
use error::PipelineError;
use normalize::{NormalizeContext, Normalizer};
use reader::DocumentKind;
use record::{RawRecord, SalaryRecord};
use settings::PipelineConfig;
use stats::RunSummary;

#[derive(Parser)]
#[command(name = "salary_scraper", about = "Salary records from saved Glassdoor / Levels.fyi pages")]
struct Cli {
    /// Pipeline config file (TOML, JSON or YAML); SALARY_* env vars override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract and normalize records from HTML/CSV into a record CSV
    Extract {
        #[command(flatten)]
        ingest: IngestArgs,
        /// Output CSV (master schema)
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Fold a batch CSV into the master, replacing the batch's sources
    Merge {
        #[arg(long)]
        master: PathBuf,
        #[arg(long)]
        batch: PathBuf,
    },
    /// Write per-dimension summaries, employer ranking and the city x experience matrix
    Aggregate {
        #[arg(long)]
        master: PathBuf,
        #[arg(long, default_value = "aggregates")]
        out_dir: PathBuf,
    },
    /// Extract + merge into master + aggregate in one pipeline
    Run {
        #[command(flatten)]
        ingest: IngestArgs,
        #[arg(long)]
        master: PathBuf,
        #[arg(long, default_value = "aggregates")]
        out_dir: PathBuf,
    },
    /// Show master dataset statistics
    Stats {
        #[arg(long)]
        master: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
struct IngestArgs {
    /// levelsfyi, glassdoor or glassdoor-companies
    #[arg(short, long)]
    source: String,
    /// HTML/CSV file or a directory of them
    #[arg(short, long)]
    input: PathBuf,
    /// Collection date, YYYY-MM-DD (default: today)
    #[arg(long)]
    date: Option<NaiveDate>,
    /// Location for records whose page doesn't name one
    #[arg(long)]
    location: Option<String>,
    /// Provenance label written to the `source` column
    #[arg(long)]
    label: Option<String>,
    #[arg(long, value_enum, default_value_t = DedupMode::Exact)]
    dedup: DedupMode,
    /// Also dump raw candidates with document context as JSON
    #[arg(long)]
    json: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum DedupMode {
    Exact,
    Fuzzy,
    None,
}

impl DedupMode {
    fn strategy(self, cfg: &PipelineConfig) -> DedupStrategy {
        match self {
            DedupMode::Exact => DedupStrategy::Exact,
            DedupMode::Fuzzy => DedupStrategy::Fuzzy {
                tolerance: cfg.dedup_tolerance,
            },
            DedupMode::None => DedupStrategy::None,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let cfg = PipelineConfig::load(cli.config.as_deref())?;

    let result = match cli.command {
        Commands::Extract { ingest, out } => {
            let batch = extract_batch(&ingest, &cfg)?;
            sink::write_master(&out, &batch.records)?;
            println!("Wrote {} records to {}", batch.records.len(), out.display());
            Ok(())
        }
        Commands::Merge { master, batch } => {
            let existing = load_master_or_empty(&master)?;
            let incoming = reader::read_master(&batch)?;
            let merged = dedup::merge_into_master(existing, incoming, cfg.dedup_tolerance);
            sink::write_master(&master, &merged.records)?;
            println!(
                "Master: {} records ({} replaced, {} added, {} overlapping dropped).",
                merged.records.len(),
                merged.replaced,
                merged.added,
                merged.dropped
            );
            Ok(())
        }
        Commands::Aggregate { master, out_dir } => {
            let records = reader::read_master(&master)?;
            let written = sink::write_report(&out_dir, &records, &cfg)?;
            println!("Wrote {} aggregate files to {}", written.len(), out_dir.display());
            Ok(())
        }
        Commands::Run { ingest, master, out_dir } => {
            let t_extract = Instant::now();
            let batch = extract_batch(&ingest, &cfg)?;
            println!(
                "Extracted {} records from {} documents in {:.1}s",
                batch.records.len(),
                batch.summary.documents,
                t_extract.elapsed().as_secs_f64()
            );

            let existing = load_master_or_empty(&master)?;
            let merged = dedup::merge_into_master(existing, batch.records, cfg.dedup_tolerance);
            sink::write_master(&master, &merged.records)?;
            println!(
                "Master: {} records ({} replaced, {} added, {} overlapping dropped).",
                merged.records.len(),
                merged.replaced,
                merged.added,
                merged.dropped
            );

            let written = sink::write_report(&out_dir, &merged.records, &cfg)?;
            println!("Wrote {} aggregate files to {}", written.len(), out_dir.display());
            Ok(())
        }
        Commands::Stats { master } => {
            let records = reader::read_master(&master)?;
            stats::print_overview(&records, &cfg);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// A master that doesn't exist yet is an empty one.
fn load_master_or_empty(path: &Path) -> anyhow::Result<Vec<SalaryRecord>> {
    if path.exists() {
        reader::read_master(path).with_context(|| format!("Failed to load master {}", path.display()))
    } else {
        info!(path = %path.display(), "No master yet, starting a new one");
        Ok(Vec::new())
    }
}

struct Batch {
    records: Vec<SalaryRecord>,
    summary: RunSummary,
}

/// Source Reader → Record Extractor → Field Normalizer → Deduplicator for
/// every input document. The run summary is printed before returning, on
/// success and on failure alike.
fn extract_batch(args: &IngestArgs, cfg: &PipelineConfig) -> anyhow::Result<Batch> {
    let profile = parser::profiles::lookup(&args.source)?;
    let files = reader::discover(&args.input)?;

    let label = args.label.clone().unwrap_or_else(|| profile.label.to_string());
    let collection_date = args.date.unwrap_or_else(|| Local::now().date_naive());
    let page_ctx = NormalizeContext {
        source_label: label,
        collection_date,
        default_location: args.location.clone(),
        job_title: profile.job_title.to_string(),
    };
    let table_ctx = NormalizeContext {
        job_title: cfg.default_job_title.clone(),
        ..page_ctx.clone()
    };

    info!(
        source = profile.key,
        files = files.len(),
        date = %collection_date,
        "Extracting"
    );

    let mut summary = RunSummary::default();
    let mut candidates: Vec<RawRecord> = Vec::new();
    let mut accepted: Vec<SalaryRecord> = Vec::new();

    let processed = process_documents(
        &files,
        profile,
        cfg,
        (&page_ctx, &table_ctx),
        &mut summary,
        &mut candidates,
        &mut accepted,
    );
    if let Err(e) = processed {
        summary.print();
        return Err(e.into());
    }

    if let Some(path) = &args.json {
        sink::write_candidates_json(path, &candidates)?;
        info!(path = %path.display(), count = candidates.len(), "Wrote candidate dump");
    }

    let deduped = dedup::dedup(accepted, args.dedup.strategy(cfg));
    summary.duplicates_dropped = deduped.dropped;
    summary.print();

    if deduped.kept.is_empty() {
        return Err(PipelineError::NoRecords.into());
    }
    Ok(Batch {
        records: deduped.kept,
        summary,
    })
}

fn process_documents(
    files: &[reader::SourceFile],
    profile: &parser::profiles::SourceProfile,
    cfg: &PipelineConfig,
    (page_ctx, table_ctx): (&NormalizeContext, &NormalizeContext),
    summary: &mut RunSummary,
    candidates: &mut Vec<RawRecord>,
    accepted: &mut Vec<SalaryRecord>,
) -> Result<(), PipelineError> {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let page_norm = Normalizer::new(cfg, page_ctx);
    let table_norm = Normalizer::new(cfg, table_ctx);

    for file in files {
        let name = file.name();
        pb.set_message(name.clone());
        summary.documents += 1;

        let (found, normalizer) = match file.kind {
            DocumentKind::Html => {
                let text = reader::read_html(&file.path).inspect_err(|e| {
                    warn!(file = %name, error = %e, "Unreadable document");
                    summary.failed_documents += 1;
                })?;
                let extraction = parser::extract_document(&name, &text, profile, cfg);
                if let Some(strategy) = extraction.strategy {
                    *summary.strategies.entry(strategy).or_default() += 1;
                }
                (extraction.candidates, &page_norm)
            }
            DocumentKind::Csv => {
                let rows = reader::read_csv_candidates(&file.path).inspect_err(|_| {
                    summary.failed_documents += 1;
                })?;
                *summary.strategies.entry("csv").or_default() += 1;
                (rows, &table_norm)
            }
        };

        if found.is_empty() {
            summary.empty_documents += 1;
        }
        summary.candidates += found.len();
        for raw in &found {
            match normalizer.normalize(raw) {
                Ok(rec) => {
                    summary.accepted += 1;
                    accepted.push(rec);
                }
                Err(reason) => summary.reject(reason),
            }
        }
        candidates.extend(found);
        pb.inc(1);
    }

    pb.finish_and_clear();
    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
