//! Job Listing Cleaner
//!
//! Cleans scraped job listings (data/*.json from the crawler), then helps
//! work through them: split by age, flag languages, and list the job keys
//! that have not been opened yet.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use common::age::{recombine, split_by_age};
use common::review::{candidate_keys, flag_languages, view_url};
use common::{CleanConfig, Dataset, JsonViewedStore, SalaryFill, ViewedStore, clean, combine_all};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "jobclean", about = "Clean and review scraped job listings")]
struct Cli {
    /// Cleaning config file (TOML or JSON); JOBCLEAN_* variables override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Infer salaries, convert to hourly, fill gaps and normalize post age
    Clean {
        input: PathBuf,
        /// Output file (default: data/jobs-<date>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Drop the leading crawler columns (keyword, location, page, position)
        #[arg(long)]
        drop_meta: bool,
        /// How many leading columns --drop-meta removes
        #[arg(long)]
        n_meta: Option<usize>,
        /// Drop the description column once salaries are inferred
        #[arg(long)]
        drop_desc: bool,
        /// Fill missing salaries with this value instead of the column mean
        #[arg(long, conflicts_with = "fill_each")]
        fill: Option<f64>,
        /// Fill missing salaries with one value per salary column, e.g. 18,25
        #[arg(long, value_delimiter = ',')]
        fill_each: Vec<f64>,
    },
    /// Stack cleaned batches from several searches
    Combine {
        #[arg(required = true, num_args = 2..)]
        inputs: Vec<PathBuf>,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Split a cleaned file into new (<= 7 days), middle and old (30+) listings
    Split {
        input: PathBuf,
        /// Directory for <stem>-new.json, <stem>-middle.json and <stem>-old.json
        #[arg(short, long, default_value = "data")]
        out_dir: PathBuf,
    },
    /// Stack reviewed files back together, youngest first
    Recombine {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Add a true/false column per language mentioned in the description
    Languages {
        input: PathBuf,
        /// Plain substrings, e.g. --lang python --lang sql
        #[arg(short, long = "lang")]
        langs: Vec<String>,
        /// Regex patterns, e.g. --regex '\br\b'
        #[arg(short, long = "regex")]
        patterns: Vec<String>,
        /// Output file (default: overwrite input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Save the keys of listings not viewed yet
    Keys {
        input: PathBuf,
        #[arg(long, default_value = "viewed_jobs.json")]
        viewed: PathBuf,
        /// Output file (default: jobkeys-<date>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print view links for a saved key list and mark them viewed
    Open {
        keys: PathBuf,
        #[arg(long, default_value = "viewed_jobs.json")]
        viewed: PathBuf,
    },
}

fn today() -> String {
    chrono::Local::now().date_naive().format("%Y-%m-%d").to_string()
}

fn load(path: &Path) -> Result<Dataset> {
    Dataset::load(path).with_context(|| format!("failed to read {}", path.display()))
}

fn save(dataset: &Dataset, path: &Path) -> Result<()> {
    dataset
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("💾 Saved {} jobs to {:?}", dataset.len(), path);
    Ok(())
}

fn fill_override(fill: Option<f64>, fill_each: Vec<f64>) -> Option<SalaryFill> {
    match (fill, fill_each.is_empty()) {
        (Some(value), _) => Some(SalaryFill::Value(value)),
        (None, false) => Some(SalaryFill::PerColumn(fill_each)),
        (None, true) => None,
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = CleanConfig::load(cli.config.as_deref()).context("failed to load config")?;

    match cli.command {
        Commands::Clean {
            input,
            output,
            drop_meta,
            n_meta,
            drop_desc,
            fill,
            fill_each,
        } => {
            config.drop_meta |= drop_meta;
            config.drop_desc |= drop_desc;
            if let Some(n) = n_meta {
                config.n_meta = n;
            }
            if let Some(fill) = fill_override(fill, fill_each) {
                config.fill = fill;
            }

            let raw = load(&input)?;
            println!("📂 Loaded {} jobs from {:?}", raw.len(), input);
            let cleaned = clean(&raw, &config)?;
            let output = output.unwrap_or_else(|| PathBuf::from(format!("data/jobs-{}.json", today())));
            save(&cleaned, &output)?;
        }
        Commands::Combine { inputs, output } => {
            let batches = inputs.iter().map(|p| load(p)).collect::<Result<Vec<_>>>()?;
            let combined = combine_all(&batches)?;
            info!(batches = batches.len(), rows = combined.len(), "combined batches");
            save(&combined, &output)?;
        }
        Commands::Split { input, out_dir } => {
            let dataset = load(&input)?;
            let split = split_by_age(&dataset, &config.columns.age)?;
            let stem = input
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("jobs")
                .to_string();
            for (name, part) in [("new", &split.new), ("middle", &split.middle), ("old", &split.old)] {
                save(part, &out_dir.join(format!("{}-{}.json", stem, name)))?;
            }
        }
        Commands::Recombine { inputs, output } => {
            let batches = inputs.iter().map(|p| load(p)).collect::<Result<Vec<_>>>()?;
            let combined = recombine(&batches, &config.columns.age)?;
            save(&combined, &output)?;
        }
        Commands::Languages {
            input,
            langs,
            patterns,
            output,
        } => {
            if langs.is_empty() && patterns.is_empty() {
                bail!("pass at least one --lang or --regex");
            }
            let dataset = load(&input)?;
            let flagged = flag_languages(&dataset, &config.columns.description, &langs, &patterns)?;
            save(&flagged, output.as_deref().unwrap_or(&input))?;
        }
        Commands::Keys {
            input,
            viewed,
            output,
        } => {
            let dataset = load(&input)?;
            let store = JsonViewedStore::open(&viewed)?;
            let keys = candidate_keys(&dataset, &config.columns.key, &store)?;
            let output = output.unwrap_or_else(|| PathBuf::from(format!("jobkeys-{}.json", today())));
            fs::write(&output, serde_json::to_string_pretty(&keys)?)
                .with_context(|| format!("failed to write {}", output.display()))?;
            println!("🔑 Saved {} unviewed job keys to {:?}", keys.len(), output);
        }
        Commands::Open { keys, viewed } => {
            let content = fs::read_to_string(&keys)
                .with_context(|| format!("failed to read {}", keys.display()))?;
            let keys: Vec<String> = serde_json::from_str(&content)?;
            let mut store = JsonViewedStore::open(&viewed)?;
            for key in &keys {
                println!("{}", view_url(key));
            }
            let added = store.mark(&keys);
            store.save()?;
            info!(added, total = store.keys().len(), "marked jobs viewed");
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    run(Cli::parse())
}
