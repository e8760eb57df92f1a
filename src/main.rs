use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use pin_style_trends::pipeline::{self, ClassifySummary};
use pin_style_trends::{load_records, save_records, write_records_csv, Classifier, Config, PinRecord};

#[derive(Parser, Debug)]
#[command(name = "pin-style-trends", version, about = "Chart the fashion styles of a Pinterest board")]
struct Cli {
    /// TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Board to scrape (overrides config)
    #[arg(long, global = true)]
    board_url: Option<String>,

    /// Records JSON file (overrides config)
    #[arg(long, global = true)]
    records: Option<PathBuf>,

    /// Also export the records as CSV
    #[arg(long, global = true)]
    csv: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape the board and download pin images
    Scrape {
        /// Number of pins to open
        #[arg(long)]
        max_pins: Option<usize>,
    },
    /// Label downloaded images with the classifier script
    Classify {
        /// Re-classify records that already have a style
        #[arg(long)]
        force: bool,
        /// Classifier script (overrides config)
        #[arg(long)]
        script: Option<PathBuf>,
    },
    /// Render the style trend chart
    Chart {
        /// Output HTML file (overrides config)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Scrape, classify and chart in one go
    Run {
        #[arg(long)]
        max_pins: Option<usize>,
        #[arg(long)]
        script: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    apply_overrides(&mut config, &cli);
    config.validate().context("Invalid configuration")?;

    match &cli.command {
        Command::Scrape { .. } => {
            let records = pipeline::scrape(&config).await.context("Scrape failed")?;
            persist(&config, &records, cli.csv.as_deref())?;
        }
        Command::Classify { force, .. } => {
            let mut records = read_records(&config.records_path)?;
            classify(&config, &mut records, *force).await?;
            persist(&config, &records, cli.csv.as_deref())?;
        }
        Command::Chart { .. } => {
            let records = read_records(&config.records_path)?;
            let url = pipeline::chart(&config, &records).context("Failed to write chart")?;
            println!("{}", url);
        }
        Command::Run { .. } => {
            let mut records = pipeline::scrape(&config).await.context("Scrape failed")?;
            persist(&config, &records, None)?;
            classify(&config, &mut records, false).await?;
            persist(&config, &records, cli.csv.as_deref())?;
            let url = pipeline::chart(&config, &records).context("Failed to write chart")?;
            println!("{}", url);
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(url) = &cli.board_url {
        config.board_url = url.clone();
    }
    if let Some(path) = &cli.records {
        config.records_path = path.clone();
    }
    match &cli.command {
        Command::Scrape { max_pins } => {
            if let Some(n) = max_pins {
                config.max_pins = *n;
            }
        }
        Command::Classify { script, .. } => {
            if let Some(script) = script {
                config.classifier.script = script.clone();
            }
        }
        Command::Chart { output } => {
            if let Some(output) = output {
                config.chart_path = output.clone();
            }
        }
        Command::Run { max_pins, script } => {
            if let Some(n) = max_pins {
                config.max_pins = *n;
            }
            if let Some(script) = script {
                config.classifier.script = script.clone();
            }
        }
    }
}

async fn classify(config: &Config, records: &mut Vec<PinRecord>, force: bool) -> Result<ClassifySummary> {
    let classifier = Classifier::new(&config.classifier);
    let mut owned = std::mem::take(records);

    // classifier processes block, keep them off the async workers
    let (owned, summary) = tokio::task::spawn_blocking(move || {
        let summary = pipeline::classify(&classifier, &mut owned, force);
        (owned, summary)
    })
    .await
    .context("Classifier task panicked")?;

    *records = owned;
    Ok(summary)
}

fn read_records(path: &Path) -> Result<Vec<PinRecord>> {
    load_records(path).with_context(|| format!("Failed to read records {}", path.display()))
}

fn persist(config: &Config, records: &[PinRecord], csv: Option<&Path>) -> Result<()> {
    save_records(&config.records_path, records)
        .with_context(|| format!("Failed to save records {}", config.records_path.display()))?;
    info!(path = %config.records_path.display(), count = records.len(), "Records saved");

    if let Some(csv) = csv {
        write_records_csv(csv, records)
            .with_context(|| format!("Failed to write CSV {}", csv.display()))?;
        info!(path = %csv.display(), "CSV exported");
    }
    Ok(())
}
