mod output;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use matchday_client::{ChromeConfig, ChromeLauncher};
use matchday_core::config::DEFAULT_BASE_URL;
use matchday_core::util::parse_date;
use matchday_core::{BatchOrchestrator, ScraperConfig, SessionPool, TracingBatchReporter};

use crate::output::{Format, write_details, write_matches};

#[derive(Parser)]
#[command(name = "matchday", version, about = "Football schedule and match-detail scraper")]
struct Cli {
    #[command(flatten)]
    scraper: ScraperArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Json, global = true)]
    format: Format,

    /// Write output to a file instead of stdout
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ScraperArgs {
    /// Maximum number of concurrent browser sessions
    #[arg(long, env = "MATCHDAY_POOL_SIZE", default_value_t = 2, global = true)]
    pool_size: usize,

    /// Page-load timeout in seconds
    #[arg(long, env = "MATCHDAY_PAGE_TIMEOUT_SECS", default_value_t = 15, global = true)]
    page_timeout: u64,

    /// Timeout in seconds for the page's content to appear after load
    #[arg(long, env = "MATCHDAY_READY_TIMEOUT_SECS", default_value_t = 8, global = true)]
    ready_timeout: u64,

    /// How long to wait for a free browser session, in seconds
    #[arg(long, env = "MATCHDAY_LEASE_TIMEOUT_SECS", default_value_t = 60, global = true)]
    lease_timeout: u64,

    /// Site origin
    #[arg(long, env = "MATCHDAY_BASE_URL", default_value = DEFAULT_BASE_URL, global = true)]
    base_url: String,

    /// Language segment of the site's paths
    #[arg(long, env = "MATCHDAY_LOCALE", default_value = "oz", global = true)]
    locale: String,
}

impl ScraperArgs {
    fn to_config(&self) -> Result<ScraperConfig> {
        let config = ScraperConfig::default()
            .with_pool_capacity(self.pool_size)?
            .with_base_url(&self.base_url)?
            .with_timeouts(
                Duration::from_secs(self.page_timeout),
                Duration::from_secs(self.ready_timeout),
            )
            .with_lease_timeout(Duration::from_secs(self.lease_timeout))
            .with_locale(&self.locale);
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Extract every match listed on one day
    Schedule {
        /// Day as DD/MM/YYYY (defaults to today)
        #[arg(short, long)]
        date: Option<String>,
    },

    /// Extract every match listed between two days, inclusive
    Range {
        /// First day as DD/MM/YYYY
        #[arg(long)]
        from: String,

        /// Last day as DD/MM/YYYY
        #[arg(long)]
        to: String,
    },

    /// Extract timelines and lineups of matches by fixture id
    Detail {
        /// Fixture id (repeatable)
        #[arg(short, long = "id", required = true)]
        ids: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("matchday=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.scraper.to_config()?;

    let pool = SessionPool::new(ChromeLauncher::new(ChromeConfig::from_env()), &config);
    let orchestrator = BatchOrchestrator::new(Arc::clone(&pool), config)?;

    let result = run(&orchestrator, cli.command, cli.format, cli.output).await;

    // Close every browser whether or not the command succeeded.
    pool.shutdown().await;
    result
}

async fn run(
    orchestrator: &BatchOrchestrator<ChromeLauncher>,
    command: Commands,
    format: Format,
    output: Option<PathBuf>,
) -> Result<()> {
    let date_format = orchestrator.config().date_format.clone();
    let reporter = TracingBatchReporter;

    match command {
        Commands::Schedule { date } => {
            let date = match date {
                Some(raw) => parse_date(&raw, &date_format)?,
                None => today(),
            };
            let matches = orchestrator
                .extract_range(date, date, &reporter)
                .await
                .context("Schedule extraction failed")?;
            write_matches(sink(output.as_ref())?, &matches, format)?;
        }
        Commands::Range { from, to } => {
            let matches = orchestrator
                .extract_range_str(&from, &to, &reporter)
                .await
                .context("Range extraction failed")?;
            tracing::info!(matches = matches.len(), "Range extracted");
            write_matches(sink(output.as_ref())?, &matches, format)?;
        }
        Commands::Detail { ids } => {
            let details = orchestrator.extract_details(&ids, &reporter).await;
            write_details(sink(output.as_ref())?, &details, format)?;
        }
    }

    Ok(())
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Output destination: the given file, or stdout.
fn sink(path: Option<&PathBuf>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(std::io::stdout().lock())),
    }
}
