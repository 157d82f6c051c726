use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use ical_ingest::config;
use ical_ingest::db;
use ical_ingest::fetch::HttpFetcher;
use ical_ingest::{import_from_text, import_from_url};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Import the events of an iCalendar feed into the events database"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Feed URL; defaults to `import.feed_url` from the config
    #[arg(long, conflicts_with = "file")]
    url: Option<String>,

    /// Read the calendar from a local .ics file instead of fetching it
    #[arg(long)]
    file: Option<PathBuf>,

    /// Print the created events as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;
    let settings = cfg.import_settings()?;

    let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| cfg.database_url());
    let pool = db::init_pool(&database_url).await?;
    db::run_migrations(&pool).await?;

    let outcome = if let Some(path) = &args.file {
        let data = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        import_from_text(&pool, &data, &settings).await?
    } else {
        let Some(url) = args.url.clone().or_else(|| cfg.import.feed_url.clone()) else {
            bail!("no feed given: pass --url or --file, or set import.feed_url");
        };
        let fetcher = HttpFetcher::new().context("failed to build HTTP client")?;
        import_from_url(&pool, &fetcher, &url, &settings).await?
    };

    let total = db::count_events(&pool).await?;
    info!(total_events = total, "import finished");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome.created)?);
    } else {
        println!(
            "{} events created, {} duplicates skipped",
            outcome.created.len(),
            outcome.skipped
        );
    }
    Ok(())
}
