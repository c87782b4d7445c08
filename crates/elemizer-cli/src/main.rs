use anyhow::{Context, Result};
use chrono::{TimeDelta, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use elemizer_client::{FetchConfig, ReqwestFetcher, ScraperCounter};
use elemizer_core::validate::validate_element;
use elemizer_core::{CountConfig, CountService, HTML_ELEMENT_NAMES, StatsEngine};
use elemizer_db::{Database, DatabaseConfig, ObservationRepository};

#[derive(Parser)]
#[command(name = "elemizer", version, about = "Count HTML elements on web pages")]
struct Cli {
    /// SQLite database URL (e.g. sqlite://elemizer.db)
    #[arg(long, env = "DATABASE_URL", global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a page, count an element, store the observation and print the result
    Count {
        /// Target URL to fetch
        #[arg(short, long)]
        url: String,

        /// HTML element name to count (e.g., "div", "a")
        #[arg(short, long)]
        element: String,

        /// Always fetch, even if the pair was fetched inside the de-dup window
        #[arg(long, default_value_t = false)]
        fresh: bool,
    },

    /// Show aggregate statistics for a domain and element without fetching
    Stats {
        /// Domain name as stored (host of the fetched URLs)
        #[arg(short, long)]
        domain: String,

        /// HTML element name
        #[arg(short, long)]
        element: String,
    },

    /// List every element name accepted by `count`
    Elements,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("elemizer=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Count {
            url,
            element,
            fresh,
        } => {
            let repo = connect_db(cli.database_url).await?;
            cmd_count(&url, &element, fresh, repo).await?;
        }
        Commands::Stats { domain, element } => {
            let repo = connect_db(cli.database_url).await?;
            cmd_stats(&domain, &element, repo).await?;
        }
        Commands::Elements => {
            for name in HTML_ELEMENT_NAMES {
                println!("{name}");
            }
        }
    }

    Ok(())
}

/// Open the database and apply pending migrations.
async fn connect_db(database_url: Option<String>) -> Result<ObservationRepository> {
    let url = database_url.context(
        "No database configured. Pass --database-url or set DATABASE_URL for count and stats.",
    )?;
    let config = DatabaseConfig::from_url(url)?;

    let db = Database::connect(&config)
        .await
        .context("Failed to connect to database")?;
    db.migrate().await.map_err(|e| anyhow::anyhow!(e))?;

    Ok(db.observation_repo())
}

async fn cmd_count(url: &str, element: &str, fresh: bool, repo: ObservationRepository) -> Result<()> {
    let mut config = CountConfig::from_env()?;
    if fresh {
        config = config.with_dedup_window(TimeDelta::zero());
    }

    // The CLI runs on the user's own machine, so local targets are fair game.
    let fetcher = ReqwestFetcher::with_config(&FetchConfig::from_env()?)
        .context("Failed to create HTTP client")?
        .allow_private_urls();

    let service = CountService::new(fetcher, ScraperCounter::new(), repo, config);
    let outcome = service.count(url, element).await.map_err(|e| {
        tracing::error!(error = %e, "Count failed");
        anyhow::anyhow!(e.client_message())
    })?;

    tracing::info!(
        id = %outcome.observation.id,
        count = outcome.observation.element_count,
        cached = outcome.cached,
        "Count complete"
    );

    println!("{}", serde_json::to_string_pretty(&outcome)?);

    Ok(())
}

async fn cmd_stats(domain: &str, element: &str, repo: ObservationRepository) -> Result<()> {
    let element = validate_element(element).map_err(|e| anyhow::anyhow!("{e}"))?;
    let engine = StatsEngine::new(repo, &CountConfig::from_env()?);

    let stats = engine
        .compute(domain.trim(), &element, Utc::now())
        .await
        .map_err(|e| anyhow::anyhow!(e))?;

    println!("{}", serde_json::to_string_pretty(&stats)?);

    Ok(())
}
