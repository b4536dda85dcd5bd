mod analyze;
mod enrich;
mod export;
mod query;

use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "carscope")]
#[command(about = "Instagram profile store: query, export, and Gemini-based car-profile analysis")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Query profiles from the database and print them
    Query {
        /// Specific username to look up
        #[arg(long)]
        username: Option<String>,

        /// Only profiles created after this date (YYYY-MM-DD)
        #[arg(long)]
        after_date: Option<String>,

        /// Only profiles created before this date (YYYY-MM-DD)
        #[arg(long)]
        before_date: Option<String>,

        /// Show only verified profiles
        #[arg(long)]
        verified_only: bool,

        /// Minimum number of followers
        #[arg(long)]
        min_followers: Option<i64>,

        /// Maximum number of profiles to return
        #[arg(long, default_value_t = 10)]
        limit: i64,
    },
    /// Run the batch enrichment loop over all unprocessed profiles
    Enrich {
        /// Rows fetched per page (overrides CARSCOPE_BATCH_SIZE)
        #[arg(long)]
        batch_size: Option<i64>,

        /// Profiles per model request (overrides CARSCOPE_CHUNK_SIZE)
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Attempt budget per chunk (overrides CARSCOPE_MAX_RETRIES)
        #[arg(long)]
        max_retries: Option<u32>,
    },
    /// One-shot analysis of a few profiles; saves the raw model response
    Analyze {
        /// Number of profiles to analyze
        #[arg(long, default_value_t = 5)]
        limit: i64,

        /// Only profiles created after this date (YYYY-MM-DD)
        #[arg(long)]
        after_date: Option<String>,

        /// File for the (fence-stripped) raw model response
        #[arg(long, default_value = "gemini_analysis.json")]
        output: PathBuf,
    },
    /// Page profiles out of the store into a JSON file
    Export {
        /// Number of unique profiles to collect
        #[arg(long, default_value_t = 100)]
        total: usize,

        /// Rows fetched per page
        #[arg(long, default_value_t = 15)]
        batch_size: i64,

        /// Output file
        #[arg(long, default_value = "all_profiles.json")]
        output: PathBuf,
    },
    /// Apply pending database migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = carscope_core::load_app_config().context("loading configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    let pool = carscope_db::connect_pool(
        &config.database_url,
        carscope_db::PoolConfig::from_app_config(&config),
    )
    .await
    .context("connecting to Postgres")?;

    carscope_db::health_check(&pool)
        .await
        .context("database health check")?;

    match cli.command {
        Commands::Query {
            username,
            after_date,
            before_date,
            verified_only,
            min_followers,
            limit,
        } => {
            let after = after_date.as_deref().map(parse_date).transpose()?;
            let before = before_date.as_deref().map(parse_date).transpose()?;
            query::run_query(&pool, username, after, before, verified_only, min_followers, limit)
                .await?;
        }
        Commands::Enrich {
            batch_size,
            chunk_size,
            max_retries,
        } => {
            enrich::run_enrich(&pool, &config, batch_size, chunk_size, max_retries).await?;
        }
        Commands::Analyze {
            limit,
            after_date,
            output,
        } => {
            let after = after_date.as_deref().map(parse_date).transpose()?;
            analyze::run_analyze(&pool, &config, limit, after, &output).await?;
        }
        Commands::Export {
            total,
            batch_size,
            output,
        } => {
            export::run_export(&pool, total, batch_size, &output).await?;
        }
        Commands::Migrate => {
            carscope_db::run_migrations(&pool)
                .await
                .context("running migrations")?;
            println!("migrations applied");
        }
    }

    Ok(())
}

/// Parse a `YYYY-MM-DD` argument into midnight UTC.
pub(crate) fn parse_date(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{raw}', expected YYYY-MM-DD"))?;
    Ok(DateTime::from_naive_utc_and_offset(
        date.and_time(NaiveTime::MIN),
        Utc,
    ))
}
