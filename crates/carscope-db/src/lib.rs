use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, time::Duration};
use thiserror::Error;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

// Path relative to crates/carscope-db/Cargo.toml; resolves to <workspace-root>/migrations/
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            max_connections: read_u32("CARSCOPE_DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS),
            min_connections: read_u32("CARSCOPE_DB_MIN_CONNECTIONS", DEFAULT_MIN_CONNECTIONS),
            acquire_timeout_secs: read_u64(
                "CARSCOPE_DB_ACQUIRE_TIMEOUT_SECS",
                DEFAULT_ACQUIRE_TIMEOUT_SECS,
            ),
        }
    }

    #[must_use]
    pub fn from_app_config(config: &carscope_core::AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("DATABASE_URL is not set")]
    MissingDatabaseUrl,
    #[error("record not found")]
    NotFound,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Connect to a Postgres pool using explicit URL and config.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the connection cannot be established.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await
}

/// Connect to a Postgres pool, reading `DATABASE_URL` and pool settings from env.
///
/// # Errors
///
/// Returns [`DbError::MissingDatabaseUrl`] if `DATABASE_URL` is unset, or
/// [`DbError::Sqlx`] if the connection cannot be established.
pub async fn connect_pool_from_env() -> Result<PgPool, DbError> {
    let database_url = env::var("DATABASE_URL").map_err(|_| DbError::MissingDatabaseUrl)?;
    let config = PoolConfig::from_env();
    connect_pool(&database_url, config)
        .await
        .map_err(DbError::from)
}

/// Run all pending migrations against the pool.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if any migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}

/// Send a `SELECT 1` to verify the pool has a live connection.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}

/// Run a full health check: ping the pool and return a typed error on failure.
///
/// # Errors
///
/// Returns [`DbError`] if the ping fails.
pub async fn health_check(pool: &PgPool) -> Result<(), DbError> {
    ping(pool).await?;
    Ok(())
}

fn read_u32(var: &str, default: u32) -> u32 {
    env::var(var)
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(default)
}

fn read_u64(var: &str, default: u64) -> u64 {
    env::var(var)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}


pub mod profiles;

pub use profiles::{
    apply_analysis, fetch_unprocessed, find_profile_id, get_analysis_state,
    get_profile_by_username, list_profiles, AnalysisStateRow, PendingProfile, ProfileFilter,
    ProfileRow,
};
