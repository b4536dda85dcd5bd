//! Database operations for the `profiles` table.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A full row from the `profiles` table.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ProfileRow {
    pub id: i64,
    pub username: String,
    pub full_name: Option<String>,
    pub biography: Option<String>,
    pub followers_count: Option<i64>,
    pub following_count: Option<i64>,
    pub is_verified: Option<bool>,
    pub profile_data: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub is_car_profile: Option<bool>,
    pub profile_type: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

/// The subset of profile columns sent to the analysis model.
///
/// Deliberately excludes the store id and the analysis columns: the model
/// joins results back by `username`, and half-filled analysis fields would
/// only bias it.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct PendingProfile {
    pub username: String,
    pub full_name: Option<String>,
    pub biography: Option<String>,
    pub followers_count: Option<i64>,
    pub following_count: Option<i64>,
    pub is_verified: Option<bool>,
    pub created_at: DateTime<Utc>,
}

/// A profile's current analysis columns, for post-run verification.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AnalysisStateRow {
    pub username: String,
    pub is_car_profile: Option<bool>,
    pub profile_type: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Filter conditions for [`list_profiles`].
///
/// `after`/`before` bound `created_at`; when either is set the result is
/// ordered by `created_at DESC` (newest first), mirroring how callers page
/// backwards through the table. Single-row lookup by username is
/// [`get_profile_by_username`]'s job.
#[derive(Debug, Clone, Default)]
pub struct ProfileFilter {
    pub verified_only: bool,
    pub min_followers: Option<i64>,
    pub after: Option<DateTime<Utc>>,
    pub before: Option<DateTime<Utc>>,
    pub limit: i64,
}

const PROFILE_COLUMNS: &str = "id, username, full_name, biography, followers_count, \
     following_count, is_verified, profile_data, created_at, is_car_profile, \
     profile_type, last_updated";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// List profiles matching the given filter.
///
/// Equality filters are ANDed; date bounds are inclusive. A `limit` of zero
/// or less is treated as "no rows".
///
/// # Errors
///
/// Returns [`DbError`] on database query failure.
pub async fn list_profiles(pool: &PgPool, filter: &ProfileFilter) -> Result<Vec<ProfileRow>, DbError> {
    let mut qb: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE 1=1"));

    if filter.verified_only {
        qb.push(" AND is_verified = true");
    }
    if let Some(min) = filter.min_followers {
        qb.push(" AND followers_count >= ");
        qb.push_bind(min);
    }
    if let Some(after) = filter.after {
        qb.push(" AND created_at >= ");
        qb.push_bind(after);
    }
    if let Some(before) = filter.before {
        qb.push(" AND created_at <= ");
        qb.push_bind(before);
    }
    if filter.after.is_some() || filter.before.is_some() {
        qb.push(" ORDER BY created_at DESC");
    }
    qb.push(" LIMIT ");
    qb.push_bind(filter.limit.max(0));

    Ok(qb
        .build_query_as::<ProfileRow>()
        .fetch_all(pool)
        .await?)
}

/// Get a single profile by its exact username, if it exists.
///
/// # Errors
///
/// Returns [`DbError`] on database query failure.
pub async fn get_profile_by_username(
    pool: &PgPool,
    username: &str,
) -> Result<Option<ProfileRow>, DbError> {
    Ok(sqlx::query_as::<_, ProfileRow>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM profiles WHERE username = $1"
    ))
    .bind(username)
    .fetch_optional(pool)
    .await?)
}

/// Fetch up to `limit` profiles that have not been analyzed yet, skipping
/// any username in `exclude_usernames`.
///
/// "Unprocessed" means `is_car_profile IS NULL`; the analysis update always
/// writes a strict boolean, so a processed row never matches again. The
/// exclusion list is applied inside the query, before the `LIMIT`, so rows a
/// caller has already dealt with this run never crowd out the rest of the
/// backlog. Newest profiles are returned first. An empty result means
/// nothing (new) is pending.
///
/// # Errors
///
/// Returns [`DbError`] on database query failure.
pub async fn fetch_unprocessed(
    pool: &PgPool,
    limit: i64,
    exclude_usernames: &[String],
) -> Result<Vec<PendingProfile>, DbError> {
    Ok(sqlx::query_as::<_, PendingProfile>(
        "SELECT username, full_name, biography, followers_count, following_count, \
                is_verified, created_at \
         FROM profiles \
         WHERE is_car_profile IS NULL AND username != ALL($2) \
         ORDER BY created_at DESC \
         LIMIT $1",
    )
    .bind(limit.max(0))
    .bind(exclude_usernames)
    .fetch_all(pool)
    .await?)
}

/// Look up the store id for a username (exact, case-sensitive match).
///
/// # Errors
///
/// Returns [`DbError`] on database query failure.
pub async fn find_profile_id(pool: &PgPool, username: &str) -> Result<Option<i64>, DbError> {
    Ok(
        sqlx::query_scalar::<_, i64>("SELECT id FROM profiles WHERE username = $1")
            .bind(username)
            .fetch_optional(pool)
            .await?,
    )
}

/// Write the analysis columns for one profile, keyed by store id.
///
/// Sets `is_car_profile`, `profile_type`, and a fresh `last_updated`
/// timestamp. Returns the number of rows touched — zero means the update
/// was rejected (the id no longer exists) and the caller should record a
/// per-record failure rather than abort the batch.
///
/// # Errors
///
/// Returns [`DbError`] on database query failure.
pub async fn apply_analysis(
    pool: &PgPool,
    id: i64,
    is_car_profile: bool,
    profile_type: &str,
) -> Result<u64, DbError> {
    let result = sqlx::query(
        "UPDATE profiles \
         SET is_car_profile = $2, profile_type = $3, last_updated = NOW() \
         WHERE id = $1",
    )
    .bind(id)
    .bind(is_car_profile)
    .bind(profile_type)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Read back a profile's analysis columns by username.
///
/// # Errors
///
/// Returns [`DbError`] on database query failure.
pub async fn get_analysis_state(
    pool: &PgPool,
    username: &str,
) -> Result<Option<AnalysisStateRow>, DbError> {
    Ok(sqlx::query_as::<_, AnalysisStateRow>(
        "SELECT username, is_car_profile, profile_type, last_updated \
         FROM profiles WHERE username = $1",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?)
}
