//! Store seam for the enrichment pipeline.
//!
//! The orchestrator and applier talk to the record store through
//! [`ProfileStore`] so tests can substitute an in-memory fake;
//! [`PgProfileStore`] is the production implementation over a `PgPool`.

use carscope_db::{DbError, PendingProfile};
use sqlx::PgPool;

/// The narrow slice of store operations the pipeline depends on.
pub trait ProfileStore {
    /// Pull up to `limit` not-yet-analyzed profiles, newest first, skipping
    /// every username in `exclude_usernames`. The exclusion must be applied
    /// before the limit, so rows the caller has already dealt with never
    /// crowd out the rest of the backlog. An empty result is the run's
    /// termination signal, not an error.
    fn fetch_unprocessed(
        &self,
        limit: i64,
        exclude_usernames: &[String],
    ) -> impl std::future::Future<Output = Result<Vec<PendingProfile>, DbError>>;

    /// Resolve a username (exact, case-sensitive) to its store id.
    fn find_profile_id(
        &self,
        username: &str,
    ) -> impl std::future::Future<Output = Result<Option<i64>, DbError>>;

    /// Persist both analysis fields plus a fresh `last_updated` timestamp for
    /// the row with the given id. Returns the number of rows touched; zero
    /// means the update was rejected.
    fn apply_analysis(
        &self,
        id: i64,
        is_car_profile: bool,
        profile_type: &str,
    ) -> impl std::future::Future<Output = Result<u64, DbError>>;
}

/// Postgres-backed [`ProfileStore`] delegating to the carscope-db queries.
pub struct PgProfileStore<'a> {
    pool: &'a PgPool,
}

impl<'a> PgProfileStore<'a> {
    #[must_use]
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

impl ProfileStore for PgProfileStore<'_> {
    async fn fetch_unprocessed(
        &self,
        limit: i64,
        exclude_usernames: &[String],
    ) -> Result<Vec<PendingProfile>, DbError> {
        carscope_db::fetch_unprocessed(self.pool, limit, exclude_usernames).await
    }

    async fn find_profile_id(&self, username: &str) -> Result<Option<i64>, DbError> {
        carscope_db::find_profile_id(self.pool, username).await
    }

    async fn apply_analysis(
        &self,
        id: i64,
        is_car_profile: bool,
        profile_type: &str,
    ) -> Result<u64, DbError> {
        carscope_db::apply_analysis(self.pool, id, is_car_profile, profile_type).await
    }
}
