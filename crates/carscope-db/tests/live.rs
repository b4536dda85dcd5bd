//! Live integration tests for carscope-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/carscope-db/`), so `"../../migrations"` resolves to the workspace
//! migration directory.

use carscope_db::{
    apply_analysis, fetch_unprocessed, find_profile_id, get_analysis_state,
    get_profile_by_username, health_check,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Insert a minimal pending profile row, `age_secs` old, and return its
/// generated `id`.
async fn insert_pending_profile(pool: &sqlx::PgPool, username: &str, age_secs: f64) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO profiles (username, created_at) \
         VALUES ($1, NOW() - make_interval(secs => $2)) RETURNING id",
    )
    .bind(username)
    .bind(age_secs)
    .fetch_one(pool)
    .await
    .unwrap_or_else(|e| panic!("insert_pending_profile failed for '{username}': {e}"))
}

// ---------------------------------------------------------------------------
// Pool health
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn health_check_passes_on_a_migrated_pool(pool: sqlx::PgPool) {
    health_check(&pool)
        .await
        .expect("health check should pass on a live pool");
}

// ---------------------------------------------------------------------------
// Unprocessed fetch
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn fetch_unprocessed_returns_newest_first_and_skips_analyzed(pool: sqlx::PgPool) {
    let older = insert_pending_profile(&pool, "older", 20.0).await;
    insert_pending_profile(&pool, "newer", 10.0).await;

    let pending = fetch_unprocessed(&pool, 10, &[])
        .await
        .expect("fetch should succeed");
    let usernames: Vec<&str> = pending.iter().map(|p| p.username.as_str()).collect();
    assert_eq!(usernames, vec!["newer", "older"]);

    // Once analyzed, a row never matches again.
    apply_analysis(&pool, older, false, "unknown")
        .await
        .expect("update should succeed");
    let pending = fetch_unprocessed(&pool, 10, &[])
        .await
        .expect("fetch should succeed");
    let usernames: Vec<&str> = pending.iter().map(|p| p.username.as_str()).collect();
    assert_eq!(usernames, vec!["newer"]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn fetch_unprocessed_excludes_before_applying_the_limit(pool: sqlx::PgPool) {
    insert_pending_profile(&pool, "first", 10.0).await;
    insert_pending_profile(&pool, "second", 20.0).await;
    insert_pending_profile(&pool, "third", 30.0).await;

    // Excluding the two newest rows must surface the one queued behind them,
    // even though the limit alone would only ever show the newest row.
    let pending = fetch_unprocessed(&pool, 1, &["first".to_owned(), "second".to_owned()])
        .await
        .expect("fetch should succeed");
    let usernames: Vec<&str> = pending.iter().map(|p| p.username.as_str()).collect();
    assert_eq!(usernames, vec!["third"]);

    // An empty exclusion list excludes nothing.
    let pending = fetch_unprocessed(&pool, 10, &[])
        .await
        .expect("fetch should succeed");
    assert_eq!(pending.len(), 3);
}

// ---------------------------------------------------------------------------
// Analysis updates
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn apply_analysis_writes_all_three_columns(pool: sqlx::PgPool) {
    let id = insert_pending_profile(&pool, "garage_builds", 5.0).await;

    let touched = apply_analysis(&pool, id, true, "car page")
        .await
        .expect("update should succeed");
    assert_eq!(touched, 1);

    let state = get_analysis_state(&pool, "garage_builds")
        .await
        .expect("readback should succeed")
        .expect("row should exist");
    assert_eq!(state.is_car_profile, Some(true));
    assert_eq!(state.profile_type.as_deref(), Some("car page"));
    assert!(state.last_updated.is_some(), "last_updated should be stamped");
}

#[sqlx::test(migrations = "../../migrations")]
async fn apply_analysis_to_a_missing_id_touches_no_rows(pool: sqlx::PgPool) {
    let touched = apply_analysis(&pool, 999_999, true, "individual")
        .await
        .expect("update should succeed even when nothing matches");
    assert_eq!(touched, 0);
}

// ---------------------------------------------------------------------------
// Username lookups
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn get_profile_by_username_round_trips_the_row(pool: sqlx::PgPool) {
    let id = insert_pending_profile(&pool, "vintage_wheels", 5.0).await;

    let row = get_profile_by_username(&pool, "vintage_wheels")
        .await
        .expect("lookup should succeed")
        .expect("row should exist");
    assert_eq!(row.id, id);
    assert_eq!(row.username, "vintage_wheels");
    assert_eq!(row.is_car_profile, None);

    let missing = get_profile_by_username(&pool, "no_such_user")
        .await
        .expect("lookup should succeed");
    assert!(missing.is_none());

    // The id lookup agrees with the full-row lookup.
    let found = find_profile_id(&pool, "vintage_wheels")
        .await
        .expect("lookup should succeed");
    assert_eq!(found, Some(id));
}
