//! The `analyze` command: a single-shot fetch → analyze → apply pass that
//! also saves the raw model response to disk for manual inspection.

use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use carscope_core::AppConfig;
use carscope_db::{PendingProfile, ProfileFilter, ProfileRow};
use carscope_enrich::{apply_results, clean_response, normalize_response, ApplyOutcome, PgProfileStore};
use carscope_gemini::GeminiClient;

pub(crate) async fn run_analyze(
    pool: &PgPool,
    config: &AppConfig,
    limit: i64,
    after: Option<DateTime<Utc>>,
    output: &Path,
) -> anyhow::Result<()> {
    let filter = ProfileFilter {
        after,
        limit,
        ..Default::default()
    };
    let rows = carscope_db::list_profiles(pool, &filter).await?;

    if rows.is_empty() {
        println!("No profiles to analyze.");
        return Ok(());
    }

    let pending: Vec<PendingProfile> = rows.iter().map(to_pending).collect();

    let client = GeminiClient::with_base_url(
        &config.gemini_api_key,
        &config.gemini_model,
        config.gemini_timeout_secs,
        &config.gemini_base_url,
    )
    .context("constructing Gemini client")?;

    let raw = client
        .analyze_profiles(&pending)
        .await
        .context("analyzing profiles")?;

    // Ad-hoc artifact: the fence-stripped raw response, not a stable format.
    std::fs::write(output, clean_response(&raw))
        .with_context(|| format!("writing {}", output.display()))?;
    println!("Raw analysis saved to {}", output.display());

    let results = normalize_response(&raw).context("normalizing model response")?;
    let store = PgProfileStore::new(pool);
    let outcomes = apply_results(&store, &results).await;

    println!("\nVerifying final state:");
    for result in &results {
        match carscope_db::get_analysis_state(pool, &result.username).await? {
            Some(state) => println!(
                "  {}: is_car_profile={:?} profile_type={:?}",
                state.username, state.is_car_profile, state.profile_type
            ),
            None => println!("  {}: not found", result.username),
        }
    }

    let updated = outcomes
        .iter()
        .filter(|o| matches!(o, ApplyOutcome::Updated { .. }))
        .count();
    println!(
        "\nAnalysis completed: {updated} of {} returned profiles updated",
        results.len()
    );

    Ok(())
}

fn to_pending(row: &ProfileRow) -> PendingProfile {
    PendingProfile {
        username: row.username.clone(),
        full_name: row.full_name.clone(),
        biography: row.biography.clone(),
        followers_count: row.followers_count,
        following_count: row.following_count,
        is_verified: row.is_verified,
        created_at: row.created_at,
    }
}
