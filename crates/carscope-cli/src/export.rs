//! The `export` command: page profiles out of the store into a JSON file.
//!
//! Walks backwards through `created_at`, using the oldest timestamp of each
//! page as the cursor for the next one. The date bound is inclusive, so the
//! cursor row reappears at the top of the next page; the username dedup set
//! absorbs it, and a page that adds nothing new ends the walk.

use std::collections::HashSet;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use carscope_db::{ProfileFilter, ProfileRow};

pub(crate) async fn run_export(
    pool: &PgPool,
    total: usize,
    batch_size: i64,
    output: &Path,
) -> anyhow::Result<()> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut collected: Vec<ProfileRow> = Vec::new();
    let mut cursor: DateTime<Utc> = Utc::now();

    while collected.len() < total {
        let filter = ProfileFilter {
            before: Some(cursor),
            limit: batch_size,
            ..Default::default()
        };
        let batch = carscope_db::list_profiles(pool, &filter).await?;

        if batch.is_empty() {
            println!("No more profiles available");
            break;
        }

        let oldest = batch.last().map(|p| p.created_at);
        let mut added = 0usize;
        for profile in batch {
            if seen.insert(profile.username.clone()) {
                collected.push(profile);
                added += 1;
            }
        }
        if let Some(ts) = oldest {
            cursor = ts;
        }

        tracing::info!(total = collected.len(), added, "fetched export page");
        if added == 0 {
            break;
        }
    }

    collected.truncate(total);

    let json = serde_json::to_string_pretty(&collected).context("serializing profiles")?;
    std::fs::write(output, json).with_context(|| format!("writing {}", output.display()))?;

    println!(
        "Exported {} unique profiles to {}",
        collected.len(),
        output.display()
    );

    Ok(())
}
