//! The `query` command: filtered profile listing.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use carscope_db::{ProfileFilter, ProfileRow};

pub(crate) async fn run_query(
    pool: &PgPool,
    username: Option<String>,
    after: Option<DateTime<Utc>>,
    before: Option<DateTime<Utc>>,
    verified_only: bool,
    min_followers: Option<i64>,
    limit: i64,
) -> anyhow::Result<()> {
    // A username names at most one row; skip the filter machinery entirely.
    let profiles = match username {
        Some(username) => carscope_db::get_profile_by_username(pool, &username)
            .await?
            .into_iter()
            .collect(),
        None => {
            let filter = ProfileFilter {
                verified_only,
                min_followers,
                after,
                before,
                limit,
            };
            carscope_db::list_profiles(pool, &filter).await?
        }
    };

    if profiles.is_empty() {
        println!("No profiles found matching the criteria.");
        return Ok(());
    }

    println!("\nFound {} matching profiles:", profiles.len());
    for profile in &profiles {
        println!("{}", format_profile(profile));
    }

    Ok(())
}

/// Render one profile as a readable block.
fn format_profile(profile: &ProfileRow) -> String {
    let mut out: Vec<String> = Vec::new();
    out.push("=".repeat(60));
    out.push(format!("Username: {}", profile.username));
    out.push(format!(
        "Full Name: {}",
        profile.full_name.as_deref().unwrap_or("N/A")
    ));
    out.push(format!(
        "Biography: {}",
        profile.biography.as_deref().unwrap_or("N/A")
    ));
    out.push(format!("Followers: {}", profile.followers_count.unwrap_or(0)));
    out.push(format!("Following: {}", profile.following_count.unwrap_or(0)));
    out.push(format!(
        "Verified: {}",
        if profile.is_verified.unwrap_or(false) {
            "✓"
        } else {
            "✗"
        }
    ));

    if let Some(is_car) = profile.is_car_profile {
        out.push(format!(
            "Car Profile: {} ({})",
            is_car,
            profile.profile_type.as_deref().unwrap_or("unknown")
        ));
    }

    if let Some(data) = &profile.profile_data {
        out.push("\nProfile Data:".to_string());
        out.push(
            serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string()),
        );
    }

    out.push("=".repeat(60));
    out.join("\n")
}
