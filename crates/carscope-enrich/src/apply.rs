//! Maps normalized analysis results back onto store rows.

use crate::store::ProfileStore;
use crate::types::{AnalysisResult, CarFlag};

/// Default category when the model leaves `profile_type` empty or absent.
pub const UNKNOWN_PROFILE_TYPE: &str = "unknown";

/// Per-record outcome of an apply pass. None of these abort the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Both analysis fields persisted.
    Updated { username: String },
    /// No row matched the result's username.
    NotFound { username: String },
    /// The update touched zero rows.
    Rejected { username: String },
    /// A store error occurred for this record.
    Failed { username: String },
}

/// Coerce the model's car-relatedness value to a strict boolean.
///
/// Booleans pass through; strings count as `true` only when they equal
/// `"true"` case-insensitively; anything else (including absence) is `false`.
#[must_use]
pub fn coerce_car_flag(flag: Option<&CarFlag>) -> bool {
    match flag {
        Some(CarFlag::Flag(b)) => *b,
        Some(CarFlag::Text(s)) => s.eq_ignore_ascii_case("true"),
        None => false,
    }
}

/// Coerce the model's category to a non-empty lower-cased string,
/// substituting `"unknown"` for empty or missing values.
#[must_use]
pub fn coerce_profile_type(raw: Option<&str>) -> String {
    match raw {
        Some(s) if !s.trim().is_empty() => s.trim().to_lowercase(),
        _ => UNKNOWN_PROFILE_TYPE.to_owned(),
    }
}

/// Apply a chunk's worth of analysis results to the store, one row at a time.
///
/// Each result is looked up by exact username; missing rows and zero-row
/// updates are recorded and skipped. A store error on one record is logged
/// with enough context for manual follow-up and does not stop the rest.
pub async fn apply_results<S: ProfileStore>(
    store: &S,
    results: &[AnalysisResult],
) -> Vec<ApplyOutcome> {
    let mut outcomes = Vec::with_capacity(results.len());

    for result in results {
        let username = result.username.clone();

        let id = match store.find_profile_id(&username).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                tracing::warn!(username = %username, "profile not found for analysis result");
                outcomes.push(ApplyOutcome::NotFound { username });
                continue;
            }
            Err(e) => {
                tracing::warn!(username = %username, error = %e, "profile lookup failed");
                outcomes.push(ApplyOutcome::Failed { username });
                continue;
            }
        };

        let is_car = coerce_car_flag(result.is_car_profile.as_ref());
        let profile_type = coerce_profile_type(result.profile_type.as_deref());

        match store.apply_analysis(id, is_car, &profile_type).await {
            Ok(0) => {
                tracing::warn!(username = %username, id, "analysis update touched no rows");
                outcomes.push(ApplyOutcome::Rejected { username });
            }
            Ok(_) => {
                tracing::info!(username = %username, is_car, profile_type = %profile_type, "profile analysis applied");
                outcomes.push(ApplyOutcome::Updated { username });
            }
            Err(e) => {
                tracing::warn!(username = %username, error = %e, "analysis update failed");
                outcomes.push(ApplyOutcome::Failed { username });
            }
        }
    }

    outcomes
}
