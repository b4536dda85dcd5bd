//! Batch enrichment orchestration.

use std::collections::HashSet;

use carscope_db::PendingProfile;

use crate::apply::{apply_results, ApplyOutcome};
use crate::error::EnrichError;
use crate::normalize::normalize_response;
use crate::store::ProfileStore;
use crate::types::{AnalysisResult, EnrichConfig, RunSummary};

/// Analyzer seam: one call per chunk, returning the model's raw text.
///
/// Implemented for [`carscope_gemini::GeminiClient`] in production and by
/// scripted fakes in tests.
pub trait Analyzer {
    fn analyze(
        &self,
        profiles: &[PendingProfile],
    ) -> impl std::future::Future<Output = Result<String, EnrichError>>;
}

impl Analyzer for carscope_gemini::GeminiClient {
    async fn analyze(&self, profiles: &[PendingProfile]) -> Result<String, EnrichError> {
        self.analyze_profiles(profiles).await.map_err(EnrichError::from)
    }
}

/// Run the enrichment loop to completion.
///
/// Repeatedly fetches a page of unprocessed profiles, slices it into chunks,
/// and for each chunk: analyze → normalize → apply. A transient service
/// failure or malformed response consumes one attempt; when the chunk's
/// attempt budget (`max_retries`, clamped to ≥ 1) runs out, the chunk is
/// abandoned and its rows stay unprocessed for the next invocation. A short
/// pause follows every successfully applied chunk.
///
/// Every username from a resolved chunk is excluded from later fetches in
/// this run — the exclusion happens inside the store query, before its
/// limit, so an abandoned page never blocks the rows queued behind it and
/// rows left unprocessed (abandoned chunks, results the model never
/// returned) do not spin the loop forever. The run ends when a fetch yields
/// nothing new.
///
/// # Errors
///
/// Returns [`EnrichError::Db`] if a fetch fails. Per-record apply failures
/// are logged and counted in the [`RunSummary`] instead.
pub async fn run_enrichment<S, A>(
    store: &S,
    analyzer: &A,
    config: &EnrichConfig,
) -> Result<RunSummary, EnrichError>
where
    S: ProfileStore,
    A: Analyzer,
{
    let max_attempts = config.max_retries.max(1);
    let chunk_size = config.chunk_size.max(1);

    let mut summary = RunSummary::default();
    let mut handled: HashSet<String> = HashSet::new();

    loop {
        let exclude: Vec<String> = handled.iter().cloned().collect();
        let batch = store.fetch_unprocessed(config.batch_size, &exclude).await?;

        if batch.is_empty() {
            tracing::info!(batches = summary.batches, "no unprocessed profiles left — run complete");
            break;
        }
        summary.batches += 1;
        tracing::info!(batch = summary.batches, profiles = batch.len(), "fetched batch");

        for chunk in batch.chunks(chunk_size) {
            summary.chunks += 1;
            let results = attempt_chunk(analyzer, chunk, max_attempts, config).await;

            // The chunk is resolved either way; none of its rows should be
            // fetched again during this run.
            for profile in chunk {
                handled.insert(profile.username.clone());
            }

            match results {
                Some(results) => {
                    let outcomes = apply_results(store, &results).await;
                    for outcome in &outcomes {
                        match outcome {
                            ApplyOutcome::Updated { .. } => summary.updated += 1,
                            ApplyOutcome::NotFound { .. } => summary.not_found += 1,
                            ApplyOutcome::Rejected { .. } => summary.rejected += 1,
                            ApplyOutcome::Failed { .. } => summary.failed += 1,
                        }
                    }
                    tokio::time::sleep(config.chunk_pause).await;
                }
                None => {
                    summary.chunks_abandoned += 1;
                }
            }
        }
    }

    Ok(summary)
}

/// Drive one chunk through analyze + normalize with the attempt budget.
///
/// Returns `None` when the budget is exhausted (chunk abandoned). No sleep
/// follows the final failed attempt.
async fn attempt_chunk<A: Analyzer>(
    analyzer: &A,
    chunk: &[PendingProfile],
    max_attempts: u32,
    config: &EnrichConfig,
) -> Option<Vec<AnalysisResult>> {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let failure = match analyzer.analyze(chunk).await {
            Ok(raw) => match normalize_response(&raw) {
                Ok(results) => return Some(results),
                Err(e) => e,
            },
            Err(e) => e,
        };

        if attempt >= max_attempts {
            tracing::warn!(
                attempt,
                max_attempts,
                chunk_len = chunk.len(),
                error = %failure,
                "abandoning chunk — attempt budget exhausted; rows stay unprocessed"
            );
            return None;
        }
        tracing::warn!(
            attempt,
            max_attempts,
            delay = ?config.retry_delay,
            error = %failure,
            "chunk enrichment failed — retrying after delay"
        );
        tokio::time::sleep(config.retry_delay).await;
    }
}
