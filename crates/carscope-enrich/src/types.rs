//! Types shared across the enrichment pipeline.

use std::time::Duration;

use serde::Deserialize;

/// One parsed analysis entry from the model's response, joined back to the
/// store by `username`. Lives for a single batch cycle.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisResult {
    pub username: String,
    #[serde(default)]
    pub is_car_profile: Option<CarFlag>,
    #[serde(default)]
    pub profile_type: Option<String>,
}

/// The model emits `is_car_profile` either as a JSON bool or as a string
/// (`"True"`, `"false"`, ...). Both shapes are accepted and coerced later.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum CarFlag {
    Flag(bool),
    Text(String),
}

/// Tuning knobs for one enrichment run.
///
/// Delays are plain `Duration`s rather than ambient sleeps so tests run with
/// zero delay while keeping retry-count semantics identical.
#[derive(Debug, Clone)]
pub struct EnrichConfig {
    /// Rows requested per fetch page.
    pub batch_size: i64,
    /// Profiles per model request.
    pub chunk_size: usize,
    /// Total attempt budget per chunk (clamped to at least 1). With a budget
    /// of 1 a chunk gets exactly one genuine attempt and never sleeps.
    pub max_retries: u32,
    /// Sleep between failed attempts on the same chunk.
    pub retry_delay: Duration,
    /// Pause after every successfully applied chunk, to keep the sustained
    /// request rate to the model down.
    pub chunk_pause: Duration,
}

impl EnrichConfig {
    #[must_use]
    pub fn from_app_config(config: &carscope_core::AppConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            chunk_size: config.chunk_size,
            max_retries: config.max_retries,
            retry_delay: Duration::from_secs(config.retry_delay_secs),
            chunk_pause: Duration::from_millis(config.chunk_pause_ms),
        }
    }
}

/// Counters accumulated over a full enrichment run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub batches: u32,
    pub chunks: u32,
    pub chunks_abandoned: u32,
    pub updated: usize,
    pub not_found: usize,
    pub rejected: usize,
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn car_flag_deserializes_bool_and_string() {
        let parsed: Vec<CarFlag> = serde_json::from_str("[true, \"True\", \"no\"]").unwrap();
        assert_eq!(
            parsed,
            vec![
                CarFlag::Flag(true),
                CarFlag::Text("True".to_owned()),
                CarFlag::Text("no".to_owned()),
            ]
        );
    }

    #[test]
    fn analysis_result_tolerates_missing_fields() {
        let parsed: AnalysisResult = serde_json::from_str("{\"username\":\"a\"}").unwrap();
        assert_eq!(parsed.username, "a");
        assert!(parsed.is_car_profile.is_none());
        assert!(parsed.profile_type.is_none());
    }
}
