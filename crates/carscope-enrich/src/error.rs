use carscope_gemini::GeminiError;
use thiserror::Error;

/// Errors surfaced by the enrichment pipeline.
#[derive(Debug, Error)]
pub enum EnrichError {
    /// The enrichment service could not be reached or refused the request
    /// (transport, auth, rate limit). Retried up to the attempt budget.
    #[error("enrichment service unavailable: {0}")]
    Unavailable(String),

    /// The model's response was not the expected JSON array. Retried the
    /// same as [`EnrichError::Unavailable`] — a re-issued request may well
    /// produce a parseable answer.
    #[error("malformed model response: {0}")]
    MalformedResponse(String),

    /// A store query failed. Fatal to the run when raised by the fetcher;
    /// per-record failures during apply are logged and swallowed instead.
    #[error(transparent)]
    Db(#[from] carscope_db::DbError),
}

impl From<GeminiError> for EnrichError {
    fn from(err: GeminiError) -> Self {
        match err {
            GeminiError::Http(_)
            | GeminiError::Auth { .. }
            | GeminiError::RateLimited(_)
            | GeminiError::Api { .. } => EnrichError::Unavailable(err.to_string()),
            GeminiError::EmptyResponse | GeminiError::Deserialize { .. } => {
                EnrichError::MalformedResponse(err.to_string())
            }
        }
    }
}
