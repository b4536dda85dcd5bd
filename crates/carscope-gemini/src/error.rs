use thiserror::Error;

/// Errors returned by the Gemini API client.
#[derive(Debug, Error)]
pub enum GeminiError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API rejected the key (HTTP 401/403).
    #[error("Gemini authentication failed (status {status})")]
    Auth { status: u16 },

    /// The service signalled a rate limit or exhausted quota, either as an
    /// HTTP 429 or as free text in an otherwise successful response.
    #[error("Gemini rate limited: {0}")]
    RateLimited(String),

    /// Any other non-success HTTP status.
    #[error("Gemini API error (status {status}): {body}")]
    Api { status: u16, body: String },

    /// The response parsed but contained no candidate text.
    #[error("Gemini returned no candidate text")]
    EmptyResponse,

    /// The response body could not be deserialized into the expected shape.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}
