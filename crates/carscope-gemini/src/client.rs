//! HTTP client for the Gemini `generateContent` REST API.
//!
//! Wraps `reqwest` with Gemini-specific error handling and API key
//! management. Rate limiting is detected at the transport level first
//! (HTTP 429); the free-text quota heuristic is a fallback and lives only
//! inside this adapter — callers just see [`GeminiError::RateLimited`].

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::Serialize;

use crate::error::GeminiError;
use crate::types::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part,
};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Instruction prepended to every classification request. The model is told
/// to answer with a bare JSON array; in practice it often wraps the answer in
/// a code fence anyway, which the normalizer strips.
pub const CLASSIFICATION_PROMPT: &str = "Respond with a structured JSON array (without any \
markdown formatting or ```json prefix). For each profile in the data, output one object with \
the keys \"username\", \"is_car_profile\" (whether the profile can be determined to be a car \
profile or car centric) and \"profile_type\" (whether the profile is an individual or a \
business profile; use \"car page\" for dedicated car content pages and \"unknown\" when it \
cannot be determined).";

/// Client for the Gemini text-generation API.
///
/// Use [`GeminiClient::new`] for production or
/// [`GeminiClient::with_base_url`] to point at a mock server in tests.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    /// Creates a new client pointed at the production Gemini API.
    ///
    /// # Errors
    ///
    /// Returns [`GeminiError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(api_key: &str, model: &str, timeout_secs: u64) -> Result<Self, GeminiError> {
        Self::with_base_url(api_key, model, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a new client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`GeminiError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`GeminiError::Api`] if `base_url` is not a
    /// valid URL.
    pub fn with_base_url(
        api_key: &str,
        model: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, GeminiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("carscope/0.1 (profile-analysis)")
            .build()?;

        let trimmed = base_url.trim_end_matches('/');
        Url::parse(trimmed).map_err(|e| GeminiError::Api {
            status: 0,
            body: format!("invalid base URL '{base_url}': {e}"),
        })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            model: model.to_owned(),
            base_url: trimmed.to_owned(),
        })
    }

    /// Sends one classification request for a chunk of profiles and returns
    /// the model's raw text response.
    ///
    /// The request embeds [`CLASSIFICATION_PROMPT`] followed by the profiles
    /// serialized as pretty-printed JSON. Retrying re-submits the same
    /// profiles; the call has no idempotency guarantee.
    ///
    /// # Errors
    ///
    /// - [`GeminiError::RateLimited`] on HTTP 429 or when the response text
    ///   itself indicates an exhausted quota.
    /// - [`GeminiError::Auth`] on HTTP 401/403.
    /// - [`GeminiError::Http`] on network failure.
    /// - [`GeminiError::Api`] on any other non-success status.
    /// - [`GeminiError::EmptyResponse`] / [`GeminiError::Deserialize`] when
    ///   no candidate text can be extracted.
    pub async fn analyze_profiles<T: Serialize>(
        &self,
        profiles: &[T],
    ) -> Result<String, GeminiError> {
        let payload =
            serde_json::to_string_pretty(profiles).map_err(|e| GeminiError::Deserialize {
                context: "profile payload".to_owned(),
                source: e,
            })?;
        let prompt = format!("{CLASSIFICATION_PROMPT}\n\nData: {payload}");
        self.generate(&prompt).await
    }

    /// Sends a single prompt and returns the first candidate's text.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`GeminiClient::analyze_profiles`].
    pub async fn generate(&self, prompt: &str) -> Result<String, GeminiError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_owned(),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "text/plain".to_owned(),
            },
        };

        tracing::debug!(model = %self.model, prompt_len = prompt.len(), "sending generateContent request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let body = response.text().await.unwrap_or_default();
            return Err(GeminiError::RateLimited(body));
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(GeminiError::Auth {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeminiError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let parsed: GenerateContentResponse =
            serde_json::from_str(&body).map_err(|e| GeminiError::Deserialize {
                context: "generateContent response".to_owned(),
                source: e,
            })?;

        let text = parsed
            .first_candidate_text()
            .ok_or(GeminiError::EmptyResponse)?;

        // Quota exhaustion sometimes arrives as model text in a 200 response.
        if is_rate_limit_text(&text) {
            return Err(GeminiError::RateLimited(text));
        }

        Ok(text)
    }
}

/// Fallback heuristic: the service has been observed reporting quota problems
/// as free text in an otherwise successful response.
fn is_rate_limit_text(text: &str) -> bool {
    let lowered = text.to_lowercase();
    lowered.contains("rate limit") || lowered.contains("quota exceeded")
}
