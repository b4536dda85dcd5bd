//! Request/response types for the Gemini `generateContent` endpoint.
//!
//! Only the fields this client actually reads are modelled; the response
//! structs are lenient (everything optional) because the service freely adds
//! fields and omits others.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

/// Generation knobs sent with every request. Plain text keeps the model from
/// negotiating an output format; the array shape is pinned by the prompt.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerationConfig {
    pub response_mime_type: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
pub(crate) struct Part {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CandidatePart {
    pub text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenate every candidate part of the first candidate into one string.
    pub(crate) fn first_candidate_text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let joined: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if joined.is_empty() {
            None
        } else {
            Some(joined)
        }
    }
}
