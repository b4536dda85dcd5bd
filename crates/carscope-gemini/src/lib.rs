//! Client for the Gemini text-generation REST API.

pub mod client;
pub mod error;
mod types;

pub use client::{GeminiClient, CLASSIFICATION_PROMPT};
pub use error::GeminiError;
