pub mod gemini_tts;

use async_trait::async_trait;
use serde::{Serialize, Deserialize};
use thiserror::Error;

pub use gemini_tts::GeminiTtsEngine;

/// Options sent with every synthesis request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtsOptions {
    pub model: String,
    pub voice: String,
}

impl Default for TtsOptions {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash-preview-tts".to_string(),
            voice: "Puck".to_string(),
        }
    }
}

/// Raw audio as returned by the remote engine, still base64 encoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioPayload {
    pub data: String,
    pub mime_type: Option<String>,
}

#[derive(Debug, Error)]
pub enum TtsError {
    #[error("API key is missing")]
    MissingCredential,

    #[error("quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("API key rejected: {0}")]
    InvalidCredential(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl TtsError {
    pub fn is_quota_exhausted(&self) -> bool {
        matches!(self, Self::QuotaExhausted(_))
    }
}

/// Text in, encoded audio out. `Ok(None)` is a well-formed answer without audio.
#[async_trait]
pub trait TtsEngine: Send + Sync {
    fn name(&self) -> &'static str;
    fn has_credential(&self) -> bool;
    async fn synthesize(&self, prompt: &str, options: &TtsOptions) -> Result<Option<AudioPayload>, TtsError>;
}
