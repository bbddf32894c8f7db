use std::sync::Arc;
use std::time::Duration;
use serde::{Serialize, Deserialize};

use crate::audio::{AudioOutput, CpalOutput};
use crate::engine::{gemini_tts, GeminiTtsEngine, TtsEngine, TtsOptions};
use crate::quiz::QuizTiming;
use crate::speech::SpeechPipeline;

/// Everything a front-end needs for one run of the app
pub struct AppState {
    pub settings: Settings,
    pub speech: Arc<SpeechPipeline>,
}

impl AppState {
    /// Real engine and real output device
    pub fn new(settings: Settings, api_key: Option<String>) -> Self {
        let engine = GeminiTtsEngine::new(api_key).with_base_url(settings.tts.base_url.clone());
        if !engine.has_credential() {
            tracing::warn!("No API key configured; cards and quiz will stay silent");
        }
        Self::with_parts(settings, Arc::new(engine), Arc::new(CpalOutput::new()))
    }

    pub fn with_parts(settings: Settings, engine: Arc<dyn TtsEngine>, output: Arc<dyn AudioOutput>) -> Self {
        let speech = SpeechPipeline::new(engine, output, settings.tts.options())
            .with_fallback_rate(settings.tts.sample_rate);
        Self {
            settings,
            speech: Arc::new(speech),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub tts: TtsSettings,
    pub quiz: QuizSettings,
    pub general: GeneralSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsSettings {
    pub model: String,
    pub voice: String,
    pub base_url: String,
    /// Used when the audio MIME type names no rate
    pub sample_rate: u32,
}

impl Default for TtsSettings {
    fn default() -> Self {
        let options = TtsOptions::default();
        Self {
            model: options.model,
            voice: options.voice,
            base_url: gemini_tts::DEFAULT_BASE_URL.to_string(),
            sample_rate: crate::audio::pcm::DEFAULT_SAMPLE_RATE,
        }
    }
}

impl TtsSettings {
    pub fn options(&self) -> TtsOptions {
        TtsOptions {
            model: self.model.clone(),
            voice: self.voice.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizSettings {
    pub prompt_delay_ms: u64,
    pub advance_delay_ms: u64,
    /// Fixed seed for reproducible rounds; random when unset
    pub seed: Option<u64>,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            prompt_delay_ms: 500,
            advance_delay_ms: 2000,
            seed: None,
        }
    }
}

impl QuizSettings {
    pub fn timing(&self) -> QuizTiming {
        QuizTiming {
            prompt_delay: Duration::from_millis(self.prompt_delay_ms),
            advance_delay: Duration::from_millis(self.advance_delay_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Pause between items during the health check
    pub diagnostics_gap_ms: u64,
    /// Paint cards with their background color
    pub colored_cards: bool,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            diagnostics_gap_ms: 800,
            colored_cards: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_in_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"tts": {"voice": "Kore"}, "quiz": {"seed": 7}}"#).unwrap();
        assert_eq!(settings.tts.voice, "Kore");
        assert_eq!(settings.tts.model, "gemini-2.5-flash-preview-tts");
        assert_eq!(settings.tts.sample_rate, 24000);
        assert_eq!(settings.quiz.seed, Some(7));
        assert_eq!(settings.quiz.timing(), QuizTiming::default());
        assert_eq!(settings.general.diagnostics_gap_ms, 800);
    }
}
