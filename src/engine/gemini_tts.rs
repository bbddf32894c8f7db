use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{AudioPayload, TtsEngine, TtsError, TtsOptions};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini `generateContent` with the AUDIO response modality
pub struct GeminiTtsEngine {
    api_key: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiTtsEngine {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl TtsEngine for GeminiTtsEngine {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    async fn synthesize(&self, prompt: &str, options: &TtsOptions) -> Result<Option<AudioPayload>, TtsError> {
        let api_key = self.api_key.as_deref().ok_or(TtsError::MissingCredential)?;

        let body = GenerateContentRequest::audio(prompt, &options.voice);
        let resp = self
            .client
            .post(self.endpoint(&options.model))
            .header("x-goog-api-key", api_key)
            .header("User-Agent", "TamilThulir/0.1")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(classify_failure(status.as_u16(), &text));
        }

        let text = resp.text().await?;
        let parsed: GenerateContentResponse = serde_json::from_str(&text)
            .map_err(|e| TtsError::Malformed(e.to_string()))?;
        Ok(first_audio_part(&parsed))
    }
}

/// Sort a non-2xx answer into the failure kinds callers react to differently
pub fn classify_failure(status: u16, body: &str) -> TtsError {
    let lower = body.to_ascii_lowercase();
    if status == 429 || body.contains("RESOURCE_EXHAUSTED") || lower.contains("quota") {
        return TtsError::QuotaExhausted(summarize(body));
    }
    if matches!(status, 400 | 401 | 403) && (lower.contains("api key") || body.contains("API_KEY_INVALID")) {
        return TtsError::InvalidCredential(summarize(body));
    }
    TtsError::Http { status, body: summarize(body) }
}

fn summarize(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.chars().take(200).collect())
}

/// First inline audio part of any candidate; audio is not always the first part
pub fn first_audio_part(resp: &GenerateContentResponse) -> Option<AudioPayload> {
    resp.candidates
        .iter()
        .filter_map(|c| c.content.as_ref())
        .flat_map(|content| content.parts.iter())
        .filter_map(|part| part.inline_data.as_ref())
        .find(|blob| {
            !blob.data.is_empty()
                && blob.mime_type.as_deref().map_or(true, |m| m.starts_with("audio/"))
        })
        .map(|blob| AudioPayload {
            data: blob.data.clone(),
            mime_type: blob.mime_type.clone(),
        })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    pub fn audio(prompt: &str, voice: &str) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                    inline_data: None,
                }],
            }],
            generation_config: GenerationConfig {
                response_modalities: vec!["AUDIO".to_string()],
                speech_config: SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: voice.to_string(),
                        },
                    },
                },
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<String>,
    speech_config: SpeechConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig {
    voice_config: VoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig {
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig {
    voice_name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<Blob>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub data: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> GenerateContentResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn request_asks_for_audio_with_the_voice() {
        let body = serde_json::to_value(GenerateContentRequest::audio("Identify the letter க", "Puck")).unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Identify the letter க");
        assert!(body["contents"][0]["parts"][0].get("inlineData").is_none());
        assert_eq!(body["generationConfig"]["responseModalities"][0], "AUDIO");
        assert_eq!(
            body["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]["voiceName"],
            "Puck"
        );
    }

    #[test]
    fn audio_is_found_after_text_parts_and_empty_candidates() {
        let resp = parse(r#"{
            "candidates": [
                {"finishReason": "SAFETY"},
                {"content": {"parts": [
                    {"text": "Here you go"},
                    {"inlineData": {"mimeType": "audio/L16;codec=pcm;rate=24000", "data": "AAAB"}}
                ]}}
            ]
        }"#);
        let payload = first_audio_part(&resp).unwrap();
        assert_eq!(payload.data, "AAAB");
        assert_eq!(payload.mime_type.as_deref(), Some("audio/L16;codec=pcm;rate=24000"));
    }

    #[test]
    fn response_without_audio_is_none() {
        assert!(first_audio_part(&parse(r#"{"candidates": []}"#)).is_none());
        assert!(first_audio_part(&parse(r#"{}"#)).is_none());
        let text_only = parse(r#"{"candidates": [{"content": {"parts": [{"text": "no"}]}}]}"#);
        assert!(first_audio_part(&text_only).is_none());
        let empty_data = parse(r#"{"candidates": [{"content": {"parts": [{"inlineData": {"mimeType": "audio/L16", "data": ""}}]}}]}"#);
        assert!(first_audio_part(&empty_data).is_none());
        let image = parse(r#"{"candidates": [{"content": {"parts": [{"inlineData": {"mimeType": "image/png", "data": "AAAA"}}]}}]}"#);
        assert!(first_audio_part(&image).is_none());
    }

    #[test]
    fn quota_failures_are_recognized() {
        assert!(classify_failure(429, "").is_quota_exhausted());
        let body = r#"{"error": {"code": 400, "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED"}}"#;
        match classify_failure(400, body) {
            TtsError::QuotaExhausted(msg) => assert_eq!(msg, "Resource has been exhausted"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(classify_failure(403, "You exceeded your current quota").is_quota_exhausted());
    }

    #[test]
    fn other_failures_keep_status() {
        let body = r#"{"error": {"message": "API key not valid. Please pass a valid API key."}}"#;
        assert!(matches!(classify_failure(400, body), TtsError::InvalidCredential(_)));
        match classify_failure(500, "upstream broke") {
            TtsError::Http { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "upstream broke");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let engine = GeminiTtsEngine::new(Some("   ".to_string())).with_base_url("http://127.0.0.1:9");
        assert!(!engine.has_credential());
        let err = engine.synthesize("அ", &TtsOptions::default()).await.unwrap_err();
        assert!(matches!(err, TtsError::MissingCredential));
    }
}
