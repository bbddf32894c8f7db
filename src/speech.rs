use std::sync::Arc;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::audio::{pcm, AudioOutput, OutputState};
use crate::engine::{TtsEngine, TtsError, TtsOptions};

/// One thing to say. Single characters get a carrier phrase so the model
/// enunciates the letter instead of guessing at a one-symbol prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    pub text: String,
}

impl SpeechRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn prompt(&self) -> String {
        let trimmed = self.text.trim();
        if trimmed.chars().count() == 1 {
            format!("Pronounce the Tamil letter {} clearly.", trimmed)
        } else {
            trimmed.to_string()
        }
    }
}

/// User-facing notices a front-end may choose to show
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechNotice {
    QuotaExhausted,
    InvalidCredential,
}

impl SpeechNotice {
    pub fn message(&self) -> &'static str {
        match self {
            Self::QuotaExhausted => "Daily learning limit reached! Please try again tomorrow.",
            Self::InvalidCredential => "API Key is invalid or missing.",
        }
    }
}

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("no API key configured")]
    MissingCredential,

    #[error("audio output unavailable: {0:#}")]
    Output(anyhow::Error),

    #[error(transparent)]
    Service(TtsError),

    #[error("no audio returned")]
    EmptyPayload,

    #[error("audio payload is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),
}

impl From<TtsError> for SpeechError {
    fn from(err: TtsError) -> Self {
        match err {
            TtsError::MissingCredential => Self::MissingCredential,
            other => Self::Service(other),
        }
    }
}

/// What was started
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackReport {
    pub frames: usize,
    pub sample_rate: u32,
    pub duration_ms: u64,
}

/// Text to sound: remote synthesis, PCM decode, playback on the shared output.
pub struct SpeechPipeline {
    engine: Arc<dyn TtsEngine>,
    output: Arc<dyn AudioOutput>,
    options: TtsOptions,
    fallback_rate: u32,
    notices: broadcast::Sender<SpeechNotice>,
}

impl SpeechPipeline {
    pub fn new(engine: Arc<dyn TtsEngine>, output: Arc<dyn AudioOutput>, options: TtsOptions) -> Self {
        let (notices, _) = broadcast::channel(16);
        Self {
            engine,
            output,
            options,
            fallback_rate: pcm::DEFAULT_SAMPLE_RATE,
            notices,
        }
    }

    /// Rate assumed when the payload's MIME type does not name one
    pub fn with_fallback_rate(mut self, rate: u32) -> Self {
        if rate > 0 {
            self.fallback_rate = rate;
        }
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SpeechNotice> {
        self.notices.subscribe()
    }

    pub fn has_credential(&self) -> bool {
        self.engine.has_credential()
    }

    /// Speak `text`. Never fails past this point: every problem is logged and
    /// reported as `false`.
    pub async fn speak(&self, text: &str) -> bool {
        match self.try_speak(text).await {
            Ok(report) => {
                tracing::debug!("Speaking '{}' ({}ms)", text, report.duration_ms);
                true
            }
            Err(SpeechError::MissingCredential) => {
                tracing::warn!("Cannot speak '{}': no API key configured", text);
                false
            }
            Err(SpeechError::EmptyPayload) => {
                tracing::warn!("TTS returned no audio data for text: {}", text);
                false
            }
            Err(SpeechError::Service(e)) if e.is_quota_exhausted() => {
                tracing::warn!("TTS quota exhausted while speaking '{}': {}", text, e);
                false
            }
            Err(e) => {
                tracing::error!("Error generating speech for '{}' via {}: {}", text, self.engine.name(), e);
                false
            }
        }
    }

    /// Same as `speak` but hands the failure back to the caller
    pub async fn try_speak(&self, text: &str) -> Result<PlaybackReport, SpeechError> {
        if !self.engine.has_credential() {
            return Err(SpeechError::MissingCredential);
        }

        // Must stay on the path started by the user's action
        if self.output.state() == OutputState::Suspended {
            self.output.resume().map_err(SpeechError::Output)?;
        }

        let request = SpeechRequest::new(text);
        let payload = match self.engine.synthesize(&request.prompt(), &self.options).await {
            Ok(Some(payload)) => payload,
            Ok(None) => return Err(SpeechError::EmptyPayload),
            Err(e) => {
                self.notify(&e);
                return Err(e.into());
            }
        };

        let bytes = pcm::decode_base64(&payload.data)?;
        if bytes.is_empty() {
            return Err(SpeechError::EmptyPayload);
        }
        let sample_rate = payload
            .mime_type
            .as_deref()
            .and_then(pcm::sample_rate_from_mime)
            .unwrap_or(self.fallback_rate);

        let buffer = pcm::decode_pcm16(&bytes, sample_rate, pcm::DEFAULT_CHANNELS);
        let report = PlaybackReport {
            frames: buffer.frame_count(),
            sample_rate: buffer.sample_rate(),
            duration_ms: buffer.duration().as_millis() as u64,
        };

        self.output.play_now(buffer).map_err(SpeechError::Output)?;
        Ok(report)
    }

    /// Synthesize and decode without playing, for exporting to a file
    pub async fn render(&self, text: &str) -> Result<crate::audio::AudioBuffer, SpeechError> {
        if !self.engine.has_credential() {
            return Err(SpeechError::MissingCredential);
        }
        let request = SpeechRequest::new(text);
        let payload = self
            .engine
            .synthesize(&request.prompt(), &self.options)
            .await?
            .ok_or(SpeechError::EmptyPayload)?;
        let bytes = pcm::decode_base64(&payload.data)?;
        let sample_rate = payload
            .mime_type
            .as_deref()
            .and_then(pcm::sample_rate_from_mime)
            .unwrap_or(self.fallback_rate);
        Ok(pcm::decode_pcm16(&bytes, sample_rate, pcm::DEFAULT_CHANNELS))
    }

    fn notify(&self, err: &TtsError) {
        let notice = match err {
            TtsError::QuotaExhausted(_) => SpeechNotice::QuotaExhausted,
            TtsError::InvalidCredential(_) => SpeechNotice::InvalidCredential,
            _ => return,
        };
        // No subscribers is fine
        let _ = self.notices.send(notice);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use async_trait::async_trait;

    use crate::audio::{AudioBuffer, AudioOutput, OutputState};
    use crate::engine::{AudioPayload, TtsEngine, TtsError, TtsOptions};

    pub enum Scripted {
        Audio(AudioPayload),
        Silent,
        Fail(TtsError),
    }

    /// Engine that replays scripted answers and records prompts
    pub struct FakeEngine {
        pub credential: bool,
        pub script: Mutex<VecDeque<Scripted>>,
        pub prompts: Mutex<Vec<String>>,
        pub calls: AtomicUsize,
    }

    impl FakeEngine {
        pub fn new(credential: bool) -> Self {
            Self {
                credential,
                script: Mutex::new(VecDeque::new()),
                prompts: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn push(&self, answer: Scripted) {
            self.script.lock().unwrap().push_back(answer);
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    /// Base64 of the given little-endian s16 samples
    pub fn pcm_payload(samples: &[i16], mime: Option<&str>) -> AudioPayload {
        use base64::Engine as _;
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        AudioPayload {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            mime_type: mime.map(str::to_string),
        }
    }

    #[async_trait]
    impl TtsEngine for FakeEngine {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn has_credential(&self) -> bool {
            self.credential
        }

        async fn synthesize(&self, prompt: &str, _options: &TtsOptions) -> Result<Option<AudioPayload>, TtsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            // Unscripted calls answer with a short beep
            match self.script.lock().unwrap().pop_front() {
                Some(Scripted::Audio(p)) => Ok(Some(p)),
                Some(Scripted::Silent) => Ok(None),
                Some(Scripted::Fail(e)) => Err(e),
                None => Ok(Some(pcm_payload(&[100, -100, 100, -100], None))),
            }
        }
    }

    /// Output sink that records what it was asked to play
    pub struct FakeOutput {
        pub state: Mutex<OutputState>,
        pub resumes: AtomicUsize,
        pub played: Mutex<Vec<AudioBuffer>>,
    }

    impl FakeOutput {
        pub fn suspended() -> Self {
            Self {
                state: Mutex::new(OutputState::Suspended),
                resumes: AtomicUsize::new(0),
                played: Mutex::new(Vec::new()),
            }
        }

        pub fn played(&self) -> Vec<AudioBuffer> {
            self.played.lock().unwrap().clone()
        }
    }

    impl AudioOutput for FakeOutput {
        fn state(&self) -> OutputState {
            *self.state.lock().unwrap()
        }

        fn resume(&self) -> anyhow::Result<()> {
            self.resumes.fetch_add(1, Ordering::SeqCst);
            *self.state.lock().unwrap() = OutputState::Running;
            Ok(())
        }

        fn play_now(&self, buffer: AudioBuffer) -> anyhow::Result<()> {
            anyhow::ensure!(self.state() == OutputState::Running, "output suspended");
            self.played.lock().unwrap().push(buffer);
            Ok(())
        }
    }
}
