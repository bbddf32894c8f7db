use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use super::AudioBuffer;

/// Gemini TTS returns 24kHz mono unless the MIME type says otherwise
pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;
pub const DEFAULT_CHANNELS: u16 = 1;

/// Decode a base64 payload, ignoring any embedded whitespace or line breaks
pub fn decode_base64(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let compact: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD.decode(compact)
}

/// Convert little-endian signed 16-bit PCM into a normalized buffer.
///
/// An odd byte count is padded with a trailing zero byte rather than rejected,
/// so `n` bytes always yield `(n + 1) / 2` samples.
pub fn decode_pcm16(bytes: &[u8], sample_rate: u32, channels: u16) -> AudioBuffer {
    let mut aligned;
    let data = if bytes.len() % 2 != 0 {
        tracing::warn!("Audio data length {} is odd, padding one byte for alignment", bytes.len());
        aligned = Vec::with_capacity(bytes.len() + 1);
        aligned.extend_from_slice(bytes);
        aligned.push(0);
        aligned.as_slice()
    } else {
        bytes
    };

    let channels = channels.max(1) as usize;
    let total_samples = data.len() / 2;
    let frame_count = total_samples / channels;
    let mut buffer = AudioBuffer::new(channels as u16, frame_count, sample_rate);

    for channel in 0..channels {
        let plane = buffer.channel_data_mut(channel);
        for (i, slot) in plane.iter_mut().enumerate() {
            let offset = (i * channels + channel) * 2;
            let sample = i16::from_le_bytes([data[offset], data[offset + 1]]);
            *slot = sample as f32 / 32768.0;
        }
    }

    buffer
}

/// Read the `rate=` parameter from a MIME type like `audio/L16;codec=pcm;rate=24000`
pub fn sample_rate_from_mime(mime: &str) -> Option<u32> {
    mime.split(';')
        .map(str::trim)
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("rate"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .filter(|rate| *rate > 0)
}
