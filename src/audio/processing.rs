use std::path::Path;
use anyhow::{Context, Result};
use rubato::{SincFixedIn, SincInterpolationType, SincInterpolationParameters, WindowFunction, Resampler};

use super::AudioBuffer;

const SINC_LEN: usize = 256;

/// Resample one plane. Only used by the output device when it cannot run at the source rate.
///
/// The input is padded with `SINC_LEN` zeros so the filter flushes its tail, and
/// the filter delay is trimmed from the front, so the result is time-aligned
/// with the source and `len * to_rate / from_rate` frames long.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let params = SincInterpolationParameters {
        sinc_len: SINC_LEN,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = to_rate as f64 / from_rate as f64;
    let mut padded = Vec::with_capacity(samples.len() + SINC_LEN);
    padded.extend_from_slice(samples);
    padded.resize(samples.len() + SINC_LEN, 0.0);

    let mut resampler = SincFixedIn::<f32>::new(
        ratio,
        2.0,
        params,
        padded.len(),
        1, // one plane at a time
    )?;
    let delay = resampler.output_delay();

    let output = resampler.process(&[padded], None)?;
    let plane = output.into_iter().next().unwrap_or_default();

    let expected = (samples.len() as f64 * ratio).round() as usize;
    let start = delay.min(plane.len());
    let end = (start + expected).min(plane.len());
    Ok(plane[start..end].to_vec())
}

/// Resample every plane of a buffer to `to_rate`
pub fn resample_buffer(buffer: &AudioBuffer, to_rate: u32) -> Result<AudioBuffer> {
    if buffer.sample_rate() == to_rate {
        return Ok(buffer.clone());
    }

    let planes = (0..buffer.channel_count() as usize)
        .map(|ch| resample(buffer.channel_data(ch), buffer.sample_rate(), to_rate))
        .collect::<Result<Vec<_>>>()?;

    let frames = planes.iter().map(Vec::len).min().unwrap_or(0);
    let mut out = AudioBuffer::new(buffer.channel_count(), frames, to_rate);
    for (ch, plane) in planes.iter().enumerate() {
        out.channel_data_mut(ch).copy_from_slice(&plane[..frames]);
    }
    Ok(out)
}

/// Peak absolute amplitude, 0.0 for silence
pub fn peak_level(buffer: &AudioBuffer) -> f32 {
    (0..buffer.channel_count() as usize)
        .flat_map(|ch| buffer.channel_data(ch).iter())
        .map(|s| s.abs())
        .fold(0.0f32, f32::max)
}

/// Write a buffer as a 16-bit PCM WAV file
pub fn write_wav(buffer: &AudioBuffer, path: &Path) -> Result<()> {
    let spec = hound::WavSpec {
        channels: buffer.channel_count(),
        sample_rate: buffer.sample_rate(),
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create WAV file {}", path.display()))?;
    for sample in buffer.interleaved() {
        let scaled = (sample * 32768.0).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        writer.write_sample(scaled)?;
    }
    writer.finalize().context("Failed to finalize WAV file")?;

    tracing::info!("Wrote {} frames to {}", buffer.frame_count(), path.display());
    Ok(())
}
