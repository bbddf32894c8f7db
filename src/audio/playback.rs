use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample, StreamConfig};

use super::{AudioBuffer, AudioOutput, OutputState};

const REAP_INTERVAL: Duration = Duration::from_millis(250);
const TAIL_MARGIN: Duration = Duration::from_millis(200);
const START_TIMEOUT: Duration = Duration::from_secs(2);

/// A buffer to play and where to report whether its stream started
struct PlayRequest {
    buffer: AudioBuffer,
    started: SyncSender<Result<()>>,
}

type Opener = fn() -> Result<Sender<PlayRequest>>;

/// The default system output device.
///
/// The device is opened lazily by the first `resume()` and kept for the life of
/// the process. Until then the output reports `Suspended`. Every buffer gets its
/// own stream, so overlapping requests sound together instead of queueing.
pub struct CpalOutput {
    sender: Mutex<Option<Sender<PlayRequest>>>,
    running: AtomicBool,
    open: Opener,
}

impl CpalOutput {
    pub fn new() -> Self {
        Self::with_opener(open_default_device)
    }

    fn with_opener(open: Opener) -> Self {
        Self {
            sender: Mutex::new(None),
            running: AtomicBool::new(false),
            open,
        }
    }
}

impl Default for CpalOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioOutput for CpalOutput {
    fn state(&self) -> OutputState {
        if self.running.load(Ordering::SeqCst) {
            OutputState::Running
        } else {
            OutputState::Suspended
        }
    }

    fn resume(&self) -> Result<()> {
        let mut guard = self.sender.lock().map_err(|_| anyhow!("Audio output lock poisoned"))?;
        if guard.is_none() {
            *guard = Some((self.open)()?);
        }
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Returns once the stream has started, not when it finishes
    fn play_now(&self, buffer: AudioBuffer) -> Result<()> {
        if self.state() == OutputState::Suspended {
            anyhow::bail!("Audio output is suspended");
        }
        let sender = {
            let guard = self.sender.lock().map_err(|_| anyhow!("Audio output lock poisoned"))?;
            guard.as_ref().context("Audio output not opened")?.clone()
        };

        let (started, ack) = mpsc::sync_channel(1);
        sender
            .send(PlayRequest { buffer, started })
            .map_err(|_| anyhow!("Audio output thread has stopped"))?;

        match ack.recv_timeout(START_TIMEOUT) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(anyhow!("Audio output did not start in time")),
            Err(RecvTimeoutError::Disconnected) => Err(anyhow!("Audio output thread has stopped")),
        }
    }
}

/// Starts one stream per buffer. Lives on the output thread.
trait StreamStarter {
    type Stream;

    /// The started stream and when it may be dropped
    fn start(&self, buffer: AudioBuffer) -> Result<(Self::Stream, Instant)>;
}

struct DeviceStarter {
    device: cpal::Device,
}

impl StreamStarter for DeviceStarter {
    type Stream = cpal::Stream;

    fn start(&self, buffer: AudioBuffer) -> Result<(cpal::Stream, Instant)> {
        start_stream(&self.device, buffer)
    }
}

fn open_default_device() -> Result<Sender<PlayRequest>> {
    spawn_output_thread(|| {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow!("No output device available"))?;
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        Ok((DeviceStarter { device }, name))
    })
}

fn spawn_output_thread<S, F>(open: F) -> Result<Sender<PlayRequest>>
where
    S: StreamStarter + 'static,
    F: FnOnce() -> Result<(S, String)> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let (ready_tx, ready_rx) = mpsc::sync_channel(1);

    std::thread::Builder::new()
        .name("audio-output".into())
        .spawn(move || match open() {
            Ok((starter, name)) => {
                let _ = ready_tx.send(Ok(name));
                output_thread(starter, rx);
            }
            Err(e) => {
                let _ = ready_tx.send(Err(e));
            }
        })
        .context("Failed to spawn audio output thread")?;

    let device_name = ready_rx
        .recv()
        .context("Audio output thread exited during startup")??;
    tracing::info!("Audio output ready: {}", device_name);
    Ok(tx)
}

// cpal streams are not Send on every host, so the device and all streams live here.
fn output_thread<S: StreamStarter>(starter: S, rx: Receiver<PlayRequest>) {
    let mut active: Vec<(S::Stream, Instant)> = Vec::new();
    loop {
        match rx.recv_timeout(REAP_INTERVAL) {
            Ok(PlayRequest { buffer, started }) => match starter.start(buffer) {
                Ok(entry) => {
                    active.push(entry);
                    let _ = started.send(Ok(()));
                }
                Err(e) => {
                    tracing::error!("Failed to start playback: {:#}", e);
                    let _ = started.send(Err(e));
                }
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        let now = Instant::now();
        active.retain(|(_, ends_at)| *ends_at > now);
    }

    tracing::debug!("Audio output thread stopped");
}

fn start_stream(device: &cpal::Device, buffer: AudioBuffer) -> Result<(cpal::Stream, Instant)> {
    let (config, format) = pick_config(device, buffer.sample_rate())?;

    let buffer = if config.sample_rate.0 != buffer.sample_rate() {
        tracing::debug!(
            "Device cannot run at {}Hz, resampling to {}Hz",
            buffer.sample_rate(),
            config.sample_rate.0
        );
        super::processing::resample_buffer(&buffer, config.sample_rate.0)?
    } else {
        buffer
    };

    let frames = fit_channels(&buffer, config.channels as usize);
    let ends_at = Instant::now() + buffer.duration() + TAIL_MARGIN;

    let stream = match format {
        SampleFormat::I16 => build_stream::<i16>(device, &config, frames)?,
        SampleFormat::U16 => build_stream::<u16>(device, &config, frames)?,
        _ => build_stream::<f32>(device, &config, frames)?,
    };
    stream.play().context("Failed to start output stream")?;

    tracing::debug!(
        "Playing {:.2}s at {}Hz on {} channel(s)",
        buffer.duration().as_secs_f32(),
        config.sample_rate.0,
        config.channels
    );
    Ok((stream, ends_at))
}

/// Prefer a config at the source rate so the host does the rate conversion
fn pick_config(device: &cpal::Device, rate: u32) -> Result<(StreamConfig, SampleFormat)> {
    let usable = |f: SampleFormat| matches!(f, SampleFormat::F32 | SampleFormat::I16 | SampleFormat::U16);

    let mut candidates: Vec<_> = device
        .supported_output_configs()
        .context("Failed to query output configs")?
        .filter(|c| usable(c.sample_format()))
        .filter(|c| c.min_sample_rate().0 <= rate && c.max_sample_rate().0 >= rate)
        .collect();
    candidates.sort_by_key(|c| (c.sample_format() != SampleFormat::F32, c.channels()));

    if let Some(range) = candidates.into_iter().next() {
        let format = range.sample_format();
        return Ok((range.with_sample_rate(cpal::SampleRate(rate)).config(), format));
    }

    let default = device
        .default_output_config()
        .context("Failed to get default output config")?;
    Ok((default.config(), default.sample_format()))
}

/// Interleave for the device's channel count, repeating the last source channel
fn fit_channels(buffer: &AudioBuffer, device_channels: usize) -> Vec<f32> {
    let source_channels = buffer.channel_count() as usize;
    let mut out = Vec::with_capacity(buffer.frame_count() * device_channels);
    for i in 0..buffer.frame_count() {
        for ch in 0..device_channels {
            out.push(buffer.channel_data(ch.min(source_channels - 1))[i]);
        }
    }
    out
}

fn build_stream<T>(device: &cpal::Device, config: &StreamConfig, samples: Vec<f32>) -> Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let mut position = 0usize;
    let stream = device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                for slot in data.iter_mut() {
                    let sample = samples.get(position).copied().unwrap_or(0.0);
                    *slot = T::from_sample(sample);
                    position += 1;
                }
            },
            |err| {
                tracing::error!("Audio output error: {}", err);
            },
            None,
        )
        .context("Failed to build output stream")?;
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::engine::TtsOptions;
    use crate::speech::testing::FakeEngine;
    use crate::speech::{SpeechError, SpeechPipeline};

    struct FailingStarter;

    impl StreamStarter for FailingStarter {
        type Stream = ();

        fn start(&self, _buffer: AudioBuffer) -> Result<((), Instant)> {
            anyhow::bail!("device busy")
        }
    }

    struct SilentStarter;

    impl StreamStarter for SilentStarter {
        type Stream = ();

        fn start(&self, buffer: AudioBuffer) -> Result<((), Instant)> {
            Ok(((), Instant::now() + buffer.duration()))
        }
    }

    fn open_failing() -> Result<Sender<PlayRequest>> {
        spawn_output_thread(|| Ok((FailingStarter, "failing".to_string())))
    }

    fn open_silent() -> Result<Sender<PlayRequest>> {
        spawn_output_thread(|| Ok((SilentStarter, "silent".to_string())))
    }

    fn open_missing() -> Result<Sender<PlayRequest>> {
        spawn_output_thread::<SilentStarter, _>(|| anyhow::bail!("No output device available"))
    }

    #[test]
    fn new_output_starts_suspended() {
        let output = CpalOutput::new();
        assert_eq!(output.state(), OutputState::Suspended);
        assert!(output.play_now(AudioBuffer::new(1, 10, 24000)).is_err());
    }

    #[test]
    fn play_waits_for_the_stream_to_start() {
        let output = CpalOutput::with_opener(open_silent);
        output.resume().unwrap();
        assert_eq!(output.state(), OutputState::Running);
        output.play_now(AudioBuffer::new(1, 2400, 24000)).unwrap();
    }

    #[test]
    fn failed_stream_start_is_an_error() {
        let output = CpalOutput::with_opener(open_failing);
        output.resume().unwrap();
        let err = output.play_now(AudioBuffer::new(1, 2400, 24000)).unwrap_err();
        assert!(err.to_string().contains("device busy"));
    }

    #[test]
    fn missing_device_keeps_output_suspended() {
        let output = CpalOutput::with_opener(open_missing);
        assert!(output.resume().is_err());
        assert_eq!(output.state(), OutputState::Suspended);
    }

    #[tokio::test]
    async fn speech_fails_when_playback_cannot_start() {
        let engine = Arc::new(FakeEngine::new(true));
        let output = Arc::new(CpalOutput::with_opener(open_failing));
        let speech = SpeechPipeline::new(engine, output, TtsOptions::default());

        assert!(matches!(speech.try_speak("அ").await, Err(SpeechError::Output(_))));
        assert!(!speech.speak("அ").await);
    }

    #[test]
    fn mono_is_copied_to_every_device_channel() {
        let mut buffer = AudioBuffer::new(1, 2, 24000);
        buffer.channel_data_mut(0).copy_from_slice(&[0.5, -0.5]);
        assert_eq!(fit_channels(&buffer, 2), vec![0.5, 0.5, -0.5, -0.5]);
        assert_eq!(fit_channels(&buffer, 1), vec![0.5, -0.5]);
    }
}
