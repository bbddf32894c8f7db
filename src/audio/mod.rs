pub mod pcm;
pub mod playback;
pub mod processing;

use std::time::Duration;
use anyhow::Result;

pub use playback::CpalOutput;

/// Decoded, playable audio: one plane of normalized f32 samples per channel
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    planes: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl AudioBuffer {
    /// Silent buffer of `frame_count` frames per channel
    pub fn new(channels: u16, frame_count: usize, sample_rate: u32) -> Self {
        Self {
            planes: vec![vec![0.0; frame_count]; channels.max(1) as usize],
            sample_rate,
        }
    }

    pub fn channel_count(&self) -> u16 {
        self.planes.len() as u16
    }

    pub fn frame_count(&self) -> usize {
        self.planes.first().map(Vec::len).unwrap_or(0)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_data(&self, channel: usize) -> &[f32] {
        &self.planes[channel]
    }

    pub fn channel_data_mut(&mut self, channel: usize) -> &mut [f32] {
        &mut self.planes[channel]
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frame_count() as f64 / self.sample_rate as f64)
    }

    /// Frame-major copy (L R L R ...) as audio devices expect it
    pub fn interleaved(&self) -> Vec<f32> {
        let frames = self.frame_count();
        let mut out = Vec::with_capacity(frames * self.planes.len());
        for i in 0..frames {
            for plane in &self.planes {
                out.push(plane[i]);
            }
        }
        out
    }
}

/// Whether the output device is currently allowed to make sound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputState {
    Suspended,
    Running,
}

/// Shared audio output handed to the speech pipeline at startup
pub trait AudioOutput: Send + Sync {
    fn state(&self) -> OutputState;
    fn resume(&self) -> Result<()>;
    /// Start playing immediately and return without waiting for the end
    fn play_now(&self, buffer: AudioBuffer) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interleaves_planes_frame_by_frame() {
        let mut buffer = AudioBuffer::new(2, 2, 24000);
        buffer.channel_data_mut(0).copy_from_slice(&[0.1, 0.2]);
        buffer.channel_data_mut(1).copy_from_slice(&[-0.1, -0.2]);
        assert_eq!(buffer.interleaved(), vec![0.1, -0.1, 0.2, -0.2]);
    }

    #[test]
    fn duration_follows_source_rate() {
        let buffer = AudioBuffer::new(1, 12000, 24000);
        assert_eq!(buffer.duration(), Duration::from_millis(500));
        assert_eq!(buffer.channel_count(), 1);
    }
}
