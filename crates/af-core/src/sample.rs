//! Sample types and planar audio buffers

use crate::error::{CoreError, CoreResult};

/// Type alias for audio samples (always f64 for maximum precision)
pub type Sample = f64;

/// Planar multichannel audio buffer.
///
/// Every channel holds the same number of frames. This is the normalized
/// shape asset loaders hand to the renderer: channel count, length, sample
/// rate and one flat sample vector per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    channels: Vec<Vec<Sample>>,
}

impl AudioBuffer {
    /// Create a silent buffer
    pub fn new(num_channels: usize, length: usize, sample_rate: u32) -> CoreResult<Self> {
        Self::from_channels(vec![vec![0.0; length]; num_channels], sample_rate)
    }

    /// Wrap already planar channel data
    pub fn from_channels(channels: Vec<Vec<Sample>>, sample_rate: u32) -> CoreResult<Self> {
        if channels.is_empty() {
            return Err(CoreError::InvalidChannelCount(0));
        }
        if sample_rate == 0 {
            return Err(CoreError::InvalidSampleRate(sample_rate));
        }

        let expected = channels[0].len();
        if let Some((channel, ch)) = channels
            .iter()
            .enumerate()
            .find(|(_, ch)| ch.len() != expected)
        {
            return Err(CoreError::ChannelLengthMismatch {
                channel,
                expected,
                got: ch.len(),
            });
        }

        Ok(Self {
            sample_rate,
            channels,
        })
    }

    /// Deinterleave frame-ordered samples
    pub fn from_interleaved(
        samples: &[Sample],
        num_channels: usize,
        sample_rate: u32,
    ) -> CoreResult<Self> {
        if num_channels == 0 {
            return Err(CoreError::InvalidChannelCount(0));
        }
        if samples.len() % num_channels != 0 {
            return Err(CoreError::InvalidParam(format!(
                "{} interleaved samples do not divide into {} channels",
                samples.len(),
                num_channels
            )));
        }

        let length = samples.len() / num_channels;
        let mut channels = vec![Vec::with_capacity(length); num_channels];
        for frame in samples.chunks_exact(num_channels) {
            for (ch, &s) in channels.iter_mut().zip(frame) {
                ch.push(s);
            }
        }

        Self::from_channels(channels, sample_rate)
    }

    /// Stack the channels of several buffers into one.
    ///
    /// Shorter buffers are zero padded to the longest length. All buffers
    /// must share a sample rate.
    pub fn concat_channels(buffers: &[AudioBuffer]) -> CoreResult<Self> {
        let first = buffers.first().ok_or(CoreError::InvalidChannelCount(0))?;
        let length = buffers.iter().map(|b| b.length()).max().unwrap_or(0);

        let mut channels = Vec::new();
        for buffer in buffers {
            if buffer.sample_rate != first.sample_rate {
                return Err(CoreError::SampleRateMismatch {
                    expected: first.sample_rate,
                    got: buffer.sample_rate,
                });
            }
            for ch in &buffer.channels {
                let mut padded = ch.clone();
                padded.resize(length, 0.0);
                channels.push(padded);
            }
        }

        Self::from_channels(channels, first.sample_rate)
    }

    #[inline]
    pub fn number_of_channels(&self) -> usize {
        self.channels.len()
    }

    /// Frames per channel
    #[inline]
    pub fn length(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_secs(&self) -> f64 {
        self.length() as f64 / self.sample_rate as f64
    }

    pub fn channel(&self, index: usize) -> Option<&[Sample]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    pub fn channel_mut(&mut self, index: usize) -> Option<&mut [Sample]> {
        self.channels.get_mut(index).map(Vec::as_mut_slice)
    }

    pub fn channels(&self) -> &[Vec<Sample>] {
        &self.channels
    }

    pub fn into_channels(self) -> Vec<Vec<Sample>> {
        self.channels
    }

    /// Zero pad (never truncate) every channel to `length` frames
    pub fn pad_to(&mut self, length: usize) {
        if length > self.length() {
            for ch in &mut self.channels {
                ch.resize(length, 0.0);
            }
        }
    }
}
