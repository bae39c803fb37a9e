//! HRIR sets for ambisonic binaural decoding

use af_core::{AudioBuffer, Sample};

use crate::error::{SpatialError, SpatialResult};
use crate::hoa::AmbisonicOrder;

/// One impulse response per ACN channel, all at one sample rate and
/// zero padded to a common length.
#[derive(Debug, Clone, PartialEq)]
pub struct HrirSet {
    order: AmbisonicOrder,
    responses: AudioBuffer,
}

impl HrirSet {
    /// From a single buffer carrying exactly K channels
    pub fn from_multichannel(order: AmbisonicOrder, buffer: AudioBuffer) -> SpatialResult<Self> {
        let expected = order.channel_count();
        if buffer.number_of_channels() != expected {
            return Err(SpatialError::InvalidChannelCount {
                expected,
                got: buffer.number_of_channels(),
            });
        }

        Ok(Self {
            order,
            responses: buffer,
        })
    }

    /// From ⌈K/2⌉ stereo buffers; buffer `p` carries ACN channels `2p` and
    /// `2p + 1`. When K is odd the last buffer may be mono, and the right
    /// channel of a stereo last buffer is dropped.
    pub fn from_stereo_pairs(
        order: AmbisonicOrder,
        buffers: &[AudioBuffer],
    ) -> SpatialResult<Self> {
        let pairs = order.stereo_pair_count();
        if buffers.len() != pairs {
            return Err(SpatialError::InvalidChannelCount {
                expected: pairs,
                got: buffers.len(),
            });
        }

        let channels = order.channel_count();
        for (p, buffer) in buffers.iter().enumerate() {
            let got = buffer.number_of_channels();
            let odd_tail = p == pairs - 1 && channels % 2 == 1;
            if got != 2 && !(odd_tail && got == 1) {
                return Err(SpatialError::InvalidChannelCount { expected: 2, got });
            }
        }

        let joined = AudioBuffer::concat_channels(buffers)?;
        let sample_rate = joined.sample_rate();
        let responses = joined.into_channels().into_iter().take(channels).collect();

        Ok(Self {
            order,
            responses: AudioBuffer::from_channels(responses, sample_rate)?,
        })
    }

    /// Pick the packing by shape: one K-channel buffer, or stereo pairs
    pub fn from_buffers(order: AmbisonicOrder, buffers: &[AudioBuffer]) -> SpatialResult<Self> {
        match buffers {
            [single] if single.number_of_channels() == order.channel_count() => {
                Self::from_multichannel(order, single.clone())
            }
            _ => Self::from_stereo_pairs(order, buffers),
        }
    }

    pub fn order(&self) -> AmbisonicOrder {
        self.order
    }

    pub fn channel_count(&self) -> usize {
        self.responses.number_of_channels()
    }

    pub fn sample_rate(&self) -> u32 {
        self.responses.sample_rate()
    }

    /// Impulse response length in samples
    pub fn length(&self) -> usize {
        self.responses.length()
    }

    /// Response for an ACN channel
    pub fn response(&self, acn: usize) -> Option<&[Sample]> {
        self.responses.channel(acn)
    }

    /// ACN channels `2 * pair` and `2 * pair + 1` (mono for an odd tail)
    pub fn stereo_pair(&self, pair: usize) -> SpatialResult<AudioBuffer> {
        let channels: Vec<Vec<Sample>> = self
            .responses
            .channels()
            .iter()
            .skip(2 * pair)
            .take(2)
            .cloned()
            .collect();
        Ok(AudioBuffer::from_channels(channels, self.sample_rate())?)
    }
}
