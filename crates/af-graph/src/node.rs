//! Audio graph nodes

use std::any::Any;
use std::fmt;

use af_core::{AudioBuffer, Sample};

/// Unique node identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// The graph's built-in stereo output
    pub const DESTINATION: Self = Self(0);

    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Node type classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Source,
    Effect,
    Bus,
    Destination,
    /// Pulled every block even with no downstream connection
    Analyzer,
}

/// Audio node trait
pub trait AudioNode: Send + Sync {
    /// Node type
    fn node_type(&self) -> NodeType;

    /// Number of input channels
    fn num_inputs(&self) -> usize;

    /// Number of output channels
    fn num_outputs(&self) -> usize;

    /// Process one block
    fn process(&mut self, inputs: &[&[Sample]], outputs: &mut [&mut [Sample]]);

    /// Reset node state
    fn reset(&mut self);

    /// Set sample rate
    fn set_sample_rate(&mut self, sample_rate: f64);

    /// Downcast to concrete type
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Copies every input channel to the matching output channel.
///
/// Used as channel splitter, channel merger and destination.
pub struct PassthroughNode {
    channels: usize,
    node_type: NodeType,
}

impl PassthroughNode {
    pub fn new(channels: usize) -> Self {
        Self {
            channels,
            node_type: NodeType::Bus,
        }
    }

    pub fn destination(channels: usize) -> Self {
        Self {
            channels,
            node_type: NodeType::Destination,
        }
    }
}

impl AudioNode for PassthroughNode {
    fn node_type(&self) -> NodeType {
        self.node_type
    }

    fn num_inputs(&self) -> usize {
        self.channels
    }

    fn num_outputs(&self) -> usize {
        self.channels
    }

    fn process(&mut self, inputs: &[&[Sample]], outputs: &mut [&mut [Sample]]) {
        for (input, output) in inputs.iter().zip(outputs.iter_mut()) {
            output.copy_from_slice(input);
        }
    }

    fn reset(&mut self) {}

    fn set_sample_rate(&mut self, _sample_rate: f64) {}

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Gain node
pub struct GainNode {
    gain: f64,
    channels: usize,
}

impl GainNode {
    pub fn new(channels: usize) -> Self {
        Self {
            gain: 1.0,
            channels,
        }
    }

    pub fn with_gain(channels: usize, gain: f64) -> Self {
        Self { gain, channels }
    }

    pub fn set_gain(&mut self, gain: f64) {
        self.gain = gain;
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }
}

impl AudioNode for GainNode {
    fn node_type(&self) -> NodeType {
        NodeType::Effect
    }

    fn num_inputs(&self) -> usize {
        self.channels
    }

    fn num_outputs(&self) -> usize {
        self.channels
    }

    fn process(&mut self, inputs: &[&[Sample]], outputs: &mut [&mut [Sample]]) {
        for (input, output) in inputs.iter().zip(outputs.iter_mut()) {
            for (i, o) in input.iter().zip(output.iter_mut()) {
                *o = *i * self.gain;
            }
        }
    }

    fn reset(&mut self) {}

    fn set_sample_rate(&mut self, _sample_rate: f64) {}

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

enum SourceSignal {
    Silence,
    /// One DC value per channel
    Constant(Vec<Sample>),
    /// Planar buffer played once from `position`
    Buffer { data: AudioBuffer, position: usize },
}

/// Host-fed signal generator
pub struct SourceNode {
    channels: usize,
    signal: SourceSignal,
}

impl SourceNode {
    pub fn new(channels: usize) -> Self {
        Self {
            channels,
            signal: SourceSignal::Silence,
        }
    }

    /// Emit `values[i]` on channel `i` every sample
    pub fn constant(values: Vec<Sample>) -> Self {
        Self {
            channels: values.len(),
            signal: SourceSignal::Constant(values),
        }
    }

    /// Play a buffer once, then fall silent
    pub fn from_buffer(data: AudioBuffer) -> Self {
        Self {
            channels: data.number_of_channels(),
            signal: SourceSignal::Buffer { data, position: 0 },
        }
    }

    /// Replace the signal with per-channel constants. Missing channels are
    /// silent, extra values are ignored.
    pub fn set_constant(&mut self, values: &[Sample]) {
        let mut padded = vec![0.0; self.channels];
        for (dst, &src) in padded.iter_mut().zip(values) {
            *dst = src;
        }
        self.signal = SourceSignal::Constant(padded);
    }
}

impl AudioNode for SourceNode {
    fn node_type(&self) -> NodeType {
        NodeType::Source
    }

    fn num_inputs(&self) -> usize {
        0
    }

    fn num_outputs(&self) -> usize {
        self.channels
    }

    fn process(&mut self, _inputs: &[&[Sample]], outputs: &mut [&mut [Sample]]) {
        match &mut self.signal {
            SourceSignal::Silence => {
                for output in outputs.iter_mut() {
                    output.fill(0.0);
                }
            }
            SourceSignal::Constant(values) => {
                for (output, &value) in outputs.iter_mut().zip(values.iter()) {
                    output.fill(value);
                }
            }
            SourceSignal::Buffer { data, position } => {
                let start = *position;
                let mut written = 0;
                for (ch, output) in outputs.iter_mut().enumerate() {
                    output.fill(0.0);
                    if let Some(samples) = data.channel(ch) {
                        let end = (start + output.len()).min(samples.len());
                        if start < end {
                            output[..end - start].copy_from_slice(&samples[start..end]);
                            written = written.max(end - start);
                        }
                    }
                }
                *position = start + written;
            }
        }
    }

    fn reset(&mut self) {
        if let SourceSignal::Buffer { position, .. } = &mut self.signal {
            *position = 0;
        }
    }

    fn set_sample_rate(&mut self, _sample_rate: f64) {}

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Records the most recent block on each input channel
pub struct CaptureNode {
    frames: Vec<Vec<Sample>>,
}

impl CaptureNode {
    pub fn new(channels: usize) -> Self {
        Self {
            frames: vec![Vec::new(); channels],
        }
    }

    pub fn channel(&self, index: usize) -> Option<&[Sample]> {
        self.frames.get(index).map(Vec::as_slice)
    }

    pub fn channels(&self) -> &[Vec<Sample>] {
        &self.frames
    }

    /// Largest absolute sample across all channels of the last block
    pub fn peak(&self) -> Sample {
        self.frames
            .iter()
            .flatten()
            .fold(0.0, |acc: Sample, &s| acc.max(s.abs()))
    }
}

impl AudioNode for CaptureNode {
    fn node_type(&self) -> NodeType {
        NodeType::Analyzer
    }

    fn num_inputs(&self) -> usize {
        self.frames.len()
    }

    fn num_outputs(&self) -> usize {
        0
    }

    fn process(&mut self, inputs: &[&[Sample]], _outputs: &mut [&mut [Sample]]) {
        for (frame, input) in self.frames.iter_mut().zip(inputs.iter()) {
            frame.clear();
            frame.extend_from_slice(input);
        }
    }

    fn reset(&mut self) {
        for frame in &mut self.frames {
            frame.clear();
        }
    }

    fn set_sample_rate(&mut self, _sample_rate: f64) {}

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gain_scales_every_channel() {
        let mut gain = GainNode::with_gain(2, -1.0);
        let left = [1.0, 2.0];
        let right = [3.0, 4.0];
        let mut out_l = [0.0; 2];
        let mut out_r = [0.0; 2];
        gain.process(&[&left, &right], &mut [&mut out_l, &mut out_r]);
        assert_eq!(out_l, [-1.0, -2.0]);
        assert_eq!(out_r, [-3.0, -4.0]);
    }

    #[test]
    fn test_source_buffer_plays_once() {
        let data = AudioBuffer::from_channels(vec![vec![1.0, 2.0, 3.0]], 48000).unwrap();
        let mut source = SourceNode::from_buffer(data);
        let mut out = [0.0; 2];

        source.process(&[], &mut [&mut out]);
        assert_eq!(out, [1.0, 2.0]);
        source.process(&[], &mut [&mut out]);
        assert_eq!(out, [3.0, 0.0]);
        source.process(&[], &mut [&mut out]);
        assert_eq!(out, [0.0, 0.0]);

        source.reset();
        source.process(&[], &mut [&mut out]);
        assert_eq!(out, [1.0, 2.0]);
    }

    #[test]
    fn test_set_constant_pads_missing_channels() {
        let mut source = SourceNode::new(3);
        source.set_constant(&[5.0]);
        let mut a = [9.0; 2];
        let mut b = [9.0; 2];
        let mut c = [9.0; 2];
        source.process(&[], &mut [&mut a, &mut b, &mut c]);
        assert_eq!(a, [5.0, 5.0]);
        assert_eq!(b, [0.0, 0.0]);
        assert_eq!(c, [0.0, 0.0]);
    }

    #[test]
    fn test_capture_peak() {
        let mut capture = CaptureNode::new(2);
        capture.process(&[&[0.5, -0.75], &[0.25, 0.0]], &mut []);
        assert_eq!(capture.channel(1).unwrap(), &[0.25, 0.0]);
        assert_eq!(capture.peak(), 0.75);
    }
}
