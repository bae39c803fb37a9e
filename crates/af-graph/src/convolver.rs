//! Zero-latency partitioned convolution
//!
//! Uniformly partitioned overlap-save: the impulse response is cut into
//! block-sized partitions, each transformed once with a 2x block FFT. Every
//! block the newest input spectrum enters a frequency-domain delay line
//! and the output is the inverse transform of the sum of delay-line slots
//! times partition spectra. Latency equals zero samples.

use std::any::Any;
use std::sync::Arc;

use af_core::{AudioBuffer, Sample};
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex;

use crate::error::{GraphError, GraphResult};
use crate::node::{AudioNode, NodeType};

/// Single channel uniformly partitioned convolver
pub struct PartitionedConvolver {
    block_size: usize,
    forward: Arc<dyn RealToComplex<f64>>,
    inverse: Arc<dyn ComplexToReal<f64>>,
    /// IR partitions in frequency domain (half spectrum)
    ir_spectra: Vec<Vec<Complex<f64>>>,
    /// Frequency delay line, newest spectrum at `fdl_pos`
    fdl: Vec<Vec<Complex<f64>>>,
    fdl_pos: usize,
    /// Previous block followed by current block
    window: Vec<f64>,
    time_scratch: Vec<f64>,
    accumulator: Vec<Complex<f64>>,
    forward_scratch: Vec<Complex<f64>>,
    inverse_scratch: Vec<Complex<f64>>,
}

impl PartitionedConvolver {
    pub fn new(ir: &[Sample], block_size: usize) -> GraphResult<Self> {
        if block_size == 0 {
            return Err(GraphError::InvalidBlockSize(block_size));
        }

        let fft_size = block_size * 2;
        let bins = block_size + 1;
        let mut planner = RealFftPlanner::<f64>::new();
        let forward = planner.plan_fft_forward(fft_size);
        let inverse = planner.plan_fft_inverse(fft_size);
        let mut forward_scratch = forward.make_scratch_vec();

        let num_partitions = ir.len().div_ceil(block_size).max(1);
        let mut ir_spectra = Vec::with_capacity(num_partitions);
        for segment_idx in 0..num_partitions {
            let start = (segment_idx * block_size).min(ir.len());
            let end = (start + block_size).min(ir.len());

            let mut padded = vec![0.0; fft_size];
            padded[..end - start].copy_from_slice(&ir[start..end]);

            let mut spectrum = vec![Complex::new(0.0, 0.0); bins];
            forward
                .process_with_scratch(&mut padded, &mut spectrum, &mut forward_scratch)
                .map_err(|e| GraphError::Fft(e.to_string()))?;
            ir_spectra.push(spectrum);
        }

        Ok(Self {
            block_size,
            inverse_scratch: inverse.make_scratch_vec(),
            forward,
            inverse,
            fdl: vec![vec![Complex::new(0.0, 0.0); bins]; num_partitions],
            ir_spectra,
            fdl_pos: 0,
            window: vec![0.0; fft_size],
            time_scratch: vec![0.0; fft_size],
            accumulator: vec![Complex::new(0.0, 0.0); bins],
            forward_scratch,
        })
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn num_partitions(&self) -> usize {
        self.ir_spectra.len()
    }

    /// Convolve exactly one block. `input` and `output` must both hold
    /// `block_size` samples.
    pub fn process_block(&mut self, input: &[Sample], output: &mut [Sample]) {
        let b = self.block_size;
        debug_assert_eq!(input.len(), b);
        debug_assert_eq!(output.len(), b);

        self.window.copy_within(b.., 0);
        self.window[b..].copy_from_slice(input);
        self.time_scratch.copy_from_slice(&self.window);

        let partitions = self.ir_spectra.len();
        self.fdl_pos = (self.fdl_pos + partitions - 1) % partitions;

        if self
            .forward
            .process_with_scratch(
                &mut self.time_scratch,
                &mut self.fdl[self.fdl_pos],
                &mut self.forward_scratch,
            )
            .is_err()
        {
            output.fill(0.0);
            return;
        }

        self.accumulator.fill(Complex::new(0.0, 0.0));
        for (p, h) in self.ir_spectra.iter().enumerate() {
            let x = &self.fdl[(self.fdl_pos + p) % partitions];
            for ((acc, xk), hk) in self.accumulator.iter_mut().zip(x).zip(h) {
                *acc += xk * hk;
            }
        }

        // DC and Nyquist bins of a real signal are real
        self.accumulator[0].im = 0.0;
        self.accumulator[b].im = 0.0;

        if self
            .inverse
            .process_with_scratch(
                &mut self.accumulator,
                &mut self.time_scratch,
                &mut self.inverse_scratch,
            )
            .is_err()
        {
            output.fill(0.0);
            return;
        }

        let scale = 1.0 / (2 * b) as f64;
        for (o, &s) in output.iter_mut().zip(&self.time_scratch[b..]) {
            *o = s * scale;
        }
    }

    pub fn reset(&mut self) {
        self.window.fill(0.0);
        for slot in &mut self.fdl {
            slot.fill(Complex::new(0.0, 0.0));
        }
        self.fdl_pos = 0;
    }
}

/// Multichannel convolver: channel `i` of the input is convolved with
/// channel `i` of the impulse response. No normalization is applied.
pub struct ConvolverNode {
    channels: Vec<PartitionedConvolver>,
    block_size: usize,
}

impl ConvolverNode {
    pub fn new(ir: &AudioBuffer, block_size: usize) -> GraphResult<Self> {
        let channels = ir
            .channels()
            .iter()
            .map(|ch| PartitionedConvolver::new(ch, block_size))
            .collect::<GraphResult<Vec<_>>>()?;

        Ok(Self {
            channels,
            block_size,
        })
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }
}

impl AudioNode for ConvolverNode {
    fn node_type(&self) -> NodeType {
        NodeType::Effect
    }

    fn num_inputs(&self) -> usize {
        self.channels.len()
    }

    fn num_outputs(&self) -> usize {
        self.channels.len()
    }

    fn process(&mut self, inputs: &[&[Sample]], outputs: &mut [&mut [Sample]]) {
        let b = self.block_size;
        for ((conv, input), output) in self
            .channels
            .iter_mut()
            .zip(inputs)
            .zip(outputs.iter_mut())
        {
            output.fill(0.0);
            for (in_chunk, out_chunk) in input.chunks_exact(b).zip(output.chunks_exact_mut(b)) {
                conv.process_block(in_chunk, out_chunk);
            }
        }
    }

    fn reset(&mut self) {
        for conv in &mut self.channels {
            conv.reset();
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
