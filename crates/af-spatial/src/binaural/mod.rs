//! Binaural decoding of ambisonic streams
//!
//! - HRIR sets: one impulse response per ACN channel
//! - Symmetric convolution: stereo-packed pairs, left/right recombined
//!   through positive and negative harmonic buses

mod convolver;
mod hrir;

pub use convolver::SymmetricConvolver;
pub use hrir::HrirSet;
