//! Error types for Ambiforge core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Invalid channel count: {0}")]
    InvalidChannelCount(usize),

    #[error("Channel length mismatch: channel {channel} has {got} samples, expected {expected}")]
    ChannelLengthMismatch {
        channel: usize,
        expected: usize,
        got: usize,
    },

    #[error("Sample rate mismatch: expected {expected}, got {got}")]
    SampleRateMismatch { expected: u32, got: u32 },

    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(u32),

    #[error("Invalid parameter: {0}")]
    InvalidParam(String),
}

/// Result type alias
pub type CoreResult<T> = Result<T, CoreError>;
