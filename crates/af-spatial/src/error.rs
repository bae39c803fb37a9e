//! Error types for ambisonic rendering

use af_core::CoreError;
use af_graph::GraphError;
use thiserror::Error;

/// Ambisonic rendering error types
#[derive(Error, Debug)]
pub enum SpatialError {
    /// Invalid channel count
    #[error("Invalid channel count: expected {expected}, got {got}")]
    InvalidChannelCount { expected: usize, got: usize },

    /// Invalid Ambisonic order
    #[error("Invalid Ambisonic order: {0} (supported: 1-3)")]
    InvalidAmbisonicOrder(usize),

    /// Channel map is not a permutation of the channel indices
    #[error("Invalid channel map: {0}")]
    InvalidChannelMap(String),

    /// Unknown rendering mode name
    #[error("Invalid rendering mode: {0}")]
    InvalidRenderingMode(String),

    /// A resource failed to load or decode
    #[error("Failed to load resource '{name}': {reason}")]
    ResourceLoad { name: String, reason: String },

    /// Two requests in one batch share a name
    #[error("Duplicate resource name: {0}")]
    DuplicateResource(String),

    /// Configuration parse error
    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),

    /// Audio graph error
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Buffer error
    #[error("Buffer error: {0}")]
    Core(#[from] CoreError),
}

/// Result type for ambisonic operations
pub type SpatialResult<T> = Result<T, SpatialError>;
