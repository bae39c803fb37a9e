//! Error types for the audio graph

use af_core::CoreError;
use thiserror::Error;

use crate::node::NodeId;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Invalid connection: {from}:{from_channel} -> {to}:{to_channel}")]
    InvalidConnection {
        from: NodeId,
        from_channel: usize,
        to: NodeId,
        to_channel: usize,
    },

    #[error("Node {0} is not of the requested type")]
    NodeTypeMismatch(NodeId),

    #[error("Invalid block size: {0}")]
    InvalidBlockSize(usize),

    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(f64),

    #[error("FFT error: {0}")]
    Fft(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type GraphResult<T> = Result<T, GraphError>;
