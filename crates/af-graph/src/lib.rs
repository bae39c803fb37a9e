//! af-graph: Block-based audio graph runtime
//!
//! Nodes are connected channel to channel. Every call to
//! [`AudioGraph::process`] renders one block, pulling only from nodes that
//! can reach the destination or an analyzer, so disconnected chains cost
//! nothing.

mod convolver;
mod error;
mod graph;
mod node;

pub use convolver::{ConvolverNode, PartitionedConvolver};
pub use error::{GraphError, GraphResult};
pub use graph::{AudioGraph, Connection};
pub use node::{AudioNode, CaptureNode, GainNode, NodeId, NodeType, PassthroughNode, SourceNode};
