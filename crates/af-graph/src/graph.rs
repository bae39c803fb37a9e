//! Audio graph for node-based processing

use std::collections::{HashMap, HashSet};

use af_core::Sample;

use crate::error::{GraphError, GraphResult};
use crate::node::{AudioNode, GainNode, NodeId, NodeType, PassthroughNode};

/// Connection between nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    pub from_node: NodeId,
    pub from_channel: usize,
    pub to_node: NodeId,
    pub to_channel: usize,
}

/// Channel count of the built-in destination
const DESTINATION_CHANNELS: usize = 2;

/// Audio processing graph
pub struct AudioGraph {
    nodes: HashMap<NodeId, Box<dyn AudioNode>>,
    connections: Vec<Connection>,
    processing_order: Vec<NodeId>,
    buffers: HashMap<NodeId, Vec<Vec<Sample>>>,
    /// Scratch input buffers, grown on demand to the widest node
    input_buffers: Vec<Vec<Sample>>,
    /// Scratch output buffers, grown on demand to the widest node
    output_buffers: Vec<Vec<Sample>>,
    block_size: usize,
    sample_rate: f64,
    next_id: u32,
    dirty: bool,
}

impl AudioGraph {
    pub fn new(block_size: usize, sample_rate: f64) -> GraphResult<Self> {
        if block_size == 0 {
            return Err(GraphError::InvalidBlockSize(block_size));
        }
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(GraphError::InvalidSampleRate(sample_rate));
        }

        let mut graph = Self {
            nodes: HashMap::new(),
            connections: Vec::new(),
            processing_order: Vec::new(),
            buffers: HashMap::new(),
            input_buffers: Vec::new(),
            output_buffers: Vec::new(),
            block_size,
            sample_rate,
            next_id: 0,
            dirty: true,
        };
        graph.add_node(Box::new(PassthroughNode::destination(DESTINATION_CHANNELS)));

        Ok(graph)
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Add a node to the graph
    pub fn add_node(&mut self, mut node: Box<dyn AudioNode>) -> NodeId {
        let id = NodeId::new(self.next_id);
        self.next_id += 1;

        node.set_sample_rate(self.sample_rate);

        // Allocate buffers for node outputs
        let buffers: Vec<Vec<Sample>> = (0..node.num_outputs())
            .map(|_| vec![0.0; self.block_size])
            .collect();

        self.buffers.insert(id, buffers);
        self.nodes.insert(id, node);
        self.dirty = true;

        id
    }

    /// Remove a node and every connection touching it. The destination
    /// cannot be removed.
    pub fn remove_node(&mut self, id: NodeId) -> Option<Box<dyn AudioNode>> {
        if id == NodeId::DESTINATION {
            return None;
        }

        self.connections.retain(|c| c.from_node != id && c.to_node != id);

        self.buffers.remove(&id);
        self.dirty = true;

        self.nodes.remove(&id)
    }

    /// Id the next [`add_node`](Self::add_node) call will assign
    pub fn next_node_id(&self) -> NodeId {
        NodeId::new(self.next_id)
    }

    /// Remove every node added at or after `first`, with its connections.
    /// Returns the number of nodes removed.
    pub fn remove_nodes_since(&mut self, first: NodeId) -> usize {
        let mut ids: Vec<NodeId> = self
            .nodes
            .keys()
            .copied()
            .filter(|&id| id >= first)
            .collect();
        ids.sort();
        ids.into_iter().filter_map(|id| self.remove_node(id)).count()
    }

    /// Connect one output channel to one input channel.
    ///
    /// Connecting an existing edge again is a no-op.
    pub fn connect(
        &mut self,
        from_node: NodeId,
        from_channel: usize,
        to_node: NodeId,
        to_channel: usize,
    ) -> GraphResult<()> {
        let from = self
            .nodes
            .get(&from_node)
            .ok_or(GraphError::NodeNotFound(from_node))?;
        let to = self
            .nodes
            .get(&to_node)
            .ok_or(GraphError::NodeNotFound(to_node))?;

        if from_channel >= from.num_outputs() || to_channel >= to.num_inputs() {
            return Err(GraphError::InvalidConnection {
                from: from_node,
                from_channel,
                to: to_node,
                to_channel,
            });
        }

        let connection = Connection {
            from_node,
            from_channel,
            to_node,
            to_channel,
        };
        if !self.connections.contains(&connection) {
            self.connections.push(connection);
            self.dirty = true;
        }
        Ok(())
    }

    /// Connect channel `i` to channel `i` for every channel both nodes have
    pub fn connect_channels(&mut self, from_node: NodeId, to_node: NodeId) -> GraphResult<()> {
        let outputs = self
            .nodes
            .get(&from_node)
            .ok_or(GraphError::NodeNotFound(from_node))?
            .num_outputs();
        let inputs = self
            .nodes
            .get(&to_node)
            .ok_or(GraphError::NodeNotFound(to_node))?
            .num_inputs();

        for ch in 0..outputs.min(inputs) {
            self.connect(from_node, ch, to_node, ch)?;
        }
        Ok(())
    }

    /// Remove every connection from `from_node` to `to_node`
    pub fn disconnect(&mut self, from_node: NodeId, to_node: NodeId) -> usize {
        self.remove_connections(|c| c.from_node == from_node && c.to_node == to_node)
    }

    /// Remove every outgoing connection of a node
    pub fn disconnect_output(&mut self, from_node: NodeId) -> usize {
        self.remove_connections(|c| c.from_node == from_node)
    }

    /// Remove a single channel-to-channel connection
    pub fn disconnect_channel(
        &mut self,
        from_node: NodeId,
        from_channel: usize,
        to_node: NodeId,
        to_channel: usize,
    ) -> usize {
        let target = Connection {
            from_node,
            from_channel,
            to_node,
            to_channel,
        };
        self.remove_connections(|c| *c == target)
    }

    fn remove_connections(&mut self, matches: impl Fn(&Connection) -> bool) -> usize {
        let before = self.connections.len();
        self.connections.retain(|c| !matches(c));
        let removed = before - self.connections.len();
        if removed > 0 {
            self.dirty = true;
        }
        removed
    }

    /// True when at least one edge runs from `from_node` to `to_node`
    pub fn is_connected(&self, from_node: NodeId, to_node: NodeId) -> bool {
        self.connections
            .iter()
            .any(|c| c.from_node == from_node && c.to_node == to_node)
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get a node by ID
    pub fn get_node(&self, id: NodeId) -> Option<&dyn AudioNode> {
        self.nodes.get(&id).map(|n| n.as_ref())
    }

    /// Typed access to a node
    pub fn node<T: AudioNode + 'static>(&self, id: NodeId) -> GraphResult<&T> {
        self.nodes
            .get(&id)
            .ok_or(GraphError::NodeNotFound(id))?
            .as_any()
            .downcast_ref::<T>()
            .ok_or(GraphError::NodeTypeMismatch(id))
    }

    /// Typed mutable access to a node
    pub fn node_mut<T: AudioNode + 'static>(&mut self, id: NodeId) -> GraphResult<&mut T> {
        self.nodes
            .get_mut(&id)
            .ok_or(GraphError::NodeNotFound(id))?
            .as_any_mut()
            .downcast_mut::<T>()
            .ok_or(GraphError::NodeTypeMismatch(id))
    }

    pub fn set_gain(&mut self, id: NodeId, gain: f64) -> GraphResult<()> {
        self.node_mut::<GainNode>(id)?.set_gain(gain);
        Ok(())
    }

    pub fn gain(&self, id: NodeId) -> GraphResult<f64> {
        Ok(self.node::<GainNode>(id)?.gain())
    }

    /// Nodes processed by the last call to [`process`](Self::process)
    pub fn processing_order(&self) -> &[NodeId] {
        &self.processing_order
    }

    /// Recalculate processing order.
    ///
    /// Walks upstream from the destination and every analyzer; nodes that
    /// cannot reach one of them are left out entirely.
    fn update_processing_order(&mut self) {
        if !self.dirty {
            return;
        }

        let mut roots: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(_, n)| matches!(n.node_type(), NodeType::Destination | NodeType::Analyzer))
            .map(|(&id, _)| id)
            .collect();
        roots.sort();

        let mut order = Vec::new();
        let mut visited = HashSet::new();
        let mut in_progress = HashSet::new();

        for id in roots {
            self.visit(id, &mut visited, &mut in_progress, &mut order);
        }

        log::trace!(
            "Processing order rebuilt: {} of {} nodes reachable",
            order.len(),
            self.nodes.len()
        );
        self.processing_order = order;
        self.dirty = false;
    }

    fn visit(
        &self,
        id: NodeId,
        visited: &mut HashSet<NodeId>,
        in_progress: &mut HashSet<NodeId>,
        order: &mut Vec<NodeId>,
    ) {
        if visited.contains(&id) || in_progress.contains(&id) {
            // Already placed, or a cycle back edge
            return;
        }

        in_progress.insert(id);

        for conn in &self.connections {
            if conn.to_node == id {
                self.visit(conn.from_node, visited, in_progress, order);
            }
        }

        in_progress.remove(&id);
        visited.insert(id);
        order.push(id);
    }

    /// Process the audio graph for one block
    pub fn process(&mut self) {
        self.update_processing_order();

        // Clear all node output buffers
        for buffers in self.buffers.values_mut() {
            for buffer in buffers.iter_mut() {
                buffer.fill(0.0);
            }
        }

        for idx in 0..self.processing_order.len() {
            let node_id = self.processing_order[idx];

            let (num_inputs, num_outputs) = match self.nodes.get(&node_id) {
                Some(n) => (n.num_inputs(), n.num_outputs()),
                None => continue,
            };

            // Only allocates the first time a wider node shows up
            let block_size = self.block_size;
            if self.input_buffers.len() < num_inputs {
                self.input_buffers.resize_with(num_inputs, || vec![0.0; block_size]);
            }
            if self.output_buffers.len() < num_outputs {
                self.output_buffers.resize_with(num_outputs, || vec![0.0; block_size]);
            }

            for buf in &mut self.input_buffers[..num_inputs] {
                buf.fill(0.0);
            }

            // Gather inputs, summing every connection into the same channel
            for conn in &self.connections {
                if conn.to_node == node_id && conn.to_channel < num_inputs {
                    if let Some(from_buffers) = self.buffers.get(&conn.from_node) {
                        if let Some(from_buf) = from_buffers.get(conn.from_channel) {
                            let input_buf = &mut self.input_buffers[conn.to_channel];
                            for (dst, src) in input_buf.iter_mut().zip(from_buf) {
                                *dst += *src;
                            }
                        }
                    }
                }
            }

            for buf in &mut self.output_buffers[..num_outputs] {
                buf.fill(0.0);
            }

            let input_refs: Vec<&[Sample]> = self.input_buffers[..num_inputs]
                .iter()
                .map(|v| v.as_slice())
                .collect();
            let mut output_refs: Vec<&mut [Sample]> = self.output_buffers[..num_outputs]
                .iter_mut()
                .map(|v| v.as_mut_slice())
                .collect();

            if let Some(node) = self.nodes.get_mut(&node_id) {
                node.process(&input_refs, &mut output_refs);
            }

            if let Some(node_buffers) = self.buffers.get_mut(&node_id) {
                for (dst, src) in node_buffers.iter_mut().zip(&self.output_buffers[..num_outputs]) {
                    dst.copy_from_slice(src);
                }
            }
        }
    }

    /// Output of a node's channel from the last processed block
    pub fn output(&self, node_id: NodeId, channel: usize) -> Option<&[Sample]> {
        self.buffers
            .get(&node_id)
            .and_then(|buffers| buffers.get(channel))
            .map(|v| v.as_slice())
    }

    /// Reset all nodes
    pub fn reset(&mut self) {
        for node in self.nodes.values_mut() {
            node.reset();
        }
    }
}
