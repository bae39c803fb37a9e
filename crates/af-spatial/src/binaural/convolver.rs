//! Symmetric binaural convolution
//!
//! ACN channel `k` is convolved as the `k % 2` side of stereo pair `k / 2`,
//! so ⌈K/2⌉ stereo convolutions cover K channels. Each convolved channel
//! goes to the positive bus (index `m >= 0`) or the negative bus
//! (`m < 0`). Negative-index harmonics are antisymmetric under left/right
//! mirroring, so:
//!
//! ```text
//! left  = positive + negative
//! right = positive - negative
//! ```

use af_graph::{AudioGraph, ConvolverNode, GainNode, NodeId, PassthroughNode};

use super::hrir::HrirSet;
use crate::error::{SpatialError, SpatialResult};
use crate::hoa::{AmbisonicOrder, acn_to_degree_index};

pub struct SymmetricConvolver {
    order: AmbisonicOrder,
    splitter: NodeId,
    /// One stereo (mono for an odd tail) convolver per pair, empty until
    /// HRIRs are bound
    convolvers: Vec<NodeId>,
    positive_bus: NodeId,
    negative_bus: NodeId,
    binaural_merger: NodeId,
    output: NodeId,
    enabled: bool,
}

impl SymmetricConvolver {
    /// Build the convolution network. Starts enabled.
    pub fn new(
        graph: &mut AudioGraph,
        order: AmbisonicOrder,
        hrirs: Option<HrirSet>,
    ) -> SpatialResult<Self> {
        let splitter = graph.add_node(Box::new(PassthroughNode::new(order.channel_count())));
        let positive_bus = graph.add_node(Box::new(PassthroughNode::new(1)));
        let negative_bus = graph.add_node(Box::new(PassthroughNode::new(1)));
        let inverter = graph.add_node(Box::new(GainNode::with_gain(1, -1.0)));
        let binaural_merger = graph.add_node(Box::new(PassthroughNode::new(2)));
        let output = graph.add_node(Box::new(GainNode::new(2)));

        graph.connect(positive_bus, 0, binaural_merger, 0)?;
        graph.connect(positive_bus, 0, binaural_merger, 1)?;
        graph.connect(negative_bus, 0, binaural_merger, 0)?;
        graph.connect(negative_bus, 0, inverter, 0)?;
        graph.connect(inverter, 0, binaural_merger, 1)?;

        let mut convolver = Self {
            order,
            splitter,
            convolvers: Vec::new(),
            positive_bus,
            negative_bus,
            binaural_merger,
            output,
            enabled: false,
        };

        if let Some(set) = hrirs {
            convolver.set_hrir_set(graph, set)?;
        }
        convolver.enable(graph)?;

        Ok(convolver)
    }

    /// Bind the HRIRs. Only the first successful call has any effect.
    pub fn set_hrir_set(&mut self, graph: &mut AudioGraph, set: HrirSet) -> SpatialResult<()> {
        if self.has_hrirs() {
            log::debug!("HRIRs already bound; ignoring new set");
            return Ok(());
        }

        if set.order() != self.order {
            return Err(SpatialError::InvalidChannelCount {
                expected: self.order.channel_count(),
                got: set.channel_count(),
            });
        }

        let block_size = graph.block_size();
        let mut convolvers = Vec::with_capacity(self.order.stereo_pair_count());
        for pair in 0..self.order.stereo_pair_count() {
            let ir = set.stereo_pair(pair)?;
            let node = graph.add_node(Box::new(ConvolverNode::new(&ir, block_size)?));

            for side in 0..ir.number_of_channels() {
                let acn = 2 * pair + side;
                let (_, index) = acn_to_degree_index(acn);
                let bus = if index < 0 {
                    self.negative_bus
                } else {
                    self.positive_bus
                };
                graph.connect(self.splitter, acn, node, side)?;
                graph.connect(node, side, bus, 0)?;
            }
            convolvers.push(node);
        }
        self.convolvers = convolvers;

        log::debug!(
            "Bound {} HRIRs ({} samples) to {} stereo convolvers",
            set.channel_count(),
            set.length(),
            self.convolvers.len()
        );
        Ok(())
    }

    pub fn has_hrirs(&self) -> bool {
        !self.convolvers.is_empty()
    }

    /// Route the binaural sum to the output
    pub fn enable(&mut self, graph: &mut AudioGraph) -> SpatialResult<()> {
        graph.connect_channels(self.binaural_merger, self.output)?;
        self.enabled = true;
        Ok(())
    }

    /// Cut the binaural sum from the output; the convolvers stop being
    /// processed
    pub fn disable(&mut self, graph: &mut AudioGraph) {
        graph.disconnect(self.binaural_merger, self.output);
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn order(&self) -> AmbisonicOrder {
        self.order
    }

    pub fn input(&self) -> NodeId {
        self.splitter
    }

    pub fn output(&self) -> NodeId {
        self.output
    }

    pub fn convolver_nodes(&self) -> &[NodeId] {
        &self.convolvers
    }
}
