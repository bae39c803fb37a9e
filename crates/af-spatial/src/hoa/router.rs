//! Channel router - native channel order to ACN

use af_graph::{AudioGraph, NodeId, PassthroughNode};

use super::format::ChannelMap;
use crate::error::SpatialResult;

/// Splitter/merger pair wired as a permutation: input channel `i` lands on
/// output channel `map[i]`.
pub struct ChannelRouter {
    splitter: NodeId,
    merger: NodeId,
    map: ChannelMap,
}

impl ChannelRouter {
    pub fn new(graph: &mut AudioGraph, map: ChannelMap) -> SpatialResult<Self> {
        let channels = map.len();
        let splitter = graph.add_node(Box::new(PassthroughNode::new(channels)));
        let merger = graph.add_node(Box::new(PassthroughNode::new(channels)));

        let router = Self {
            splitter,
            merger,
            map,
        };
        router.wire(graph)?;

        Ok(router)
    }

    pub fn input(&self) -> NodeId {
        self.splitter
    }

    pub fn output(&self) -> NodeId {
        self.merger
    }

    pub fn channel_map(&self) -> &ChannelMap {
        &self.map
    }

    /// Install a new map. A malformed map is logged and ignored, leaving
    /// the current routing intact; returns whether the map was applied.
    pub fn set_channel_map(
        &mut self,
        graph: &mut AudioGraph,
        map: &[usize],
    ) -> SpatialResult<bool> {
        let map = match ChannelMap::new(map.to_vec(), self.map.len()) {
            Ok(map) => map,
            Err(e) => {
                log::warn!("Ignoring channel map {:?}: {}", map, e);
                return Ok(false);
            }
        };

        graph.disconnect(self.splitter, self.merger);
        self.map = map;
        self.wire(graph)?;

        log::debug!("Channel map set to {:?}", self.map.as_slice());
        Ok(true)
    }

    fn wire(&self, graph: &mut AudioGraph) -> SpatialResult<()> {
        for (input, &output) in self.map.as_slice().iter().enumerate() {
            graph.connect(self.splitter, input, self.merger, output)?;
        }
        Ok(())
    }
}
