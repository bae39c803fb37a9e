//! Ambisonic renderer
//!
//! Owns the input and output nodes hosts connect to and, once HRIRs are
//! loaded, the processing chain between them:
//!
//! ```text
//! input ─► router ─► rotator ─► symmetric convolver ─► output
//!   └──────────────── bypass (W, Y) ──────────────────────┘
//! ```
//!
//! Until [`AmbisonicRenderer::initialize`] completes only the bypass path
//! exists, and every setter is a logged no-op.

use std::fmt;
use std::str::FromStr;

use af_graph::{AudioGraph, GainNode, NodeId};
use nalgebra::Matrix4;

use crate::binaural::{HrirSet, SymmetricConvolver};
use crate::config::{RendererConfig, RendererOptions};
use crate::error::{SpatialError, SpatialResult};
use crate::hoa::{
    AmbisonicOrder, ChannelMap, ChannelRouter, FoaRotator, HoaRotator, RotationMatrix3,
    RotationMatrix4, SoundFieldRotator,
};
use crate::resources::{BufferList, ResourceLoader};

/// What reaches the renderer output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderingMode {
    /// Rotated, binaurally decoded sound field
    #[default]
    Ambisonic,
    /// First two input channels, unprocessed
    Bypass,
    /// Silence; the decoding chain is not processed
    Off,
}

impl RenderingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ambisonic => "ambisonic",
            Self::Bypass => "bypass",
            Self::Off => "off",
        }
    }
}

impl FromStr for RenderingMode {
    type Err = SpatialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ambisonic" => Ok(Self::Ambisonic),
            "bypass" => Ok(Self::Bypass),
            "off" => Ok(Self::Off),
            other => Err(SpatialError::InvalidRenderingMode(other.to_string())),
        }
    }
}

impl fmt::Display for RenderingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RendererState {
    Uninitialized,
    Loading,
    Ready,
}

struct Pipeline<R> {
    router: ChannelRouter,
    rotator: R,
    convolver: SymmetricConvolver,
}

/// Ambisonic to binaural renderer, generic over the rotation network
pub struct AmbisonicRenderer<R: SoundFieldRotator> {
    config: RendererConfig,
    state: RendererState,
    rendering_mode: RenderingMode,
    input: NodeId,
    output: NodeId,
    bypass: NodeId,
    pipeline: Option<Pipeline<R>>,
}

/// First-order renderer (4 channels)
pub type FoaRenderer = AmbisonicRenderer<FoaRotator>;

/// Higher-order renderer (4, 9 or 16 channels)
pub type HoaRenderer = AmbisonicRenderer<HoaRotator>;

impl<R: SoundFieldRotator> AmbisonicRenderer<R> {
    /// Create the renderer from host options. Unusable options fall back to
    /// defaults; see [`RendererConfig::resolve`].
    pub fn new(graph: &mut AudioGraph, options: RendererOptions) -> SpatialResult<Self> {
        Self::with_config(graph, RendererConfig::resolve::<R>(&options))
    }

    pub fn with_config(graph: &mut AudioGraph, config: RendererConfig) -> SpatialResult<Self> {
        if !R::supports_order(config.order) {
            return Err(SpatialError::InvalidAmbisonicOrder(config.order.as_usize()));
        }
        let channels = config.order.channel_count();
        if config.channel_map.len() != channels {
            return Err(SpatialError::InvalidChannelMap(format!(
                "{} entries for {} channels",
                config.channel_map.len(),
                channels
            )));
        }

        let input = graph.add_node(Box::new(GainNode::new(channels)));
        let output = graph.add_node(Box::new(GainNode::new(2)));
        let bypass = graph.add_node(Box::new(GainNode::new(2)));
        graph.connect(input, 0, bypass, 0)?;
        graph.connect(input, 1, bypass, 1)?;

        log::info!(
            "Ambiforge {} renderer created: order {}, {} channels, {} mode",
            crate::VERSION,
            config.order.as_usize(),
            channels,
            config.rendering_mode
        );

        Ok(Self {
            rendering_mode: config.rendering_mode,
            config,
            state: RendererState::Uninitialized,
            input,
            output,
            bypass,
            pipeline: None,
        })
    }

    /// Load the HRIRs and build the decoding chain.
    ///
    /// Calling this on a ready renderer does nothing. On failure the
    /// renderer goes back to [`RendererState::Uninitialized`], leaves no
    /// nodes behind in `graph`, and can be initialized again. A renderer
    /// left in [`RendererState::Loading`] by a dropped call starts over.
    pub async fn initialize<L: ResourceLoader>(
        &mut self,
        graph: &mut AudioGraph,
        loader: &L,
    ) -> SpatialResult<()> {
        match self.state {
            RendererState::Ready => {
                log::debug!("Renderer already initialized");
                return Ok(());
            }
            RendererState::Loading => {
                log::warn!("Previous initialization was abandoned; starting over");
            }
            RendererState::Uninitialized => {}
        }

        self.state = RendererState::Loading;
        log::info!("Loading {} HRIR resources", self.config.hrir_requests.len());

        let hrirs = match self.load_hrirs(graph, loader).await {
            Ok(hrirs) => hrirs,
            Err(e) => {
                log::error!("Renderer initialization failed: {}", e);
                self.state = RendererState::Uninitialized;
                return Err(e);
            }
        };

        let first_node = graph.next_node_id();
        if let Err(e) = self.build_pipeline(graph, hrirs) {
            log::error!("Renderer initialization failed: {}", e);
            self.pipeline = None;
            graph.remove_nodes_since(first_node);
            self.state = RendererState::Uninitialized;
            return Err(e);
        }

        self.state = RendererState::Ready;
        log::info!("Renderer ready ({} mode)", self.rendering_mode);
        Ok(())
    }

    async fn load_hrirs<L: ResourceLoader>(
        &self,
        graph: &AudioGraph,
        loader: &L,
    ) -> SpatialResult<HrirSet> {
        let buffers = BufferList::request(loader, self.config.hrir_requests.clone())?.await?;
        let hrirs = HrirSet::from_buffers(self.config.order, buffers.buffers())?;

        if f64::from(hrirs.sample_rate()) != graph.sample_rate() {
            log::warn!(
                "HRIRs recorded at {} Hz, graph runs at {} Hz",
                hrirs.sample_rate(),
                graph.sample_rate()
            );
        }
        Ok(hrirs)
    }

    fn build_pipeline(&mut self, graph: &mut AudioGraph, hrirs: HrirSet) -> SpatialResult<()> {
        let order = self.config.order;
        let router = ChannelRouter::new(graph, self.config.channel_map.clone())?;
        let rotator = R::build(graph, order)?;
        let convolver = SymmetricConvolver::new(graph, order, Some(hrirs))?;

        graph.connect_channels(self.input, router.input())?;
        graph.connect_channels(router.output(), rotator.input())?;
        graph.connect_channels(rotator.output(), convolver.input())?;
        graph.connect_channels(convolver.output(), self.output)?;

        self.pipeline = Some(Pipeline {
            router,
            rotator,
            convolver,
        });
        self.apply_rendering_mode(graph, self.rendering_mode)
    }

    fn apply_rendering_mode(
        &mut self,
        graph: &mut AudioGraph,
        mode: RenderingMode,
    ) -> SpatialResult<()> {
        let Some(pipeline) = self.pipeline.as_mut() else {
            return Ok(());
        };

        match mode {
            RenderingMode::Ambisonic => {
                pipeline.convolver.enable(graph)?;
                graph.disconnect(self.bypass, self.output);
            }
            RenderingMode::Bypass => {
                pipeline.convolver.disable(graph);
                graph.connect_channels(self.bypass, self.output)?;
            }
            RenderingMode::Off => {
                pipeline.convolver.disable(graph);
                graph.disconnect(self.bypass, self.output);
            }
        }

        self.rendering_mode = mode;
        log::debug!("Rendering mode set to {}", mode);
        Ok(())
    }

    fn ready_pipeline(&mut self, operation: &str) -> Option<&mut Pipeline<R>> {
        if self.state != RendererState::Ready {
            log::debug!("{} ignored: renderer not ready", operation);
            return None;
        }
        self.pipeline.as_mut()
    }

    pub fn set_rendering_mode(
        &mut self,
        graph: &mut AudioGraph,
        mode: RenderingMode,
    ) -> SpatialResult<()> {
        if self.ready_pipeline("set_rendering_mode").is_none() || mode == self.rendering_mode {
            return Ok(());
        }
        self.apply_rendering_mode(graph, mode)
    }

    /// Switch mode by name; unknown names are logged and ignored
    pub fn set_rendering_mode_named(
        &mut self,
        graph: &mut AudioGraph,
        name: &str,
    ) -> SpatialResult<()> {
        match name.parse() {
            Ok(mode) => self.set_rendering_mode(graph, mode),
            Err(e) => {
                log::warn!("{}", e);
                Ok(())
            }
        }
    }

    /// Rewire the input channel order. Returns whether the map was applied;
    /// a malformed map keeps the current routing.
    pub fn set_channel_map(
        &mut self,
        graph: &mut AudioGraph,
        map: &[usize],
    ) -> SpatialResult<bool> {
        match self.ready_pipeline("set_channel_map") {
            Some(pipeline) => pipeline.router.set_channel_map(graph, map),
            None => Ok(false),
        }
    }

    /// Column-major 3x3 world rotation
    pub fn set_rotation_matrix3(
        &mut self,
        graph: &mut AudioGraph,
        matrix: &RotationMatrix3,
    ) -> SpatialResult<()> {
        match self.ready_pipeline("set_rotation_matrix3") {
            Some(pipeline) => pipeline.rotator.set_rotation_matrix3(graph, matrix),
            None => Ok(()),
        }
    }

    /// Column-major 4x4 world transform; translation is ignored
    pub fn set_rotation_matrix4(
        &mut self,
        graph: &mut AudioGraph,
        matrix: &RotationMatrix4,
    ) -> SpatialResult<()> {
        match self.ready_pipeline("set_rotation_matrix4") {
            Some(pipeline) => pipeline.rotator.set_rotation_matrix4(graph, matrix),
            None => Ok(()),
        }
    }

    /// Rotate by the inverse of a camera view matrix, so the sound field
    /// stays fixed in the world as the camera turns
    pub fn set_rotation_matrix_from_view_transform(
        &mut self,
        graph: &mut AudioGraph,
        view: &RotationMatrix4,
    ) -> SpatialResult<()> {
        match Matrix4::from_column_slice(view).try_inverse() {
            Some(inverse) => {
                let mut matrix = [0.0; 16];
                matrix.copy_from_slice(inverse.as_slice());
                self.set_rotation_matrix4(graph, &matrix)
            }
            None => {
                log::warn!("Ignoring singular view transform");
                Ok(())
            }
        }
    }

    pub fn state(&self) -> RendererState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == RendererState::Ready
    }

    pub fn rendering_mode(&self) -> RenderingMode {
        self.rendering_mode
    }

    pub fn order(&self) -> AmbisonicOrder {
        self.config.order
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn channel_map(&self) -> Option<&ChannelMap> {
        self.pipeline.as_ref().map(|p| p.router.channel_map())
    }

    pub fn rotation_matrix3(&self) -> Option<RotationMatrix3> {
        self.pipeline.as_ref().map(|p| p.rotator.rotation_matrix3())
    }

    pub fn rotation_matrix4(&self) -> Option<RotationMatrix4> {
        self.pipeline.as_ref().map(|p| p.rotator.rotation_matrix4())
    }

    /// K-channel input node
    pub fn input(&self) -> NodeId {
        self.input
    }

    /// Stereo output node
    pub fn output(&self) -> NodeId {
        self.output
    }
}
