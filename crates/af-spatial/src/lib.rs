//! Ambiforge ambisonic renderer
//!
//! Decodes first-order (4 channel) and higher-order (9 or 16 channel)
//! ambisonic streams into binaural stereo, rotating the sound field to
//! follow the listener's head.
//!
//! ## Signal path
//! - Channel router: native channel order to ACN
//! - Rotator: spherical-harmonic rotation, one gain per matrix entry
//! - Symmetric convolver: ⌈K/2⌉ stereo HRIR convolutions summed into
//!   left/right using the mirror symmetry of negative-index harmonics
//!
//! ## Usage
//!
//! ```rust,ignore
//! use af_graph::{AudioGraph, NodeId};
//! use af_spatial::{HoaRenderer, RendererOptions, WavLoader};
//!
//! let mut graph = AudioGraph::new(512, 48000.0)?;
//! let mut renderer = HoaRenderer::new(&mut graph, RendererOptions::default())?;
//! renderer.initialize(&mut graph, &WavLoader::new("assets")).await?;
//! graph.connect_channels(renderer.output(), NodeId::DESTINATION)?;
//!
//! renderer.set_rotation_matrix3(&mut graph, &head_rotation)?;
//! graph.process();
//! ```

pub mod binaural;
pub mod config;
pub mod hoa;
pub mod renderer;
pub mod resources;

mod error;

pub use binaural::{HrirSet, SymmetricConvolver};
pub use config::{RendererConfig, RendererOptions};
pub use error::{SpatialError, SpatialResult};
pub use hoa::{
    AmbisonicOrder, ChannelMap, ChannelMapPreset, ChannelRouter, FoaRotator, HoaRotator,
    RotationMatrix3, RotationMatrix4, SoundFieldRotator, SphericalHarmonicRotation,
};
pub use renderer::{AmbisonicRenderer, FoaRenderer, HoaRenderer, RendererState, RenderingMode};
pub use resources::{BufferList, ResourceLoader, ResourceRequest, ResourceSource, WavLoader};

/// Library version, reported in the renderer's startup log
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
