//! af-core: Shared types for Ambiforge
//!
//! This crate provides the sample type, the planar multichannel audio
//! buffer exchanged between the asset loader and the renderer, and the
//! core error type.

mod error;
mod sample;

pub use error::*;
pub use sample::*;
