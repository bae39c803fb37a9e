//! Ambisonic sound-field processing
//!
//! - Orders 1-3 (4, 9 and 16 channels), ACN channel ordering
//! - Channel maps from native/FuMa order to ACN
//! - Recursive spherical-harmonic rotation and its gain-network rotators

mod format;
#[cfg(test)]
pub(crate) mod harmonics;
mod rotation;
mod rotator;
mod router;

pub use format::{ChannelMap, ChannelMapPreset};
pub use rotation::{
    BandRotation, IDENTITY_MATRIX3, RotationMatrix3, RotationMatrix4, SphericalHarmonicRotation,
};
pub use rotator::{FoaRotator, HoaRotator, SoundFieldRotator};
pub use router::ChannelRouter;

use crate::error::{SpatialError, SpatialResult};

/// Ambisonic order (determines spatial resolution)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AmbisonicOrder {
    /// First order (4 channels) - basic 3D
    First = 1,
    /// Second order (9 channels)
    Second = 2,
    /// Third order (16 channels)
    Third = 3,
}

impl AmbisonicOrder {
    /// Get channel count for this order
    pub fn channel_count(&self) -> usize {
        let n = *self as usize;
        (n + 1) * (n + 1)
    }

    /// Stereo pairs needed to carry every channel, ⌈K/2⌉
    pub fn stereo_pair_count(&self) -> usize {
        self.channel_count().div_ceil(2)
    }

    /// Create from order number
    pub fn from_order(order: usize) -> SpatialResult<Self> {
        match order {
            1 => Ok(AmbisonicOrder::First),
            2 => Ok(AmbisonicOrder::Second),
            3 => Ok(AmbisonicOrder::Third),
            _ => Err(SpatialError::InvalidAmbisonicOrder(order)),
        }
    }

    /// Get order number
    pub fn as_usize(&self) -> usize {
        *self as usize
    }

    /// Short name used for bundled asset file names
    pub fn label(&self) -> &'static str {
        match self {
            AmbisonicOrder::First => "foa",
            AmbisonicOrder::Second => "soa",
            AmbisonicOrder::Third => "toa",
        }
    }
}

/// ACN channel index from (degree, index)
pub fn acn_index(degree: i32, index: i32) -> usize {
    (degree * degree + degree + index) as usize
}

/// Get (degree, index) from ACN index
pub fn acn_to_degree_index(acn: usize) -> (i32, i32) {
    let degree = (acn as f64).sqrt().floor() as i32;
    let index = acn as i32 - degree * degree - degree;
    (degree, index)
}
