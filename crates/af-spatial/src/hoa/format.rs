//! Channel ordering - native/FuMa to ACN permutations

use serde::{Deserialize, Serialize};

use super::AmbisonicOrder;
use crate::error::{SpatialError, SpatialResult};

/// FuMa channel `i` carries ACN channel `FUMA_TO_ACN[i]`.
/// FuMa order: W X Y Z R S T U V K L M N O P Q
const FUMA_TO_ACN: [usize; 16] = [0, 3, 1, 2, 6, 7, 5, 8, 4, 12, 13, 11, 14, 10, 15, 9];

/// Named channel orderings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelMapPreset {
    /// ACN (Ambisonic Channel Number) - AmbiX standard
    Acn,
    /// FuMa ordering - legacy. Only reorders; FuMa gains are not undone.
    #[serde(rename = "fuma")]
    FuMa,
}

/// Validated channel permutation: input channel `i` is routed to ACN
/// channel `map[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMap(Vec<usize>);

impl ChannelMap {
    pub fn identity(channels: usize) -> Self {
        Self((0..channels).collect())
    }

    /// Validate `map` as a permutation of `0..channels`
    pub fn new(map: Vec<usize>, channels: usize) -> SpatialResult<Self> {
        if map.len() != channels {
            return Err(SpatialError::InvalidChannelMap(format!(
                "expected {} entries, got {}",
                channels,
                map.len()
            )));
        }

        let mut seen = vec![false; channels];
        for &target in &map {
            match seen.get_mut(target) {
                Some(slot) if !*slot => *slot = true,
                Some(_) => {
                    return Err(SpatialError::InvalidChannelMap(format!(
                        "channel {} appears more than once",
                        target
                    )));
                }
                None => {
                    return Err(SpatialError::InvalidChannelMap(format!(
                        "channel {} out of range 0..{}",
                        target, channels
                    )));
                }
            }
        }

        Ok(Self(map))
    }

    pub fn from_preset(preset: ChannelMapPreset, order: AmbisonicOrder) -> Self {
        let channels = order.channel_count();
        match preset {
            ChannelMapPreset::Acn => Self::identity(channels),
            ChannelMapPreset::FuMa => Self(FUMA_TO_ACN[..channels].to_vec()),
        }
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_identity(&self) -> bool {
        self.0.iter().enumerate().all(|(i, &t)| i == t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let map = ChannelMap::identity(4);
        assert_eq!(map.as_slice(), &[0, 1, 2, 3]);
        assert!(map.is_identity());
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(ChannelMap::new(vec![0, 1, 2], 4).is_err());
        assert!(ChannelMap::new(vec![0, 1, 2, 2], 4).is_err());
        assert!(ChannelMap::new(vec![0, 1, 2, 4], 4).is_err());
        assert!(ChannelMap::new(vec![3, 2, 1, 0], 4).is_ok());
    }

    #[test]
    fn test_fuma_presets_are_permutations() {
        for order in [AmbisonicOrder::First, AmbisonicOrder::Second, AmbisonicOrder::Third] {
            let map = ChannelMap::from_preset(ChannelMapPreset::FuMa, order);
            assert!(ChannelMap::new(map.as_slice().to_vec(), order.channel_count()).is_ok());
        }
    }

    #[test]
    fn test_fuma_first_order() {
        // W X Y Z -> W Y Z X
        let map = ChannelMap::from_preset(ChannelMapPreset::FuMa, AmbisonicOrder::First);
        assert_eq!(map.as_slice(), &[0, 3, 1, 2]);
    }

    #[test]
    fn test_preset_serde_names() {
        let preset: ChannelMapPreset = serde_json::from_str("\"fuma\"").unwrap();
        assert_eq!(preset, ChannelMapPreset::FuMa);
        assert_eq!(serde_json::to_string(&ChannelMapPreset::Acn).unwrap(), "\"acn\"");
    }
}
