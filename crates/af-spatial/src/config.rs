//! Renderer configuration
//!
//! [`RendererOptions`] is the loosely typed, all-optional form hosts hand
//! in (usually as JSON). It is validated once into a [`RendererConfig`];
//! anything unusable falls back to a default with a logged warning instead
//! of failing construction.

use serde::{Deserialize, Serialize};

use crate::error::SpatialResult;
use crate::hoa::{AmbisonicOrder, ChannelMap, ChannelMapPreset, SoundFieldRotator};
use crate::renderer::RenderingMode;
use crate::resources::ResourceRequest;

/// Host-facing renderer options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererOptions {
    /// 1, 2 or 3
    pub ambisonic_order: Option<usize>,
    /// Input channel `i` goes to ACN channel `channel_map[i]`
    pub channel_map: Option<Vec<usize>>,
    /// Used when `channel_map` is absent or malformed
    pub channel_map_preset: Option<ChannelMapPreset>,
    /// "ambisonic", "bypass" or "off"
    pub rendering_mode: Option<String>,
    /// Either ⌈K/2⌉ stereo files or one K-channel file
    pub hrir_asset_locators: Option<Vec<String>>,
}

impl RendererOptions {
    pub fn from_json(json: &str) -> SpatialResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Validated renderer configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RendererConfig {
    pub order: AmbisonicOrder,
    pub channel_map: ChannelMap,
    pub rendering_mode: RenderingMode,
    pub hrir_requests: Vec<ResourceRequest>,
}

impl RendererConfig {
    /// Defaults for an order: ACN map, ambisonic mode, bundled HRIRs
    pub fn for_order(order: AmbisonicOrder) -> Self {
        Self {
            order,
            channel_map: ChannelMap::identity(order.channel_count()),
            rendering_mode: RenderingMode::Ambisonic,
            hrir_requests: default_hrir_locators(order)
                .into_iter()
                .map(ResourceRequest::locator)
                .collect(),
        }
    }

    /// Validate options for a renderer built on rotator `R`
    pub fn resolve<R: SoundFieldRotator>(options: &RendererOptions) -> Self {
        let order = resolve_order::<R>(options.ambisonic_order);
        let mut config = Self::for_order(order);

        let preset_map = options
            .channel_map_preset
            .map(|preset| ChannelMap::from_preset(preset, order));
        if let Some(map) = preset_map.clone() {
            config.channel_map = map;
        }

        if let Some(map) = &options.channel_map {
            match ChannelMap::new(map.clone(), order.channel_count()) {
                Ok(map) => config.channel_map = map,
                Err(e) => log::warn!(
                    "Ignoring channel map {:?}: {}; using {}",
                    map,
                    e,
                    if preset_map.is_some() { "preset" } else { "ACN order" }
                ),
            }
        }

        if let Some(name) = &options.rendering_mode {
            match name.parse() {
                Ok(mode) => config.rendering_mode = mode,
                Err(e) => log::warn!("{}; using {}", e, RenderingMode::Ambisonic),
            }
        }

        if let Some(locators) = &options.hrir_asset_locators {
            let pairs = order.stereo_pair_count();
            if locators.len() == pairs || locators.len() == 1 {
                config.hrir_requests = locators
                    .iter()
                    .cloned()
                    .map(ResourceRequest::locator)
                    .collect();
            } else {
                log::warn!(
                    "Expected {} HRIR locators (or 1) for order {}, got {}; using defaults",
                    pairs,
                    order.as_usize(),
                    locators.len()
                );
            }
        }

        config
    }
}

fn resolve_order<R: SoundFieldRotator>(requested: Option<usize>) -> AmbisonicOrder {
    let Some(n) = requested else {
        return R::DEFAULT_ORDER;
    };

    match AmbisonicOrder::from_order(n) {
        Ok(order) if R::supports_order(order) => order,
        _ => {
            log::warn!(
                "Unsupported ambisonic order {}; using {}",
                n,
                R::DEFAULT_ORDER.as_usize()
            );
            R::DEFAULT_ORDER
        }
    }
}

/// Bundled HRIR files: `hrir/{foa,soa,toa}-{1..=⌈K/2⌉}.wav`
pub fn default_hrir_locators(order: AmbisonicOrder) -> Vec<String> {
    (1..=order.stereo_pair_count())
        .map(|i| format!("hrir/{}-{}.wav", order.label(), i))
        .collect()
}
