// SPDX-License-Identifier: GPL-3.0-only

//! Live-tunable parallax parameters
//!
//! Settings are owned by the settings layer and mutated at runtime. Applying
//! a change reports whether it only needs a uniform write or a structural
//! rebuild (layer count), so renderers never recreate GPU objects for a slider.

use crate::constants::{self, clamp_range};
use serde::{Deserialize, Serialize};

/// Rendering strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParallaxMode {
    /// One plane, continuous per-pixel displacement
    #[default]
    Single,
    /// A few depth bands, each on its own plane (MPI-lite)
    Layered,
}

impl ParallaxMode {
    pub const ALL: [ParallaxMode; 2] = [ParallaxMode::Single, ParallaxMode::Layered];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Layered => "layered",
        }
    }
}

impl std::str::FromStr for ParallaxMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" | "single-plane" => Ok(Self::Single),
            "layered" | "mpi" => Ok(Self::Layered),
            _ => Err(format!("Unknown parallax mode: {s}")),
        }
    }
}

/// Parallax parameters, always kept within their documented ranges
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallaxSettings {
    /// Overall displacement gain
    pub strength: f32,
    /// Multiplier on the depth difference
    pub depth_scale: f32,
    /// Depth that stays fixed while the viewer moves, 0..=1
    pub focus_distance: f32,
    /// Width of the soft fade at texture borders, 0..=0.2
    pub edge_fade: f32,
    /// Depth blur amount, 0..=0.5 (radius = value * 5 texels)
    pub depth_smoothing: f32,
    pub mode: ParallaxMode,
    /// Number of depth bands in layered mode, 2..=4
    pub num_layers: u32,
    /// Half-width of the soft transition between bands, in depth units
    pub feather_width: f32,
    /// World distance between adjacent layer planes (cm)
    pub layer_spacing: f32,
}

impl Default for ParallaxSettings {
    fn default() -> Self {
        Self {
            strength: constants::DEFAULT_STRENGTH,
            depth_scale: constants::DEFAULT_DEPTH_SCALE,
            focus_distance: constants::DEFAULT_FOCUS_DISTANCE,
            edge_fade: constants::DEFAULT_EDGE_FADE,
            depth_smoothing: constants::DEFAULT_DEPTH_SMOOTHING,
            mode: ParallaxMode::default(),
            num_layers: constants::DEFAULT_NUM_LAYERS,
            feather_width: constants::DEFAULT_FEATHER_WIDTH,
            layer_spacing: constants::DEFAULT_LAYER_SPACING_CM,
        }
    }
}

/// Partial update; `None` leaves a field unchanged
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallaxSettingsPatch {
    pub strength: Option<f32>,
    pub depth_scale: Option<f32>,
    pub focus_distance: Option<f32>,
    pub edge_fade: Option<f32>,
    pub depth_smoothing: Option<f32>,
    pub mode: Option<ParallaxMode>,
    pub num_layers: Option<u32>,
    pub feather_width: Option<f32>,
    pub layer_spacing: Option<f32>,
}

/// What a settings change requires from a renderer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsChange {
    /// Uniform values changed
    pub uniforms: bool,
    /// Layer positions changed (spacing or count)
    pub layout: bool,
    /// Number of layer planes changed
    pub layer_count: bool,
    /// Strategy changed; the owner has to swap renderers
    pub mode: bool,
}

impl SettingsChange {
    pub fn is_empty(&self) -> bool {
        !(self.uniforms || self.layout || self.layer_count || self.mode)
    }
}

impl ParallaxSettings {
    /// Copy with every field clamped into its documented range
    pub fn sanitized(&self) -> Self {
        let mut out = *self;
        out.strength = clamp_range(self.strength, &constants::STRENGTH_RANGE);
        out.depth_scale = clamp_range(self.depth_scale, &constants::DEPTH_SCALE_RANGE);
        out.focus_distance = clamp_range(self.focus_distance, &constants::FOCUS_DISTANCE_RANGE);
        out.edge_fade = clamp_range(self.edge_fade, &constants::EDGE_FADE_RANGE);
        out.depth_smoothing = clamp_range(self.depth_smoothing, &constants::DEPTH_SMOOTHING_RANGE);
        out.num_layers = self.num_layers.clamp(
            *constants::NUM_LAYERS_RANGE.start(),
            *constants::NUM_LAYERS_RANGE.end(),
        );
        out.feather_width = clamp_range(self.feather_width, &constants::FEATHER_WIDTH_RANGE);
        out.layer_spacing = clamp_range(self.layer_spacing, &constants::LAYER_SPACING_CM_RANGE);
        out
    }

    /// Merge a patch (clamping every value) and report what changed
    pub fn apply(&mut self, patch: &ParallaxSettingsPatch) -> SettingsChange {
        let before = *self;
        let mut next = *self;

        if let Some(v) = patch.strength {
            next.strength = v;
        }
        if let Some(v) = patch.depth_scale {
            next.depth_scale = v;
        }
        if let Some(v) = patch.focus_distance {
            next.focus_distance = v;
        }
        if let Some(v) = patch.edge_fade {
            next.edge_fade = v;
        }
        if let Some(v) = patch.depth_smoothing {
            next.depth_smoothing = v;
        }
        if let Some(v) = patch.mode {
            next.mode = v;
        }
        if let Some(v) = patch.num_layers {
            next.num_layers = v;
        }
        if let Some(v) = patch.feather_width {
            next.feather_width = v;
        }
        if let Some(v) = patch.layer_spacing {
            next.layer_spacing = v;
        }

        *self = next.sanitized();
        self.diff(&before)
    }

    fn diff(&self, before: &Self) -> SettingsChange {
        let layer_count = self.num_layers != before.num_layers;
        let layout = layer_count || self.layer_spacing != before.layer_spacing;
        let uniforms = layout
            || self.strength != before.strength
            || self.depth_scale != before.depth_scale
            || self.focus_distance != before.focus_distance
            || self.edge_fade != before.edge_fade
            || self.depth_smoothing != before.depth_smoothing
            || self.feather_width != before.feather_width;
        SettingsChange {
            uniforms,
            layout,
            layer_count,
            mode: self.mode != before.mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_in_range() {
        let settings = ParallaxSettings::default();
        assert_eq!(settings, settings.sanitized());
    }

    #[test]
    fn test_num_layers_clamped() {
        let mut settings = ParallaxSettings::default();
        settings.apply(&ParallaxSettingsPatch {
            num_layers: Some(9),
            ..Default::default()
        });
        assert_eq!(settings.num_layers, 4);
        settings.apply(&ParallaxSettingsPatch {
            num_layers: Some(0),
            ..Default::default()
        });
        assert_eq!(settings.num_layers, 2);
    }

    #[test]
    fn test_patch_reports_cheap_change() {
        let mut settings = ParallaxSettings::default();
        let change = settings.apply(&ParallaxSettingsPatch {
            strength: Some(0.4),
            ..Default::default()
        });
        assert!(change.uniforms);
        assert!(!change.layout);
        assert!(!change.layer_count);
        assert_eq!(settings.strength, 0.4);
    }

    #[test]
    fn test_patch_reports_structural_change() {
        let mut settings = ParallaxSettings::default();
        let change = settings.apply(&ParallaxSettingsPatch {
            num_layers: Some(4),
            ..Default::default()
        });
        assert!(change.layer_count && change.layout && change.uniforms);

        let change = settings.apply(&ParallaxSettingsPatch {
            layer_spacing: Some(12.0),
            ..Default::default()
        });
        assert!(change.layout);
        assert!(!change.layer_count);
    }

    #[test]
    fn test_unchanged_patch_is_empty() {
        let mut settings = ParallaxSettings::default();
        let change = settings.apply(&ParallaxSettingsPatch {
            edge_fade: Some(settings.edge_fade),
            ..Default::default()
        });
        assert!(change.is_empty());

        // Clamped to the same value is no change either
        settings.edge_fade = 0.2;
        let change = settings.apply(&ParallaxSettingsPatch {
            edge_fade: Some(3.0),
            ..Default::default()
        });
        assert!(change.is_empty());
    }

    #[test]
    fn test_patch_from_json() {
        let patch: ParallaxSettingsPatch =
            serde_json::from_str(r#"{"focus_distance": 0.7, "mode": "layered"}"#).unwrap();
        assert_eq!(patch.focus_distance, Some(0.7));
        assert_eq!(patch.mode, Some(ParallaxMode::Layered));
        assert_eq!(patch.strength, None);
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("layered".parse::<ParallaxMode>(), Ok(ParallaxMode::Layered));
        assert_eq!("Single".parse::<ParallaxMode>(), Ok(ParallaxMode::Single));
        assert!("cube".parse::<ParallaxMode>().is_err());
    }
}
