// SPDX-License-Identifier: GPL-3.0-only

//! Per-plane shader parameters

use super::settings::ParallaxSettings;

/// Layout must match `ParallaxUniforms` in `parallax_common.wgsl`
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ParallaxUniforms {
    // === Transforms (column-major) ===
    pub view_proj: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],

    // === Parallax ===
    /// Normalized viewer offset, +y up
    pub viewer_offset: [f32; 2],
    pub strength: f32,
    pub depth_scale: f32,
    pub focus_distance: f32,
    pub edge_fade: f32,
    pub depth_smoothing: f32,
    pub feather_width: f32,
    /// Depth texel size in UV units
    pub texel_size: [f32; 2],

    // === Layering ===
    /// Band drawn by this plane (0 = farthest)
    pub band_index: u32,
    /// Total band count; 1 for single-plane rendering
    pub num_layers: u32,

    // === Inputs ===
    pub has_depth: u32,
    pub has_mask: u32,
    pub _padding: [u32; 2],
}

const IDENTITY: [[f32; 4]; 4] = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

impl Default for ParallaxUniforms {
    fn default() -> Self {
        Self::from_settings(&ParallaxSettings::default())
    }
}

impl ParallaxUniforms {
    pub fn from_settings(settings: &ParallaxSettings) -> Self {
        Self {
            view_proj: IDENTITY,
            model: IDENTITY,
            viewer_offset: [0.0, 0.0],
            strength: settings.strength,
            depth_scale: settings.depth_scale,
            focus_distance: settings.focus_distance,
            edge_fade: settings.edge_fade,
            depth_smoothing: settings.depth_smoothing,
            feather_width: settings.feather_width,
            texel_size: [1.0, 1.0],
            band_index: 0,
            num_layers: 1,
            has_depth: 0,
            has_mask: 0,
            _padding: [0; 2],
        }
    }

    /// Copy the tunable values of `settings`, leaving transforms and inputs alone
    pub fn apply_settings(&mut self, settings: &ParallaxSettings) {
        self.strength = settings.strength;
        self.depth_scale = settings.depth_scale;
        self.focus_distance = settings.focus_distance;
        self.edge_fade = settings.edge_fade;
        self.depth_smoothing = settings.depth_smoothing;
        self.feather_width = settings.feather_width;
    }
}
