// SPDX-License-Identifier: GPL-3.0-only

//! Depth band layout for layered rendering

use super::settings::ParallaxSettings;
use super::shading;

/// One depth band and the plane that shows it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerConfig {
    /// Band index; 0 is the farthest band
    pub index: u32,
    /// Lower depth bound of the band (inclusive)
    pub depth_min: f32,
    /// Upper depth bound of the band
    pub depth_max: f32,
    /// Plane offset along z relative to the group origin (cm, negative is farther)
    pub z_offset: f32,
}

impl LayerConfig {
    pub fn center(&self) -> f32 {
        (self.depth_min + self.depth_max) * 0.5
    }

    pub fn half_width(&self) -> f32 {
        (self.depth_max - self.depth_min) * 0.5
    }
}

/// Equal-width bands covering `[0, 1]`, planes spaced symmetrically about the origin
pub fn compute_layers(settings: &ParallaxSettings) -> Vec<LayerConfig> {
    let settings = settings.sanitized();
    let n = settings.num_layers;
    let width = shading::band_width(n);
    let mid = (n as f32 - 1.0) * 0.5;

    (0..n)
        .map(|k| LayerConfig {
            index: k,
            depth_min: k as f32 * width,
            depth_max: if k + 1 == n { 1.0 } else { (k + 1) as f32 * width },
            z_offset: (k as f32 - mid) * settings.layer_spacing,
        })
        .collect()
}
