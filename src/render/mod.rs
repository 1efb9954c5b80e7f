// SPDX-License-Identifier: GPL-3.0-only

//! Depth-parallax renderers
//!
//! Two interchangeable strategies draw a color image displaced by its depth
//! map as the viewer moves:
//!
//! - [`SinglePlaneRenderer`]: one plane, continuous displacement about the
//!   focus distance
//! - [`LayeredRenderer`]: a few depth bands on separate planes, each
//!   displaced about its own band center
//!
//! Both are driven through [`ParallaxRenderer`]. Depth is 1.0 for the
//! nearest content and 0.0 for the farthest.

mod draw_list;
mod layered;
mod layers;
mod offscreen;
mod pipeline;
mod preview;
mod settings;
pub mod shading;
mod single_plane;
mod textures;
mod uniforms;

pub use draw_list::{DrawHandle, DrawList};
pub use layered::LayeredRenderer;
pub use layers::{LayerConfig, compute_layers};
pub use offscreen::OffscreenTarget;
pub use pipeline::PipelineKind;
pub use preview::{PreviewInputs, render_preview};
pub use settings::{ParallaxMode, ParallaxSettings, ParallaxSettingsPatch, SettingsChange};
pub use single_plane::SinglePlaneRenderer;
pub use textures::{GpuImage, TextureSlots, TextureUpdate};
pub use uniforms::ParallaxUniforms;

use std::sync::Arc;

use nalgebra::{Matrix4, Vector3};

use crate::gpu::GpuContext;
use crate::tracking::ScreenConfig;

/// Construction parameters shared by both strategies
#[derive(Debug, Clone, Copy)]
pub struct RendererOptions {
    /// Format of the render target
    pub format: wgpu::TextureFormat,
    /// Physical screen size; planes are sized to match it
    pub screen: ScreenConfig,
    /// World z of the plane (of the layer group origin in layered mode), cm
    pub plane_z: f32,
    pub settings: ParallaxSettings,
}

impl RendererOptions {
    pub fn new(format: wgpu::TextureFormat, screen: ScreenConfig) -> Self {
        Self {
            format,
            screen,
            plane_z: 0.0,
            settings: ParallaxSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ParallaxSettings) -> Self {
        self.settings = settings;
        self
    }
}

/// Model matrix placing the unit quad over the screen rectangle at depth `z`
pub fn plane_model(screen: &ScreenConfig, z: f32) -> [[f32; 4]; 4] {
    let scale =
        Matrix4::new_nonuniform_scaling(&Vector3::new(screen.width_cm, screen.height_cm, 1.0));
    let translation = Matrix4::new_translation(&Vector3::new(0.0, 0.0, z));
    (translation * scale).into()
}

/// Common interface of the parallax strategies.
///
/// All calls after [`dispose`](Self::dispose) are accepted and ignored,
/// except that settings keep being tracked.
pub trait ParallaxRenderer {
    fn mode(&self) -> ParallaxMode;

    /// Current (clamped) settings
    fn settings(&self) -> ParallaxSettings;

    /// Normalized viewer offset: x and y in screen half-extents, +y up
    fn update_viewer_offset(&mut self, x: f32, y: f32);

    /// Column-major view-projection of the off-axis camera
    fn set_view_projection(&mut self, view_proj: [[f32; 4]; 4]);

    fn set_screen(&mut self, screen: ScreenConfig);

    /// Merge a partial settings update and apply it live
    fn apply_settings(&mut self, patch: &ParallaxSettingsPatch) -> SettingsChange;

    /// Swap textures as one set
    fn update_textures(&mut self, update: TextureUpdate);

    /// Texture set currently sampled
    fn textures(&self) -> TextureSlots<Arc<GpuImage>>;

    /// Write pending uniform changes
    fn prepare(&mut self, queue: &wgpu::Queue);

    /// Record the draw into `target`, clearing it first when `clear` is set
    fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        clear: Option<wgpu::Color>,
    );

    /// Release GPU resources; safe to call more than once
    fn dispose(&mut self);

    fn is_disposed(&self) -> bool;

    fn set_strength(&mut self, value: f32) {
        self.apply_settings(&ParallaxSettingsPatch {
            strength: Some(value),
            ..Default::default()
        });
    }

    fn set_depth_scale(&mut self, value: f32) {
        self.apply_settings(&ParallaxSettingsPatch {
            depth_scale: Some(value),
            ..Default::default()
        });
    }

    fn set_focus_distance(&mut self, value: f32) {
        self.apply_settings(&ParallaxSettingsPatch {
            focus_distance: Some(value),
            ..Default::default()
        });
    }

    fn set_edge_fade(&mut self, value: f32) {
        self.apply_settings(&ParallaxSettingsPatch {
            edge_fade: Some(value),
            ..Default::default()
        });
    }

    fn set_depth_smoothing(&mut self, value: f32) {
        self.apply_settings(&ParallaxSettingsPatch {
            depth_smoothing: Some(value),
            ..Default::default()
        });
    }

    fn set_num_layers(&mut self, value: u32) {
        self.apply_settings(&ParallaxSettingsPatch {
            num_layers: Some(value),
            ..Default::default()
        });
    }

    fn set_feather_width(&mut self, value: f32) {
        self.apply_settings(&ParallaxSettingsPatch {
            feather_width: Some(value),
            ..Default::default()
        });
    }

    fn set_layer_spacing(&mut self, value: f32) {
        self.apply_settings(&ParallaxSettingsPatch {
            layer_spacing: Some(value),
            ..Default::default()
        });
    }
}

/// Build the renderer for `mode`
pub fn create_renderer(
    context: &GpuContext,
    mode: ParallaxMode,
    options: RendererOptions,
) -> Box<dyn ParallaxRenderer> {
    let mut options = options;
    options.settings.mode = mode;
    match mode {
        ParallaxMode::Single => Box::new(SinglePlaneRenderer::new(context, options)),
        ParallaxMode::Layered => Box::new(LayeredRenderer::new(context, options)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_model_covers_screen() {
        let screen = ScreenConfig::new(40.0, 25.0);
        let model = Matrix4::from(plane_model(&screen, -5.0));
        let corner = model.transform_point(&nalgebra::Point3::new(0.5, 0.5, 0.0));
        assert!((corner.x - 20.0).abs() < 1e-5);
        assert!((corner.y - 12.5).abs() < 1e-5);
        assert!((corner.z + 5.0).abs() < 1e-5);
    }
}
