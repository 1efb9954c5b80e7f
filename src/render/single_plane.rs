// SPDX-License-Identifier: GPL-3.0-only

//! Single-plane parallax: one quad, continuous per-pixel displacement

use std::sync::Arc;

use tracing::{debug, warn};

use super::pipeline::{BoundTextures, ParallaxPipeline, PipelineKind, PlaneResources, begin_pass};
use super::settings::{ParallaxMode, ParallaxSettings, ParallaxSettingsPatch, SettingsChange};
use super::textures::{GpuImage, TextureSlots, TextureUpdate};
use super::uniforms::ParallaxUniforms;
use super::{ParallaxRenderer, RendererOptions, plane_model};
use crate::gpu::GpuContext;
use crate::tracking::ScreenConfig;

struct SinglePlaneGpu {
    pipeline: ParallaxPipeline,
    plane: PlaneResources,
    textures: BoundTextures,
}

pub struct SinglePlaneRenderer {
    device: Arc<wgpu::Device>,
    options: RendererOptions,
    settings: ParallaxSettings,
    gpu: Option<SinglePlaneGpu>,
}

impl SinglePlaneRenderer {
    pub fn new(context: &GpuContext, options: RendererOptions) -> Self {
        let settings = options.settings.sanitized();
        let pipeline = ParallaxPipeline::new(
            &context.device,
            &context.queue,
            options.format,
            PipelineKind::SinglePlane,
        );

        let mut uniforms = ParallaxUniforms::from_settings(&settings);
        uniforms.model = plane_model(&options.screen, options.plane_z);
        let plane = PlaneResources::new(&context.device, &pipeline, uniforms);

        debug!(format = ?options.format, "Single-plane renderer created");

        Self {
            device: Arc::clone(&context.device),
            options,
            settings,
            gpu: Some(SinglePlaneGpu {
                pipeline,
                plane,
                textures: BoundTextures::empty(),
            }),
        }
    }

    /// Uniforms the next frame will use, if not disposed
    pub fn uniforms(&self) -> Option<&ParallaxUniforms> {
        self.gpu.as_ref().map(|gpu| &gpu.plane.uniforms)
    }
}

impl ParallaxRenderer for SinglePlaneRenderer {
    fn mode(&self) -> ParallaxMode {
        ParallaxMode::Single
    }

    fn settings(&self) -> ParallaxSettings {
        self.settings
    }

    fn update_viewer_offset(&mut self, x: f32, y: f32) {
        if !(x.is_finite() && y.is_finite()) {
            debug!(x, y, "Ignoring non-finite viewer offset");
            return;
        }
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.plane.update(|u| u.viewer_offset = [x, y]);
        }
    }

    fn set_view_projection(&mut self, view_proj: [[f32; 4]; 4]) {
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.plane.update(|u| u.view_proj = view_proj);
        }
    }

    fn set_screen(&mut self, screen: ScreenConfig) {
        self.options.screen = screen;
        let model = plane_model(&screen, self.options.plane_z);
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.plane.update(|u| u.model = model);
        }
    }

    fn apply_settings(&mut self, patch: &ParallaxSettingsPatch) -> SettingsChange {
        let change = self.settings.apply(patch);
        if change.uniforms {
            let settings = self.settings;
            if let Some(gpu) = self.gpu.as_mut() {
                gpu.plane.update(|u| u.apply_settings(&settings));
            }
        }
        change
    }

    fn update_textures(&mut self, update: TextureUpdate) {
        let Some(gpu) = self.gpu.as_mut() else {
            warn!("Texture update on a disposed single-plane renderer");
            return;
        };
        if update.is_empty() {
            return;
        }

        let slots = gpu.textures.slots.merged(update);
        let texel_size = slots.depth_texel_size();
        let has_depth = slots.has_depth() as u32;
        let has_mask = slots.has_mask() as u32;

        gpu.textures = BoundTextures::bind(&self.device, &gpu.pipeline, slots);
        gpu.plane.update(|u| {
            u.texel_size = texel_size;
            u.has_depth = has_depth;
            u.has_mask = has_mask;
        });
    }

    fn textures(&self) -> TextureSlots<Arc<GpuImage>> {
        self.gpu
            .as_ref()
            .map(|gpu| gpu.textures.slots.clone())
            .unwrap_or_default()
    }

    fn prepare(&mut self, queue: &wgpu::Queue) {
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.plane.flush(queue);
        }
    }

    fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        clear: Option<wgpu::Color>,
    ) {
        let Some(gpu) = self.gpu.as_ref() else {
            return;
        };

        let mut pass = begin_pass(encoder, target, clear, "parallax_single_pass");
        let Some(textures) = gpu.textures.bind_group.as_ref() else {
            return;
        };
        pass.set_pipeline(gpu.pipeline.pipeline());
        pass.set_bind_group(0, textures, &[]);
        pass.set_bind_group(1, gpu.plane.bind_group(), &[]);
        pass.draw(0..6, 0..1);
    }

    fn dispose(&mut self) {
        if self.gpu.take().is_some() {
            debug!("Single-plane renderer disposed");
        }
    }

    fn is_disposed(&self) -> bool {
        self.gpu.is_none()
    }
}

impl Drop for SinglePlaneRenderer {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn renderer() -> Option<SinglePlaneRenderer> {
        match GpuContext::new_headless("single_plane_test").await {
            Ok(context) => Some(SinglePlaneRenderer::new(
                &context,
                RendererOptions::new(wgpu::TextureFormat::Rgba8UnormSrgb, ScreenConfig::default()),
            )),
            Err(e) => {
                println!("Skipping test (no GPU): {}", e);
                None
            }
        }
    }

    #[tokio::test]
    async fn test_dispose_twice() {
        let Some(mut renderer) = renderer().await else {
            return;
        };
        renderer.dispose();
        renderer.dispose();
        assert!(renderer.is_disposed());

        // Calls after disposal are no-ops
        renderer.update_viewer_offset(0.5, 0.5);
        renderer.set_strength(0.3);
        assert_eq!(renderer.settings().strength, 0.3);
        assert!(renderer.uniforms().is_none());
    }

    #[tokio::test]
    async fn test_settings_reach_uniforms() {
        let Some(mut renderer) = renderer().await else {
            return;
        };
        renderer.set_focus_distance(0.8);
        renderer.update_viewer_offset(0.25, -0.5);
        let uniforms = renderer.uniforms().copied().unwrap_or_default();
        assert_eq!(uniforms.focus_distance, 0.8);
        assert_eq!(uniforms.viewer_offset, [0.25, -0.5]);
        assert_eq!(uniforms.num_layers, 1);
    }
}
