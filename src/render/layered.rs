// SPDX-License-Identifier: GPL-3.0-only

//! Layered (MPI-lite) parallax
//!
//! The depth range is split into equal bands, each drawn on its own plane at
//! its own z offset. Every plane samples the same texture set and parallaxes
//! about its band center. Planes are composited back-to-front.

use std::sync::Arc;

use tracing::{debug, warn};

use super::draw_list::DrawList;
use super::layers::{LayerConfig, compute_layers};
use super::pipeline::{BoundTextures, ParallaxPipeline, PipelineKind, PlaneResources, begin_pass};
use super::settings::{ParallaxMode, ParallaxSettings, ParallaxSettingsPatch, SettingsChange};
use super::textures::{GpuImage, TextureSlots, TextureUpdate};
use super::uniforms::ParallaxUniforms;
use super::{ParallaxRenderer, RendererOptions, plane_model};
use crate::gpu::GpuContext;
use crate::tracking::ScreenConfig;

struct LayerPlane {
    layer: LayerConfig,
    resources: PlaneResources,
}

struct LayeredGpu {
    pipeline: ParallaxPipeline,
    planes: DrawList<LayerPlane>,
    textures: BoundTextures,
}

pub struct LayeredRenderer {
    device: Arc<wgpu::Device>,
    options: RendererOptions,
    settings: ParallaxSettings,
    /// Values shared by every plane; per-plane fields are filled in on top
    shared: ParallaxUniforms,
    gpu: Option<LayeredGpu>,
}

impl LayeredRenderer {
    pub fn new(context: &GpuContext, options: RendererOptions) -> Self {
        let settings = options.settings.sanitized();
        let pipeline = ParallaxPipeline::new(
            &context.device,
            &context.queue,
            options.format,
            PipelineKind::Layered,
        );

        let shared = ParallaxUniforms::from_settings(&settings);

        let mut renderer = Self {
            device: Arc::clone(&context.device),
            options,
            settings,
            shared,
            gpu: Some(LayeredGpu {
                pipeline,
                planes: DrawList::new(),
                textures: BoundTextures::empty(),
            }),
        };
        renderer.rebuild_planes();

        debug!(
            layers = renderer.settings.num_layers,
            format = ?renderer.options.format,
            "Layered renderer created"
        );
        renderer
    }

    pub fn layer_count(&self) -> usize {
        self.gpu.as_ref().map_or(0, |gpu| gpu.planes.len())
    }

    /// Bands and their uniforms in draw order (farthest first)
    pub fn layers(&self) -> Vec<(LayerConfig, ParallaxUniforms)> {
        self.gpu.as_ref().map_or_else(Vec::new, |gpu| {
            gpu.planes
                .iter_ordered()
                .map(|(_, plane)| (plane.layer, plane.resources.uniforms))
                .collect()
        })
    }

    fn plane_uniforms(&self, layer: &LayerConfig) -> ParallaxUniforms {
        let mut uniforms = self.shared;
        uniforms.band_index = layer.index;
        uniforms.num_layers = self.settings.num_layers;
        uniforms.model = plane_model(&self.options.screen, self.options.plane_z + layer.z_offset);
        uniforms
    }

    /// Replace every plane; only the uniform buffers are reallocated
    fn rebuild_planes(&mut self) {
        let layers = compute_layers(&self.settings);
        let uniforms: Vec<_> = layers
            .iter()
            .map(|layer| (*layer, self.plane_uniforms(layer)))
            .collect();

        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        gpu.planes.clear();
        for (layer, uniforms) in uniforms {
            let resources = PlaneResources::new(&self.device, &gpu.pipeline, uniforms);
            gpu.planes
                .insert(layer.index as i32, LayerPlane { layer, resources });
        }
        debug!(layers = gpu.planes.len(), "Layer planes rebuilt");
    }

    /// Move existing planes to the current layout
    fn reposition_planes(&mut self) {
        let layers = compute_layers(&self.settings);
        let screen = self.options.screen;
        let plane_z = self.options.plane_z;
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };

        let handles: Vec<_> = gpu.planes.iter_ordered().map(|(handle, _)| handle).collect();
        for handle in handles {
            let Some(plane) = gpu.planes.get_mut(handle) else {
                continue;
            };
            if let Some(layer) = layers.iter().find(|l| l.index == plane.layer.index) {
                plane.layer = *layer;
                let model = plane_model(&screen, plane_z + layer.z_offset);
                plane.resources.update(|u| u.model = model);
            }
        }
    }

    fn update_planes(&mut self, edit: impl Fn(&mut ParallaxUniforms)) {
        edit(&mut self.shared);
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        let handles: Vec<_> = gpu.planes.iter_ordered().map(|(handle, _)| handle).collect();
        for handle in handles {
            if let Some(plane) = gpu.planes.get_mut(handle) {
                plane.resources.update(&edit);
            }
        }
    }
}

impl ParallaxRenderer for LayeredRenderer {
    fn mode(&self) -> ParallaxMode {
        ParallaxMode::Layered
    }

    fn settings(&self) -> ParallaxSettings {
        self.settings
    }

    fn update_viewer_offset(&mut self, x: f32, y: f32) {
        if !(x.is_finite() && y.is_finite()) {
            debug!(x, y, "Ignoring non-finite viewer offset");
            return;
        }
        self.update_planes(|u| u.viewer_offset = [x, y]);
    }

    fn set_view_projection(&mut self, view_proj: [[f32; 4]; 4]) {
        self.update_planes(|u| u.view_proj = view_proj);
    }

    fn set_screen(&mut self, screen: ScreenConfig) {
        self.options.screen = screen;
        self.reposition_planes();
    }

    fn apply_settings(&mut self, patch: &ParallaxSettingsPatch) -> SettingsChange {
        let change = self.settings.apply(patch);
        if change.uniforms {
            let settings = self.settings;
            self.update_planes(|u| u.apply_settings(&settings));
        }
        if change.layer_count {
            self.rebuild_planes();
        } else if change.layout {
            self.reposition_planes();
        }
        change
    }

    fn update_textures(&mut self, update: TextureUpdate) {
        let Some(gpu) = self.gpu.as_mut() else {
            warn!("Texture update on a disposed layered renderer");
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
        self.update_planes(|u| {
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
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };
        let handles: Vec<_> = gpu.planes.iter_ordered().map(|(handle, _)| handle).collect();
        for handle in handles {
            if let Some(plane) = gpu.planes.get_mut(handle) {
                plane.resources.flush(queue);
            }
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

        let mut pass = begin_pass(encoder, target, clear, "parallax_layered_pass");
        let Some(textures) = gpu.textures.bind_group.as_ref() else {
            return;
        };
        pass.set_pipeline(gpu.pipeline.pipeline());
        pass.set_bind_group(0, textures, &[]);
        for (_, plane) in gpu.planes.iter_ordered() {
            pass.set_bind_group(1, plane.resources.bind_group(), &[]);
            pass.draw(0..6, 0..1);
        }
    }

    fn dispose(&mut self) {
        if let Some(mut gpu) = self.gpu.take() {
            gpu.planes.clear();
            debug!("Layered renderer disposed");
        }
    }

    fn is_disposed(&self) -> bool {
        self.gpu.is_none()
    }
}

impl Drop for LayeredRenderer {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn renderer() -> Option<LayeredRenderer> {
        match GpuContext::new_headless("layered_test").await {
            Ok(context) => Some(LayeredRenderer::new(
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
        assert_eq!(renderer.layer_count(), 0);
        renderer.set_num_layers(4);
        renderer.update_viewer_offset(1.0, 0.0);
    }

    #[tokio::test]
    async fn test_layer_count_change_rebuilds_planes() {
        let Some(mut renderer) = renderer().await else {
            return;
        };
        assert_eq!(renderer.layer_count(), 3);

        let change = renderer.apply_settings(&ParallaxSettingsPatch {
            num_layers: Some(4),
            ..Default::default()
        });
        assert!(change.layer_count);
        assert_eq!(renderer.layer_count(), 4);

        let layers = renderer.layers();
        let bands: Vec<u32> = layers.iter().map(|(_, u)| u.band_index).collect();
        assert_eq!(bands, vec![0, 1, 2, 3]);
        assert!(layers.iter().all(|(_, u)| u.num_layers == 4));
    }

    #[tokio::test]
    async fn test_spacing_change_moves_planes() {
        let Some(mut renderer) = renderer().await else {
            return;
        };
        renderer.update_viewer_offset(0.2, 0.1);
        renderer.set_layer_spacing(10.0);
        assert_eq!(renderer.layer_count(), 3);

        let layers = renderer.layers();
        let z: Vec<f32> = layers.iter().map(|(layer, _)| layer.z_offset).collect();
        assert_eq!(z, vec![-10.0, 0.0, 10.0]);
        // Model translation column carries the z offset
        assert_eq!(layers[0].1.model[3][2], -10.0);
        assert!(layers.iter().all(|(_, u)| u.viewer_offset == [0.2, 0.1]));
    }
}
