// SPDX-License-Identifier: GPL-3.0-only

//! Per-frame orchestration
//!
//! One [`VirtualWindow::tick`] per display refresh: take the latest face
//! sample (never waiting for one), update the smoothed eye position, rebuild
//! the off-axis camera and push both into the active renderer. The host then
//! calls [`prepare`](VirtualWindow::prepare) and
//! [`render`](VirtualWindow::render) with its own queue and encoder.

use tokio::sync::watch;
use tracing::{debug, info};

use crate::assets::ImageSet;
use crate::config::Config;
use crate::gpu::GpuContext;
use crate::projection::{ClipPlanes, OffAxisCamera, update_off_axis_projection};
use crate::render::{
    ParallaxMode, ParallaxRenderer, ParallaxSettings, ParallaxSettingsPatch, RendererOptions,
    SettingsChange, TextureUpdate, create_renderer,
};
use crate::tracking::{
    Calibration, FaceSample, SampleStatus, ScreenConfig, TrackerStats, ViewerPosition,
    ViewerTracker,
};

/// Background behind the parallax planes
pub const CLEAR_COLOR: wgpu::Color = wgpu::Color::BLACK;

/// Outcome of one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameState {
    /// Smoothed eye position used for this frame
    pub position: ViewerPosition,
    /// Offset pushed to the renderer, in screen half-extents
    pub viewer_offset: [f32; 2],
    pub status: SampleStatus,
    /// False when the projection kept its previous value
    pub projection_updated: bool,
}

pub struct VirtualWindow {
    context: GpuContext,
    tracker: ViewerTracker,
    camera: OffAxisCamera,
    renderer: Box<dyn ParallaxRenderer>,
    options: RendererOptions,
    screen: ScreenConfig,
    clip: ClipPlanes,
}

impl VirtualWindow {
    /// Build a window rendering into targets of `format`
    pub fn new(
        context: GpuContext,
        samples: watch::Receiver<Option<FaceSample>>,
        config: &Config,
        format: wgpu::TextureFormat,
    ) -> Self {
        let config = config.sanitized();
        let tracker =
            ViewerTracker::new(samples, config.calibration, config.screen, config.tracking);
        let camera = OffAxisCamera::new(tracker.position(), &config.screen, config.clip);
        let options = RendererOptions::new(format, config.screen).with_settings(config.parallax);
        let mut renderer = create_renderer(&context, config.parallax.mode, options);
        renderer.set_view_projection(camera.view_projection_columns());

        info!(
            mode = config.parallax.mode.as_str(),
            adapter = %context.info.adapter_name,
            "Virtual window created"
        );

        Self {
            context,
            tracker,
            camera,
            renderer,
            options,
            screen: config.screen,
            clip: config.clip,
        }
    }

    /// Advance one frame
    pub fn tick(&mut self) -> FrameState {
        let update = self.tracker.tick();
        let projection_updated =
            update_off_axis_projection(&mut self.camera, update.position, &self.screen, self.clip);
        let viewer_offset = update.position.normalized_offset(&self.screen);

        self.renderer.set_view_projection(self.camera.view_projection_columns());
        self.renderer.update_viewer_offset(viewer_offset[0], viewer_offset[1]);

        FrameState {
            position: update.position,
            viewer_offset,
            status: update.status,
            projection_updated,
        }
    }

    /// Flush pending uniform writes
    pub fn prepare(&mut self, queue: &wgpu::Queue) {
        self.renderer.prepare(queue);
    }

    /// Record this frame's draw, clearing `target` to [`CLEAR_COLOR`]
    pub fn render(&self, encoder: &mut wgpu::CommandEncoder, target: &wgpu::TextureView) {
        self.renderer.render(encoder, target, Some(CLEAR_COLOR));
    }

    pub fn mode(&self) -> ParallaxMode {
        self.renderer.mode()
    }

    /// Switch strategy, carrying over settings, camera and the current textures
    pub fn set_mode(&mut self, mode: ParallaxMode) {
        if self.renderer.mode() == mode {
            return;
        }

        let textures = self.renderer.textures();
        let mut settings = self.renderer.settings();
        settings.mode = mode;
        self.options.settings = settings;
        self.options.screen = self.screen;

        let mut next = create_renderer(&self.context, mode, self.options);
        next.set_view_projection(self.camera.view_projection_columns());
        let offset = self.camera_offset();
        next.update_viewer_offset(offset[0], offset[1]);
        if let Some(color) = textures.color {
            next.update_textures(TextureUpdate::asset(color, textures.depth, textures.mask));
        }

        self.renderer.dispose();
        self.renderer = next;
        debug!(mode = mode.as_str(), "Parallax mode switched");
    }

    fn camera_offset(&self) -> [f32; 2] {
        let eye = self.camera.position();
        ViewerPosition::new(eye.x, eye.y, eye.z).normalized_offset(&self.screen)
    }

    pub fn settings(&self) -> ParallaxSettings {
        self.renderer.settings()
    }

    /// Apply a settings patch live; a mode change swaps the renderer
    pub fn apply_settings(&mut self, patch: &ParallaxSettingsPatch) -> SettingsChange {
        let change = self.renderer.apply_settings(patch);
        if change.mode {
            let mode = self.renderer.settings().mode;
            self.set_mode(mode);
        }
        change
    }

    /// Swap in a new asset or part of one
    pub fn update_textures(&mut self, update: TextureUpdate) {
        self.renderer.update_textures(update);
    }

    /// Upload decoded images and show them
    pub fn load_images(&mut self, images: &ImageSet) {
        let update = images.upload(&self.context);
        self.renderer.update_textures(update);
    }

    /// Replace the calibration; a new screen width resizes the screen at the same aspect
    pub fn set_calibration(&mut self, calibration: Calibration) {
        self.tracker.set_calibration(calibration);
        let width_cm = self.tracker.calibration().screen_width_cm;
        if width_cm != self.screen.width_cm {
            let calibration = *self.tracker.calibration();
            self.set_screen(ScreenConfig::from_calibration(
                &calibration,
                self.screen.aspect_ratio(),
            ));
        }
    }

    pub fn set_screen(&mut self, screen: ScreenConfig) {
        if !screen.is_valid() {
            debug!(?screen, "Ignoring invalid screen size");
            return;
        }
        self.screen = screen;
        self.options.screen = screen;
        self.tracker.set_screen(screen);
        self.renderer.set_screen(screen);
    }

    pub fn set_clip_planes(&mut self, clip: ClipPlanes) {
        if clip.is_valid() {
            self.clip = clip;
        }
    }

    pub fn camera(&self) -> &OffAxisCamera {
        &self.camera
    }

    pub fn renderer(&self) -> &dyn ParallaxRenderer {
        self.renderer.as_ref()
    }

    pub fn tracker_stats(&self) -> TrackerStats {
        self.tracker.stats()
    }

    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    /// Release the renderer's GPU resources; later frames draw nothing
    pub fn dispose(&mut self) {
        self.renderer.dispose();
    }
}
