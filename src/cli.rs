// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Estimating a viewer position from a face sample
//! - Printing off-axis frustums
//! - Rendering a parallax frame headless
//! - Simulating the tracking loop
//! - Inspecting the stored configuration

use chrono::Local;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;
use virtual_window::assets::{AssetKind, AssetLoader, ImageSet};
use virtual_window::config::Config;
use virtual_window::errors::AssetError;
use virtual_window::gpu::GpuContext;
use virtual_window::projection::{ClipPlanes, OffAxisCamera, update_off_axis_projection};
use virtual_window::render::{
    OffscreenTarget, ParallaxMode, RendererOptions, create_renderer, render_preview,
};
use virtual_window::tracking::{
    FaceSample, SampleStatus, ScreenConfig, ViewerPosition, ViewerTracker,
    estimate_viewer_position, sample_channel,
};
use virtual_window::window::CLEAR_COLOR;

/// Default folder name for rendered frames
const DEFAULT_SAVE_FOLDER: &str = "VirtualWindow";

/// Print the viewer position for one face sample
pub fn estimate(
    face_x: f32,
    face_y: f32,
    eye_distance: f32,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load();
    let sample = FaceSample::new([face_x, face_y], eye_distance, 1.0);
    let position = estimate_viewer_position(&sample, &config.calibration, &config.screen);
    let offset = position.normalized_offset(&config.screen);

    println!("Viewer position (cm):");
    println!("  x: {:8.2}", position.x);
    println!("  y: {:8.2}", position.y);
    println!("  z: {:8.2}", position.z);
    println!("Normalized offset: ({:.3}, {:.3})", offset[0], offset[1]);
    Ok(())
}

/// Print the frustum and projection matrix for an eye position
pub fn frustum(
    x: f32,
    y: f32,
    z: f32,
    near: Option<f32>,
    far: Option<f32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load();
    let clip = ClipPlanes {
        near: near.unwrap_or(config.clip.near),
        far: far.unwrap_or(config.clip.far),
    };
    if !clip.is_valid() {
        return Err(format!("Invalid clip planes: near={} far={}", clip.near, clip.far).into());
    }

    let mut camera = OffAxisCamera::new(ViewerPosition::centered(), &config.screen, clip);
    let eye = ViewerPosition::new(x, y, z);
    if !update_off_axis_projection(&mut camera, eye, &config.screen, clip) {
        return Err(format!("Eye must be in front of the screen (z > 0), got z={}", z).into());
    }

    let f = camera.frustum();
    println!(
        "Screen: {:.1} x {:.1} cm",
        config.screen.width_cm, config.screen.height_cm
    );
    println!("Eye: ({:.2}, {:.2}, {:.2}) cm", x, y, z);
    println!("Frustum at near plane ({:.2} cm):", f.near);
    println!("  left:   {:9.4}", f.left);
    println!("  right:  {:9.4}", f.right);
    println!("  bottom: {:9.4}", f.bottom);
    println!("  top:    {:9.4}", f.top);
    println!("  far:    {:9.2}", f.far);
    println!("Projection matrix:");
    let p = camera.projection();
    for row in 0..4 {
        println!(
            "  [{:9.4} {:9.4} {:9.4} {:9.4}]",
            p[(row, 0)],
            p[(row, 1)],
            p[(row, 2)],
            p[(row, 3)]
        );
    }
    Ok(())
}

/// Arguments of the `render` command
pub struct RenderArgs {
    pub color: PathBuf,
    pub depth: Option<PathBuf>,
    pub mask: Option<PathBuf>,
    pub eye: [f32; 3],
    pub mode: Option<ParallaxMode>,
    pub width: u32,
    pub height: u32,
    pub force_cpu: bool,
    pub output: Option<PathBuf>,
}

/// Render one frame to a PNG, on the GPU when one is available
pub fn render(args: RenderArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load();
    let mut settings = config.parallax;
    if let Some(mode) = args.mode {
        settings.mode = mode;
    }

    let kind = if args.mask.is_some() {
        AssetKind::Object
    } else {
        AssetKind::Scene
    };
    let images = AssetLoader::new().load_set(
        &args.color,
        args.depth.as_deref(),
        args.mask.as_deref(),
        kind,
    )?;

    let width = args.width.max(1);
    let height = args.height.max(1);
    // Match the screen's aspect to the output image
    let screen = ScreenConfig::new(
        config.screen.width_cm,
        config.screen.width_cm * height as f32 / width as f32,
    );
    let eye = ViewerPosition::new(args.eye[0], args.eye[1], args.eye[2]);

    println!("Mode: {}", settings.mode.as_str());
    println!("Eye: ({:.1}, {:.1}, {:.1}) cm", eye.x, eye.y, eye.z);

    let frame = if args.force_cpu {
        None
    } else {
        pollster::block_on(render_gpu(
            &images,
            settings,
            screen,
            config.clip,
            eye,
            width,
            height,
        ))
    };

    let frame = match frame {
        Some(frame) => frame,
        None => {
            println!("Renderer: software");
            let offset = eye.normalized_offset(&screen);
            render_preview(&images.preview_inputs(), &settings, offset, width, height)
        }
    };

    let output_path = args.output.unwrap_or_else(|| {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        get_default_render_dir().join(format!("render_{}.png", timestamp))
    });
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    frame
        .save(&output_path)
        .map_err(|e| AssetError::Encode(e.to_string()))?;

    println!("Frame saved: {}", output_path.display());
    Ok(())
}

/// GPU path of `render`; `None` when no device could be created
async fn render_gpu(
    images: &ImageSet,
    settings: virtual_window::render::ParallaxSettings,
    screen: ScreenConfig,
    clip: ClipPlanes,
    eye: ViewerPosition,
    width: u32,
    height: u32,
) -> Option<image::RgbaImage> {
    let context = match GpuContext::new_headless("virtual-window-render").await {
        Ok(context) => context,
        Err(e) => {
            warn!(error = %e, "No GPU available, falling back to software rendering");
            return None;
        }
    };
    println!("Renderer: {} ({:?})", context.info.adapter_name, context.info.backend);

    let target = OffscreenTarget::new(&context, width, height);
    let options = RendererOptions::new(target.format(), screen).with_settings(settings);
    let mut renderer = create_renderer(&context, settings.mode, options);

    let mut camera = OffAxisCamera::new(ViewerPosition::centered(), &screen, clip);
    if !update_off_axis_projection(&mut camera, eye, &screen, clip) {
        warn!(?eye, "Eye position not in front of the screen, rendering from center");
    }
    let camera_eye = camera.position();
    let offset = ViewerPosition::new(camera_eye.x, camera_eye.y, camera_eye.z)
        .normalized_offset(&screen);

    renderer.set_view_projection(camera.view_projection_columns());
    renderer.update_viewer_offset(offset[0], offset[1]);
    renderer.update_textures(images.upload(&context));
    renderer.prepare(&context.queue);

    let mut encoder = context
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("virtual-window-render"),
        });
    renderer.render(&mut encoder, target.view(), Some(CLEAR_COLOR));
    target.copy_to_readback(&mut encoder);
    context.queue.submit(std::iter::once(encoder.finish()));

    let frame = match target.read_image(&context).await {
        Ok(frame) => Some(frame),
        Err(e) => {
            warn!(error = %e, "GPU readback failed, falling back to software rendering");
            None
        }
    };
    renderer.dispose();
    frame
}

/// Run the tracking loop against a synthetic detector
pub fn simulate(frames: u32, fps: u32, detector_hz: u32) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load();
    let fps = fps.clamp(1, 240);
    let detector_hz = detector_hz.clamp(1, fps);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let (sender, receiver) = sample_channel();
        let mut tracker =
            ViewerTracker::new(receiver, config.calibration, config.screen, config.tracking);
        let mut camera = OffAxisCamera::new(tracker.position(), &config.screen, config.clip);

        // Detector: the face sweeps left and right and drops out for a second every 4 s
        let detector = tokio::spawn(async move {
            let period = Duration::from_secs_f32(1.0 / detector_hz as f32);
            let mut interval = tokio::time::interval(period);
            let mut step: u32 = 0;
            loop {
                interval.tick().await;
                let t = step as f32 / detector_hz as f32;
                let sample = if t % 4.0 >= 3.0 {
                    None
                } else {
                    let x = 0.5 + 0.25 * (t * std::f32::consts::PI).sin();
                    Some(FaceSample::new([x, 0.45], 0.12, 0.95))
                };
                sender.publish(sample);
                if sender.is_closed() {
                    break;
                }
                step += 1;
            }
        });

        println!("frame  status          x        y        z     offset_x");
        let mut interval = tokio::time::interval(Duration::from_secs_f32(1.0 / fps as f32));
        for frame in 0..frames {
            interval.tick().await;
            let update = tracker.tick();
            update_off_axis_projection(&mut camera, update.position, &config.screen, config.clip);
            let offset = update.position.normalized_offset(&config.screen);
            println!(
                "{:5}  {:<14} {:8.2} {:8.2} {:8.2} {:8.3}",
                frame,
                status_label(update.status),
                update.position.x,
                update.position.y,
                update.position.z,
                offset[0]
            );
        }

        drop(tracker);
        detector.abort();

        Ok::<(), Box<dyn std::error::Error>>(())
    })?;

    Ok(())
}

fn status_label(status: SampleStatus) -> &'static str {
    match status {
        SampleStatus::Fresh => "fresh",
        SampleStatus::Unchanged => "held",
        SampleStatus::NoFace => "no-face",
        SampleStatus::LowConfidence => "low-confidence",
        SampleStatus::Disconnected => "disconnected",
    }
}

/// Print or reset the stored configuration
pub fn config(reset: bool) -> Result<(), Box<dyn std::error::Error>> {
    if reset {
        let path = Config::default().save()?;
        println!("Configuration reset: {}", path.display());
        return Ok(());
    }

    let config = Config::load();
    match Config::default_path() {
        Some(path) => println!("# {}", path.display()),
        None => println!("# (no config directory)"),
    }
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

/// Get default render output directory
fn get_default_render_dir() -> PathBuf {
    dirs::picture_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join(DEFAULT_SAVE_FOLDER)
}
