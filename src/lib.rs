// SPDX-License-Identifier: MPL-2.0

//! Virtual Window - head-tracked depth parallax for a flat display
//!
//! A face detector reports where the viewer's head is; this library turns
//! that into a stabilized eye position, an off-axis projection for the
//! physical screen rectangle, and depth-driven image displacement so a still
//! picture reads like a view through a window.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`tracking`]: Face samples to smoothed viewer positions
//! - [`projection`]: Off-axis (asymmetric) frustum camera
//! - [`render`]: Single-plane and layered parallax renderers, CPU preview
//! - [`shaders`]: WGSL sources used by the renderers
//! - [`assets`]: Color, depth and mask decoding with generated fallbacks
//! - [`window`]: Per-frame orchestration of tracker, camera and renderer
//! - [`config`]: Persisted calibration and parallax settings
//! - [`gpu`]: Headless device creation and texture readback
//!
//! # Example
//!
//! ```ignore
//! let (sender, receiver) = virtual_window::tracking::sample_channel();
//! let mut window = VirtualWindow::new(context, receiver, &Config::load(), format);
//! // detector thread: sender.publish(Some(sample));
//! // every display refresh:
//! window.tick();
//! window.prepare(&queue);
//! window.render(&mut encoder, &view);
//! ```

pub mod assets;
pub mod config;
pub mod constants;
pub mod errors;
pub mod gpu;
pub mod projection;
pub mod render;
pub mod shaders;
pub mod tracking;
pub mod window;

// Re-export commonly used types
pub use config::Config;
pub use errors::{AppError, AppResult};
pub use projection::{ClipPlanes, OffAxisCamera, update_off_axis_projection};
pub use render::{ParallaxMode, ParallaxRenderer, ParallaxSettings, create_renderer};
pub use tracking::{
    Calibration, FaceSample, ScreenConfig, ViewerPosition, ViewerTracker, sample_channel,
};
pub use window::{FrameState, VirtualWindow};
