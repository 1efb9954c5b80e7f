// SPDX-License-Identifier: GPL-3.0-only

//! Viewer tracking: detector samples to a stabilized eye position
//!
//! - [`estimator`]: normalized face sample to centimeters
//! - [`smoother`]: per-axis exponential moving average
//! - [`tracker`]: per-frame consumption of the latest detector sample

pub mod estimator;
pub mod smoother;
pub mod tracker;
mod types;

pub use estimator::{estimate_viewer_position, face_tracking_to_viewer_position};
pub use smoother::PositionSmoother;
pub use tracker::{
    SampleSender, SampleStatus, TrackerStats, TrackerUpdate, ViewerTracker, sample_channel,
};
pub use types::{Calibration, FaceSample, ScreenConfig, TrackingConfig, ViewerPosition};
