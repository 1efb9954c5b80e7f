// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants
//!
//! Physical ranges, tracking assumptions and parallax defaults live here so
//! the estimator, config layer and renderers clamp against the same numbers.

use std::ops::RangeInclusive;

// === Viewer tracking ===

/// Estimated viewer distance is clamped into this range (cm) to reject outliers
pub const VIEWER_Z_MIN_CM: f32 = 30.0;
pub const VIEWER_Z_MAX_CM: f32 = 150.0;

/// Horizontal field-of-view factor of the tracking webcam: `2 * tan(hfov / 2)`.
///
/// A typical laptop webcam covers about 60 degrees horizontally, so the
/// visible field at distance `z` is roughly `z * 1.1547` wide.
pub const CAMERA_FOV_FACTOR: f32 = 1.154_700_5;

/// Samples below this detector confidence are treated as absent
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.5;

// === Calibration ranges ===

pub const SCREEN_WIDTH_CM_RANGE: RangeInclusive<f32> = 20.0..=80.0;
pub const VIEWING_DISTANCE_CM_RANGE: RangeInclusive<f32> = 30.0..=120.0;
pub const IPD_CM_RANGE: RangeInclusive<f32> = 5.0..=8.0;
pub const SMOOTHING_FACTOR_RANGE: RangeInclusive<f32> = 0.05..=0.8;

pub const DEFAULT_SCREEN_WIDTH_CM: f32 = 34.5;
/// 16:10 laptop panel
pub const DEFAULT_SCREEN_ASPECT: f32 = 1.6;
pub const DEFAULT_VIEWING_DISTANCE_CM: f32 = 60.0;
pub const DEFAULT_IPD_CM: f32 = 6.3;
pub const DEFAULT_SMOOTHING_FACTOR: f32 = 0.3;

// === Projection ===

pub const DEFAULT_NEAR_CM: f32 = 1.0;
pub const DEFAULT_FAR_CM: f32 = 1000.0;

// === Parallax ===

pub const FOCUS_DISTANCE_RANGE: RangeInclusive<f32> = 0.0..=1.0;
pub const EDGE_FADE_RANGE: RangeInclusive<f32> = 0.0..=0.2;
pub const DEPTH_SMOOTHING_RANGE: RangeInclusive<f32> = 0.0..=0.5;
pub const NUM_LAYERS_RANGE: RangeInclusive<u32> = 2..=4;
pub const STRENGTH_RANGE: RangeInclusive<f32> = 0.0..=1.0;
pub const DEPTH_SCALE_RANGE: RangeInclusive<f32> = 0.0..=5.0;
pub const FEATHER_WIDTH_RANGE: RangeInclusive<f32> = 0.0..=0.25;
pub const LAYER_SPACING_CM_RANGE: RangeInclusive<f32> = 0.0..=50.0;

pub const DEFAULT_STRENGTH: f32 = 0.1;
pub const DEFAULT_DEPTH_SCALE: f32 = 1.0;
pub const DEFAULT_FOCUS_DISTANCE: f32 = 0.5;
pub const DEFAULT_EDGE_FADE: f32 = 0.05;
pub const DEFAULT_DEPTH_SMOOTHING: f32 = 0.1;
pub const DEFAULT_NUM_LAYERS: u32 = 3;
pub const DEFAULT_FEATHER_WIDTH: f32 = 0.05;
pub const DEFAULT_LAYER_SPACING_CM: f32 = 5.0;

/// Displaced UVs stay this far inside the texture to avoid edge bleed
pub const UV_EPSILON: f32 = 0.001;

/// Depth blur radius in texels per unit of `depth_smoothing`
pub const DEPTH_BLUR_TEXELS_PER_UNIT: f32 = 5.0;

/// Blur radii below this sample the depth texture once
pub const DEPTH_BLUR_MIN_RADIUS: f32 = 0.01;

/// Depth value used when no depth texture is bound (mid-range, no parallax at default focus)
pub const FLAT_DEPTH: f32 = 0.5;

/// Clamp a float into a range, mapping NaN to the lower bound
pub fn clamp_range(value: f32, range: &RangeInclusive<f32>) -> f32 {
    if value.is_nan() {
        return *range.start();
    }
    value.clamp(*range.start(), *range.end())
}
