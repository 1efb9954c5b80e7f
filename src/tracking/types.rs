// SPDX-License-Identifier: GPL-3.0-only

//! Value types shared by tracking, projection and rendering
//!
//! All physical quantities are centimeters. The coordinate frame has the
//! screen rectangle centered on the origin in the z=0 plane, +x to the
//! viewer's right, +y up and +z out of the screen toward the viewer.

use crate::constants::{
    self, DEFAULT_IPD_CM, DEFAULT_SCREEN_ASPECT, DEFAULT_SCREEN_WIDTH_CM,
    DEFAULT_SMOOTHING_FACTOR, DEFAULT_VIEWING_DISTANCE_CM, clamp_range,
};
use serde::{Deserialize, Serialize};

/// Physical size of the display surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    /// Visible width in centimeters
    pub width_cm: f32,
    /// Visible height in centimeters
    pub height_cm: f32,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            width_cm: DEFAULT_SCREEN_WIDTH_CM,
            height_cm: DEFAULT_SCREEN_WIDTH_CM / DEFAULT_SCREEN_ASPECT,
        }
    }
}

impl ScreenConfig {
    pub fn new(width_cm: f32, height_cm: f32) -> Self {
        Self {
            width_cm,
            height_cm,
        }
    }

    /// Derive the screen from the calibrated width and the panel aspect ratio (width / height)
    pub fn from_calibration(calibration: &Calibration, aspect_ratio: f32) -> Self {
        let width_cm = calibration.clamped().screen_width_cm;
        let aspect = if aspect_ratio.is_finite() && aspect_ratio > 0.0 {
            aspect_ratio
        } else {
            DEFAULT_SCREEN_ASPECT
        };
        Self {
            width_cm,
            height_cm: width_cm / aspect,
        }
    }

    /// Both dimensions are finite and strictly positive
    pub fn is_valid(&self) -> bool {
        self.width_cm.is_finite()
            && self.height_cm.is_finite()
            && self.width_cm > 0.0
            && self.height_cm > 0.0
    }

    pub fn half_width(&self) -> f32 {
        self.width_cm * 0.5
    }

    pub fn half_height(&self) -> f32 {
        self.height_cm * 0.5
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width_cm / self.height_cm
    }
}

/// Eye position relative to the screen center (cm)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewerPosition {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Default for ViewerPosition {
    fn default() -> Self {
        Self::centered()
    }
}

impl ViewerPosition {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Viewer straight in front of the screen center at the default distance
    pub const fn centered() -> Self {
        Self::new(0.0, 0.0, DEFAULT_VIEWING_DISTANCE_CM)
    }

    /// Offset normalized by the screen half extents.
    ///
    /// `(±1, ±1)` means the eye sits straight in front of a screen edge.
    /// An invalid screen yields `(0, 0)`.
    pub fn normalized_offset(&self, screen: &ScreenConfig) -> [f32; 2] {
        if !screen.is_valid() {
            return [0.0, 0.0];
        }
        let x = self.x / screen.half_width();
        let y = self.y / screen.half_height();
        [
            if x.is_finite() { x } else { 0.0 },
            if y.is_finite() { y } else { 0.0 },
        ]
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Per-user calibration, owned by the settings layer and persisted
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    /// Physical screen width (cm), 20..=80
    pub screen_width_cm: f32,
    /// Distance at which the viewer usually sits (cm), 30..=120
    pub viewing_distance_cm: f32,
    /// Interpupillary distance (cm), 5..=8
    pub ipd_cm: f32,
    /// EMA weight of the newest sample, 0.05..=0.8
    pub smoothing_factor: f32,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            screen_width_cm: DEFAULT_SCREEN_WIDTH_CM,
            viewing_distance_cm: DEFAULT_VIEWING_DISTANCE_CM,
            ipd_cm: DEFAULT_IPD_CM,
            smoothing_factor: DEFAULT_SMOOTHING_FACTOR,
        }
    }
}

impl Calibration {
    /// Copy with every field clamped into its documented range
    pub fn clamped(&self) -> Self {
        Self {
            screen_width_cm: clamp_range(self.screen_width_cm, &constants::SCREEN_WIDTH_CM_RANGE),
            viewing_distance_cm: clamp_range(
                self.viewing_distance_cm,
                &constants::VIEWING_DISTANCE_CM_RANGE,
            ),
            ipd_cm: clamp_range(self.ipd_cm, &constants::IPD_CM_RANGE),
            smoothing_factor: clamp_range(
                self.smoothing_factor,
                &constants::SMOOTHING_FACTOR_RANGE,
            ),
        }
    }
}

/// Detector gating
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Samples below this confidence count as "no face"
    pub min_confidence: f32,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            min_confidence: constants::DEFAULT_MIN_CONFIDENCE,
        }
    }
}

impl TrackingConfig {
    pub fn clamped(&self) -> Self {
        Self {
            min_confidence: clamp_range(self.min_confidence, &(0.0..=1.0)),
        }
    }
}

/// One detector output in camera-image normalized coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceSample {
    /// Face center, (0,0) = top-left of the camera image, mirrored
    pub face_center: [f32; 2],
    /// Distance between the eyes as a fraction of the image width
    pub eye_distance: f32,
    /// Detector confidence in [0, 1]
    pub confidence: f32,
}

impl FaceSample {
    pub fn new(face_center: [f32; 2], eye_distance: f32, confidence: f32) -> Self {
        Self {
            face_center,
            eye_distance,
            confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_from_calibration() {
        let calibration = Calibration {
            screen_width_cm: 40.0,
            ..Default::default()
        };
        let screen = ScreenConfig::from_calibration(&calibration, 16.0 / 9.0);
        assert_eq!(screen.width_cm, 40.0);
        assert!((screen.height_cm - 22.5).abs() < 1e-4);

        // Bad aspect falls back to the default panel
        let screen = ScreenConfig::from_calibration(&calibration, 0.0);
        assert!((screen.aspect_ratio() - DEFAULT_SCREEN_ASPECT).abs() < 1e-4);
    }

    #[test]
    fn test_normalized_offset() {
        let screen = ScreenConfig::new(40.0, 20.0);
        let viewer = ViewerPosition::new(10.0, -10.0, 60.0);
        assert_eq!(viewer.normalized_offset(&screen), [0.5, -1.0]);

        let broken = ScreenConfig::new(0.0, 20.0);
        assert_eq!(viewer.normalized_offset(&broken), [0.0, 0.0]);
    }

    #[test]
    fn test_calibration_clamped() {
        let calibration = Calibration {
            screen_width_cm: 500.0,
            viewing_distance_cm: 10.0,
            ipd_cm: f32::NAN,
            smoothing_factor: 1.0,
        }
        .clamped();
        assert_eq!(calibration.screen_width_cm, 80.0);
        assert_eq!(calibration.viewing_distance_cm, 30.0);
        assert_eq!(calibration.ipd_cm, 5.0);
        assert_eq!(calibration.smoothing_factor, 0.8);
    }
}
