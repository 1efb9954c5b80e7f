// SPDX-License-Identifier: GPL-3.0-only

//! Face landmark sample to physical eye position
//!
//! Depth comes from the apparent eye spacing (inverse proportion against a
//! calibrated baseline); lateral offsets scale with the camera's visible field
//! at that depth so the result stays roughly distance-invariant.

use super::types::{Calibration, FaceSample, ScreenConfig, ViewerPosition};
use crate::constants::{
    self, CAMERA_FOV_FACTOR, DEFAULT_SCREEN_ASPECT, VIEWER_Z_MAX_CM, VIEWER_Z_MIN_CM, clamp_range,
};

/// Estimate the viewer's eye position in centimeters.
///
/// * `face_center` - normalized face center from the detector, mirrored image
/// * `eye_distance` - normalized eye spacing; `0` yields `baseline_distance_cm`
/// * `screen_width_cm`, `screen_height_cm` - used for the camera field aspect
/// * `ipd_cm` - interpupillary distance, clamped to 5..=8
/// * `baseline_distance_cm` - calibrated viewing distance, clamped to 30..=120
///
/// Never fails. Non-finite inputs fall back to the centered baseline position
/// and the depth is always clamped into `[30, 150]` cm.
pub fn face_tracking_to_viewer_position(
    face_center: [f32; 2],
    eye_distance: f32,
    screen_width_cm: f32,
    screen_height_cm: f32,
    ipd_cm: f32,
    baseline_distance_cm: f32,
) -> ViewerPosition {
    let ipd_cm = clamp_range(ipd_cm, &constants::IPD_CM_RANGE);
    let baseline_distance_cm =
        clamp_range(baseline_distance_cm, &constants::VIEWING_DISTANCE_CM_RANGE);

    // Mirrored camera image: flip so that moving right in the room is +x,
    // and image rows grow downward so flip y as well.
    let offset_x = 0.5 - normalized_coordinate(face_center[0]);
    let offset_y = 0.5 - normalized_coordinate(face_center[1]);

    let z = if eye_distance.is_finite() && eye_distance > 0.0 {
        let expected_eye_distance = ipd_cm / (baseline_distance_cm * CAMERA_FOV_FACTOR);
        baseline_distance_cm * (expected_eye_distance / eye_distance)
    } else {
        baseline_distance_cm
    };
    let z = z.clamp(VIEWER_Z_MIN_CM, VIEWER_Z_MAX_CM);

    let field_width = z * CAMERA_FOV_FACTOR;
    let field_height = field_width / camera_aspect(screen_width_cm, screen_height_cm);

    ViewerPosition::new(offset_x * field_width, offset_y * field_height, z)
}

/// Convenience wrapper taking the calibration and screen structs
pub fn estimate_viewer_position(
    sample: &FaceSample,
    calibration: &Calibration,
    screen: &ScreenConfig,
) -> ViewerPosition {
    face_tracking_to_viewer_position(
        sample.face_center,
        sample.eye_distance,
        screen.width_cm,
        screen.height_cm,
        calibration.ipd_cm,
        calibration.viewing_distance_cm,
    )
}

#[inline]
fn normalized_coordinate(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.5
    }
}

/// The webcam sits on the display bezel; its field aspect follows the panel
fn camera_aspect(width_cm: f32, height_cm: f32) -> f32 {
    let aspect = width_cm / height_cm;
    if aspect.is_finite() && aspect > 0.0 {
        aspect
    } else {
        DEFAULT_SCREEN_ASPECT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: f32 = 34.5;
    const H: f32 = 21.5;

    #[test]
    fn test_zero_eye_distance_returns_baseline() {
        let position = face_tracking_to_viewer_position([0.5, 0.5], 0.0, W, H, 6.3, 60.0);
        assert_eq!(position.z, 60.0);
        assert_eq!(position.x, 0.0);
        assert_eq!(position.y, 0.0);
    }

    #[test]
    fn test_expected_eye_distance_returns_baseline() {
        let expected = 6.3 / (60.0 * CAMERA_FOV_FACTOR);
        let position = face_tracking_to_viewer_position([0.5, 0.5], expected, W, H, 6.3, 60.0);
        assert!((position.z - 60.0).abs() < 1e-3);
    }

    #[test]
    fn test_closer_face_has_smaller_z() {
        let far = face_tracking_to_viewer_position([0.5, 0.5], 0.08, W, H, 6.3, 60.0);
        let near = face_tracking_to_viewer_position([0.5, 0.5], 0.12, W, H, 6.3, 60.0);
        assert!(near.z < far.z);
    }

    #[test]
    fn test_z_clamped_for_extremes() {
        let tiny = face_tracking_to_viewer_position([0.5, 0.5], 1e-6, W, H, 6.3, 60.0);
        assert_eq!(tiny.z, VIEWER_Z_MAX_CM);

        let huge = face_tracking_to_viewer_position([0.5, 0.5], 10.0, W, H, 6.3, 60.0);
        assert_eq!(huge.z, VIEWER_Z_MIN_CM);
    }

    #[test]
    fn test_mirrored_axes() {
        // Face toward the left of the mirrored image = viewer moved right
        let position = face_tracking_to_viewer_position([0.25, 0.5], 0.0, W, H, 6.3, 60.0);
        assert!(position.x > 0.0);
        assert_eq!(position.y, 0.0);

        // Face high in the image = viewer above center
        let position = face_tracking_to_viewer_position([0.5, 0.25], 0.0, W, H, 6.3, 60.0);
        assert!(position.y > 0.0);
    }

    #[test]
    fn test_lateral_offset_scales_with_depth() {
        let near = face_tracking_to_viewer_position([0.3, 0.5], 0.15, W, H, 6.3, 60.0);
        let far = face_tracking_to_viewer_position([0.3, 0.5], 0.075, W, H, 6.3, 60.0);
        assert!((far.x / near.x - far.z / near.z).abs() < 1e-4);
    }

    #[test]
    fn test_non_finite_input_is_safe() {
        let position =
            face_tracking_to_viewer_position([f32::NAN, f32::INFINITY], f32::NAN, W, H, 6.3, 60.0);
        assert_eq!(position, ViewerPosition::new(0.0, 0.0, 60.0));

        let position = face_tracking_to_viewer_position([0.2, 0.8], 0.1, 0.0, 0.0, 6.3, 60.0);
        assert!(position.is_finite());
    }
}
