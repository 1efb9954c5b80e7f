// SPDX-License-Identifier: GPL-3.0-only

//! Off-axis projection for a physical window
//!
//! The screen is a fixed rectangle in the z=0 plane. The camera sits at the
//! tracked eye and looks straight down -z (perpendicular to the screen), while
//! the frustum is skewed so its near-plane bounds pass through the four screen
//! corners. Content at true physical depth behind the screen then lines up
//! as if seen through a real window.

use crate::constants::{DEFAULT_FAR_CM, DEFAULT_NEAR_CM};
use crate::tracking::{ScreenConfig, ViewerPosition};
use nalgebra::{Isometry3, Matrix4, Point3, Vector3, Vector4};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Near/far clip distances along the view direction (cm)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipPlanes {
    pub near: f32,
    pub far: f32,
}

impl Default for ClipPlanes {
    fn default() -> Self {
        Self {
            near: DEFAULT_NEAR_CM,
            far: DEFAULT_FAR_CM,
        }
    }
}

impl ClipPlanes {
    pub fn is_valid(&self) -> bool {
        self.near.is_finite() && self.far.is_finite() && self.near > 0.0 && self.far > self.near
    }
}

/// Near-plane bounds of an asymmetric frustum
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
    pub near: f32,
    pub far: f32,
}

impl Frustum {
    /// Project the screen corners through the eye onto the near plane.
    ///
    /// Returns `None` for degenerate input (eye at or behind the screen,
    /// invalid screen or clip planes).
    pub fn off_axis(eye: ViewerPosition, screen: &ScreenConfig, clip: ClipPlanes) -> Option<Self> {
        if !eye.is_finite() || eye.z <= 0.0 || !screen.is_valid() || !clip.is_valid() {
            return None;
        }

        let scale = clip.near / eye.z;
        let half_width = screen.half_width();
        let half_height = screen.half_height();

        Some(Self {
            left: (-half_width - eye.x) * scale,
            right: (half_width - eye.x) * scale,
            bottom: (-half_height - eye.y) * scale,
            top: (half_height - eye.y) * scale,
            near: clip.near,
            far: clip.far,
        })
    }

    /// Off-center perspective matrix, right-handed, clip depth in [0, 1]
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        let Self {
            left: l,
            right: r,
            bottom: b,
            top: t,
            near: n,
            far: f,
        } = *self;

        let r_width = 1.0 / (r - l);
        let r_height = 1.0 / (t - b);
        let r_depth = 1.0 / (n - f);

        #[rustfmt::skip]
        let matrix = Matrix4::new(
            2.0 * n * r_width, 0.0,               (r + l) * r_width,  0.0,
            0.0,               2.0 * n * r_height, (t + b) * r_height, 0.0,
            0.0,               0.0,               f * r_depth,        n * f * r_depth,
            0.0,               0.0,               -1.0,               0.0,
        );
        matrix
    }

    /// True when the frustum is centered on the optical axis
    pub fn is_symmetric(&self) -> bool {
        self.left == -self.right && self.bottom == -self.top
    }
}

/// Camera whose gaze stays perpendicular to the screen
#[derive(Debug, Clone)]
pub struct OffAxisCamera {
    position: Point3<f32>,
    target: Point3<f32>,
    frustum: Frustum,
    projection: Matrix4<f32>,
    projection_inverse: Matrix4<f32>,
    view: Matrix4<f32>,
    world: Matrix4<f32>,
}

impl Default for OffAxisCamera {
    fn default() -> Self {
        Self::new(ViewerPosition::centered(), &ScreenConfig::default(), ClipPlanes::default())
    }
}

impl OffAxisCamera {
    /// Build a camera for `eye`. Degenerate input falls back to the centered default viewer.
    pub fn new(eye: ViewerPosition, screen: &ScreenConfig, clip: ClipPlanes) -> Self {
        let mut camera = Self {
            position: Point3::origin(),
            target: Point3::origin(),
            frustum: Frustum {
                left: -1.0,
                right: 1.0,
                bottom: -1.0,
                top: 1.0,
                near: DEFAULT_NEAR_CM,
                far: DEFAULT_FAR_CM,
            },
            projection: Matrix4::identity(),
            projection_inverse: Matrix4::identity(),
            view: Matrix4::identity(),
            world: Matrix4::identity(),
        };
        if !update_off_axis_projection(&mut camera, eye, screen, clip) {
            update_off_axis_projection(
                &mut camera,
                ViewerPosition::centered(),
                &ScreenConfig::default(),
                ClipPlanes::default(),
            );
        }
        camera
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    /// Point the camera looks at: the eye projected onto the screen plane
    pub fn target(&self) -> Point3<f32> {
        self.target
    }

    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    pub fn projection(&self) -> &Matrix4<f32> {
        &self.projection
    }

    pub fn projection_inverse(&self) -> &Matrix4<f32> {
        &self.projection_inverse
    }

    /// World-to-camera transform
    pub fn view(&self) -> &Matrix4<f32> {
        &self.view
    }

    /// Camera-to-world transform
    pub fn world(&self) -> &Matrix4<f32> {
        &self.world
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection * self.view
    }

    /// Column-major view-projection for GPU uniforms
    pub fn view_projection_columns(&self) -> [[f32; 4]; 4] {
        self.view_projection().into()
    }

    /// Transform a world point to normalized device coordinates
    pub fn project(&self, point: Point3<f32>) -> Option<Point3<f32>> {
        let clip = self.view_projection() * Vector4::new(point.x, point.y, point.z, 1.0);
        if clip.w.abs() <= f32::EPSILON {
            return None;
        }
        Some(Point3::new(clip.x / clip.w, clip.y / clip.w, clip.z / clip.w))
    }
}

/// Recompute the camera for a new eye position.
///
/// Leaves the camera untouched and returns `false` when `viewer.z <= 0` or
/// the screen/clip planes are degenerate.
pub fn update_off_axis_projection(
    camera: &mut OffAxisCamera,
    viewer: ViewerPosition,
    screen: &ScreenConfig,
    clip: ClipPlanes,
) -> bool {
    let Some(frustum) = Frustum::off_axis(viewer, screen, clip) else {
        debug!(?viewer, ?screen, ?clip, "Skipping off-axis update for degenerate input");
        return false;
    };

    let projection = frustum.projection_matrix();
    let Some(projection_inverse) = projection.try_inverse() else {
        debug!(?frustum, "Off-axis projection is not invertible");
        return false;
    };

    let position = Point3::new(viewer.x, viewer.y, viewer.z);
    let target = Point3::new(viewer.x, viewer.y, 0.0);
    let isometry = Isometry3::look_at_rh(&position, &target, &Vector3::y());

    camera.position = position;
    camera.target = target;
    camera.frustum = frustum;
    camera.projection = projection;
    camera.projection_inverse = projection_inverse;
    camera.view = isometry.to_homogeneous();
    camera.world = isometry.inverse().to_homogeneous();
    true
}
