// SPDX-License-Identifier: GPL-3.0-only

//! Per-axis exponential smoothing of the viewer position

use super::types::ViewerPosition;
use crate::constants::DEFAULT_SMOOTHING_FACTOR;
use tracing::debug;

/// Single-pole EMA over x, y and z.
///
/// Call [`update`](Self::update) exactly once per newly arrived raw sample.
/// Frames without a fresh sample should read [`current`](Self::current):
/// filtering the same value again would shorten the effective time constant.
#[derive(Debug, Clone)]
pub struct PositionSmoother {
    alpha: f32,
    state: Option<ViewerPosition>,
}

impl Default for PositionSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_SMOOTHING_FACTOR)
    }
}

impl PositionSmoother {
    /// Create a smoother with weight `alpha` for the newest sample (clamped to [0, 1])
    pub fn new(alpha: f32) -> Self {
        let mut smoother = Self {
            alpha: DEFAULT_SMOOTHING_FACTOR,
            state: None,
        };
        smoother.set_alpha(alpha);
        smoother
    }

    /// Feed one raw sample and return the smoothed position.
    ///
    /// The first sample after construction or [`reset`](Self::reset) is
    /// returned unchanged. Non-finite samples are ignored.
    pub fn update(&mut self, raw: ViewerPosition) -> ViewerPosition {
        if !raw.is_finite() {
            debug!(?raw, "Ignoring non-finite viewer sample");
            return self.current();
        }

        let smoothed = match self.state {
            None => raw,
            Some(prev) => {
                let a = self.alpha;
                ViewerPosition::new(
                    a * raw.x + (1.0 - a) * prev.x,
                    a * raw.y + (1.0 - a) * prev.y,
                    a * raw.z + (1.0 - a) * prev.z,
                )
            }
        };
        self.state = Some(smoothed);
        smoothed
    }

    /// Set the newest-sample weight, clamped to [0, 1]. NaN keeps the current weight.
    pub fn set_alpha(&mut self, alpha: f32) {
        if alpha.is_nan() {
            return;
        }
        self.alpha = alpha.clamp(0.0, 1.0);
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Forget the filter state; [`current`](Self::current) reports the centered default
    pub fn reset(&mut self) {
        self.state = None;
    }

    /// Last smoothed position, or the centered default before any sample
    pub fn current(&self) -> ViewerPosition {
        self.state.unwrap_or_else(ViewerPosition::centered)
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }
}
