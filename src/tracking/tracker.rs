// SPDX-License-Identifier: GPL-3.0-only

//! Frame-driven consumption of detector samples
//!
//! The detector publishes into a latest-value channel at its own cadence.
//! The render loop calls [`ViewerTracker::tick`] once per display refresh and
//! never blocks: a fresh sample advances the smoother, anything else holds the
//! last smoothed position.

use super::estimator::estimate_viewer_position;
use super::smoother::PositionSmoother;
use super::types::{Calibration, FaceSample, ScreenConfig, TrackingConfig, ViewerPosition};
use tokio::sync::watch;
use tracing::{debug, info};

/// Detector side of the sample channel
#[derive(Debug, Clone)]
pub struct SampleSender {
    tx: watch::Sender<Option<FaceSample>>,
}

impl SampleSender {
    /// Publish the newest detector result; `None` means no face in view.
    ///
    /// Replaces any value the render loop has not consumed yet.
    pub fn publish(&self, sample: Option<FaceSample>) {
        self.tx.send_replace(sample);
    }

    /// True once the tracker has been dropped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Create a connected sender and tracker input
pub fn sample_channel() -> (SampleSender, watch::Receiver<Option<FaceSample>>) {
    let (tx, rx) = watch::channel(None);
    (SampleSender { tx }, rx)
}

/// What happened during one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleStatus {
    /// A fresh, usable sample advanced the smoother
    Fresh,
    /// Nothing new since the last tick
    Unchanged,
    /// The detector reported no face
    NoFace,
    /// A sample arrived but was below the confidence threshold
    LowConfidence,
    /// The detector side has gone away
    Disconnected,
}

/// Result of [`ViewerTracker::tick`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerUpdate {
    /// Smoothed position to use for this frame
    pub position: ViewerPosition,
    pub status: SampleStatus,
}

/// Running counters, mostly for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerStats {
    pub ticks: u64,
    pub fresh_samples: u64,
    pub rejected_samples: u64,
    pub face_lost_events: u64,
}

/// Estimator + smoother fed from the sample channel
pub struct ViewerTracker {
    receiver: watch::Receiver<Option<FaceSample>>,
    smoother: PositionSmoother,
    calibration: Calibration,
    screen: ScreenConfig,
    config: TrackingConfig,
    last_raw: Option<ViewerPosition>,
    stats: TrackerStats,
    disconnected_logged: bool,
}

impl ViewerTracker {
    pub fn new(
        receiver: watch::Receiver<Option<FaceSample>>,
        calibration: Calibration,
        screen: ScreenConfig,
        config: TrackingConfig,
    ) -> Self {
        let calibration = calibration.clamped();
        Self {
            receiver,
            smoother: PositionSmoother::new(calibration.smoothing_factor),
            calibration,
            screen,
            config: config.clamped(),
            last_raw: None,
            stats: TrackerStats::default(),
            disconnected_logged: false,
        }
    }

    /// Consume the latest sample, if any, and return the position for this frame
    pub fn tick(&mut self) -> TrackerUpdate {
        self.stats.ticks += 1;

        let status = match self.receiver.has_changed() {
            Ok(true) => {
                let sample = *self.receiver.borrow_and_update();
                self.apply(sample)
            }
            Ok(false) => SampleStatus::Unchanged,
            Err(_) => {
                // The last sample sent before the sender dropped is still consumed once
                let pending = {
                    let latest = self.receiver.borrow_and_update();
                    latest.has_changed().then(|| *latest)
                };
                match pending {
                    Some(sample) => self.apply(sample),
                    None => {
                        if !self.disconnected_logged {
                            info!("Face sample source disconnected, holding last position");
                            self.disconnected_logged = true;
                        }
                        SampleStatus::Disconnected
                    }
                }
            }
        };

        TrackerUpdate {
            position: self.smoother.current(),
            status,
        }
    }

    fn apply(&mut self, sample: Option<FaceSample>) -> SampleStatus {
        let Some(sample) = sample else {
            self.stats.face_lost_events += 1;
            return SampleStatus::NoFace;
        };

        if !(sample.confidence >= self.config.min_confidence) {
            self.stats.rejected_samples += 1;
            debug!(
                confidence = sample.confidence,
                threshold = self.config.min_confidence,
                "Rejecting low-confidence face sample"
            );
            return SampleStatus::LowConfidence;
        }

        let raw = estimate_viewer_position(&sample, &self.calibration, &self.screen);
        self.last_raw = Some(raw);
        self.smoother.update(raw);
        self.stats.fresh_samples += 1;
        SampleStatus::Fresh
    }

    /// Replace the calibration; the smoothing factor takes effect immediately
    pub fn set_calibration(&mut self, calibration: Calibration) {
        self.calibration = calibration.clamped();
        self.smoother.set_alpha(self.calibration.smoothing_factor);
    }

    pub fn set_screen(&mut self, screen: ScreenConfig) {
        self.screen = screen;
    }

    pub fn set_tracking_config(&mut self, config: TrackingConfig) {
        self.config = config.clamped();
    }

    /// Drop the filter state; the next fresh sample is taken as-is
    pub fn reset(&mut self) {
        self.smoother.reset();
        self.last_raw = None;
    }

    pub fn position(&self) -> ViewerPosition {
        self.smoother.current()
    }

    /// Unsmoothed estimate from the most recent accepted sample
    pub fn last_raw(&self) -> Option<ViewerPosition> {
        self.last_raw
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn screen(&self) -> &ScreenConfig {
        &self.screen
    }

    pub fn stats(&self) -> TrackerStats {
        self.stats
    }
}
