//! Adaptive timescale controller
//!
//! Keeps roughly `buffer_time` worth of received snapshots ahead of the
//! local timeline. Only the smoothed drift drives speed changes; a single
//! early or late packet swings the raw drift far too much to act on.

use mirage_core::{ReplicaConfig, ServerTime};
use tracing::debug;

use crate::ExponentialMovingAverage;

/// Playback speed regime
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlaybackMode {
    /// Timescale 1.0
    #[default]
    Nominal,
    /// Buffer running fat, consuming faster
    CatchingUp,
    /// Buffer running thin, consuming slower
    SlowingDown,
}

/// Buffer-time multiplier that absorbs the measured delivery jitter:
/// one send interval plus one standard deviation, expressed in send
/// intervals, plus a fixed tolerance.
pub fn dynamic_adjustment(send_interval: f64, jitter_std_dev: f64, tolerance: f64) -> f64 {
    let interval_with_jitter = send_interval + jitter_std_dev;
    interval_with_jitter / send_interval + tolerance
}

/// Timescale controller for one replica
#[derive(Clone, Debug)]
pub struct TimescaleController {
    /// Smoothed drift (seconds)
    drift_ema: ExponentialMovingAverage,
    /// Seconds between snapshots
    send_interval: f64,
    /// Configured lookahead multiplier
    base_multiplier: f64,
    /// Lookahead multiplier currently in effect
    multiplier: f64,
    /// Recompute the multiplier from delivery jitter
    dynamic: bool,
    /// Safety margin for dynamic adjustment (send intervals)
    tolerance: f64,
    catchup_speed: f64,
    slowdown_speed: f64,
    /// Catch-up threshold (seconds)
    positive_threshold: f64,
    /// Slow-down threshold (seconds)
    negative_threshold: f64,
    /// Current regime
    mode: PlaybackMode,
}

impl TimescaleController {
    pub fn new(config: &ReplicaConfig) -> Self {
        let settings = config.snapshot();
        TimescaleController {
            drift_ema: ExponentialMovingAverage::new(config.drift_ema_samples()),
            send_interval: config.send_interval(),
            base_multiplier: settings.buffer_time_multiplier,
            multiplier: settings.buffer_time_multiplier,
            dynamic: settings.dynamic_adjustment,
            tolerance: settings.dynamic_adjustment_tolerance,
            catchup_speed: settings.catchup_speed,
            slowdown_speed: settings.slowdown_speed,
            positive_threshold: config.positive_threshold_secs(),
            negative_threshold: config.negative_threshold_secs(),
            mode: PlaybackMode::Nominal,
        }
    }

    /// Target lookahead in seconds
    #[inline]
    pub fn buffer_time(&self) -> f64 {
        self.send_interval * self.multiplier
    }

    /// Lookahead multiplier currently in effect
    #[inline]
    pub fn buffer_time_multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Re-derive the lookahead from delivery jitter, if enabled
    pub fn adapt_buffer_time(&mut self, jitter_std_dev: f64) {
        if self.dynamic {
            self.multiplier = dynamic_adjustment(self.send_interval, jitter_std_dev, self.tolerance);
        }
    }

    /// Feed the current lookahead into the drift average and pick a timescale.
    ///
    /// `drift = (newest - local_time) - buffer_time`: positive means more
    /// buffer banked than needed, negative means starvation is near.
    pub fn adjust(&mut self, newest: ServerTime, local_time: f64) -> f64 {
        let drift = (newest.as_secs_f64() - local_time) - self.buffer_time();
        let smoothed = self.drift_ema.update(drift);

        let mode = if smoothed > self.positive_threshold {
            PlaybackMode::CatchingUp
        } else if smoothed < self.negative_threshold {
            PlaybackMode::SlowingDown
        } else {
            PlaybackMode::Nominal
        };

        if mode != self.mode {
            debug!(
                from = ?self.mode,
                to = ?mode,
                drift = smoothed,
                buffer_time = self.buffer_time(),
                "playback mode changed"
            );
            self.mode = mode;
        }

        self.timescale()
    }

    /// Timescale for the current regime
    pub fn timescale(&self) -> f64 {
        match self.mode {
            PlaybackMode::Nominal => 1.0,
            PlaybackMode::CatchingUp => self.catchup_speed,
            PlaybackMode::SlowingDown => self.slowdown_speed,
        }
    }

    #[inline]
    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    /// Smoothed drift in seconds
    #[inline]
    pub fn drift(&self) -> f64 {
        self.drift_ema.value()
    }

    pub fn drift_ema(&self) -> &ExponentialMovingAverage {
        &self.drift_ema
    }

    pub fn reset(&mut self) {
        self.drift_ema.reset();
        self.multiplier = self.base_multiplier;
        self.mode = PlaybackMode::Nominal;
    }
}
