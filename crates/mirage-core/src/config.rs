//! Replication settings
//!
//! Settings are plain serde structs so a host can load them from any format.
//! They are only usable once validated into a [`ReplicaConfig`]; invalid
//! combinations are programmer errors and fail at construction.

use serde::{Deserialize, Serialize};

use crate::{MirageError, MirageResult};

/// Server-side settings: snapshot cadence and the motion parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Snapshots sent per second
    pub send_rate: u32,
    /// Ping-pong travel distance (world units)
    pub distance: f32,
    /// Ping-pong travel speed (world units per second)
    pub speed: f32,
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            send_rate: 30,
            distance: 10.0,
            speed: 3.0,
        }
    }
}

impl ServerSettings {
    /// Seconds between two snapshots
    pub fn send_interval(&self) -> f64 {
        1.0 / self.send_rate as f64
    }

    pub fn validate(&self) -> MirageResult<()> {
        if self.send_rate == 0 {
            return Err(MirageError::config("send_rate must be positive"));
        }
        if !(self.distance.is_finite() && self.distance > 0.0) {
            return Err(MirageError::config("distance must be positive and finite"));
        }
        if !self.speed.is_finite() {
            return Err(MirageError::config("speed must be finite"));
        }
        Ok(())
    }
}

/// Client-side snapshot interpolation settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotSettings {
    /// Target lookahead, in send intervals
    pub buffer_time_multiplier: f64,
    /// Maximum number of buffered snapshots
    pub buffer_limit: usize,
    /// Drift EMA window, in seconds worth of snapshots
    pub drift_ema_duration: f64,
    /// Delivery interval EMA window, in seconds worth of snapshots
    pub delivery_time_ema_duration: f64,
    /// Playback timescale while shedding excess buffer (> 1)
    pub catchup_speed: f64,
    /// Playback timescale while rebuilding buffer (< 1)
    pub slowdown_speed: f64,
    /// Drift above which playback catches up, in send intervals (> 0)
    pub catchup_positive_threshold: f64,
    /// Drift below which playback slows down, in send intervals (< 0)
    pub catchup_negative_threshold: f64,
    /// Grow the target lookahead with measured delivery jitter
    pub dynamic_adjustment: bool,
    /// Extra send intervals of safety added by dynamic adjustment
    pub dynamic_adjustment_tolerance: f64,
}

impl Default for SnapshotSettings {
    fn default() -> Self {
        SnapshotSettings {
            buffer_time_multiplier: 2.0,
            buffer_limit: 32,
            drift_ema_duration: 1.0,
            delivery_time_ema_duration: 2.0,
            catchup_speed: 1.02,
            slowdown_speed: 0.96,
            catchup_positive_threshold: 1.0,
            catchup_negative_threshold: -1.0,
            dynamic_adjustment: false,
            dynamic_adjustment_tolerance: 1.0,
        }
    }
}

impl SnapshotSettings {
    /// Smaller lookahead for clean links, reacting faster to drift
    pub fn low_latency() -> Self {
        SnapshotSettings {
            buffer_time_multiplier: 1.5,
            buffer_limit: 16,
            drift_ema_duration: 0.5,
            catchup_positive_threshold: 0.5,
            catchup_negative_threshold: -0.5,
            ..Self::default()
        }
    }

    /// Larger, jitter-adaptive lookahead for lossy mobile links
    pub fn high_jitter() -> Self {
        SnapshotSettings {
            buffer_time_multiplier: 3.0,
            buffer_limit: 64,
            drift_ema_duration: 2.0,
            delivery_time_ema_duration: 4.0,
            dynamic_adjustment: true,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> MirageResult<()> {
        if !(self.buffer_time_multiplier.is_finite() && self.buffer_time_multiplier > 0.0) {
            return Err(MirageError::config(
                "buffer_time_multiplier must be positive and finite",
            ));
        }
        if self.buffer_limit < 2 {
            return Err(MirageError::config(
                "buffer_limit must hold at least two snapshots",
            ));
        }
        if !(self.drift_ema_duration.is_finite() && self.drift_ema_duration > 0.0) {
            return Err(MirageError::config("drift_ema_duration must be positive"));
        }
        if !(self.delivery_time_ema_duration.is_finite() && self.delivery_time_ema_duration > 0.0)
        {
            return Err(MirageError::config(
                "delivery_time_ema_duration must be positive",
            ));
        }
        if !(self.slowdown_speed.is_finite()
            && self.catchup_speed.is_finite()
            && self.slowdown_speed > 0.0
            && self.slowdown_speed < 1.0
            && self.catchup_speed > 1.0)
        {
            return Err(MirageError::InvalidConfig(format!(
                "speeds must satisfy 0 < slowdown_speed < 1 < catchup_speed (got {} / {})",
                self.slowdown_speed, self.catchup_speed
            )));
        }
        if !(self.catchup_negative_threshold.is_finite()
            && self.catchup_positive_threshold.is_finite()
            && self.catchup_negative_threshold < 0.0
            && self.catchup_positive_threshold > 0.0)
        {
            return Err(MirageError::InvalidConfig(format!(
                "thresholds must satisfy negative < 0 < positive (got {} / {})",
                self.catchup_negative_threshold, self.catchup_positive_threshold
            )));
        }
        if !(self.dynamic_adjustment_tolerance.is_finite() && self.dynamic_adjustment_tolerance >= 0.0)
        {
            return Err(MirageError::config(
                "dynamic_adjustment_tolerance must be non-negative",
            ));
        }
        Ok(())
    }
}

/// Unvalidated settings bundle, as loaded from a file
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicationSettings {
    pub server: ServerSettings,
    pub snapshot: SnapshotSettings,
}

impl ReplicationSettings {
    pub fn validate(self) -> MirageResult<ReplicaConfig> {
        ReplicaConfig::new(self.server, self.snapshot)
    }
}

/// Validated replication configuration
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReplicaConfig {
    server: ServerSettings,
    snapshot: SnapshotSettings,
}

impl ReplicaConfig {
    pub fn new(server: ServerSettings, snapshot: SnapshotSettings) -> MirageResult<Self> {
        server.validate()?;
        snapshot.validate()?;
        Ok(ReplicaConfig { server, snapshot })
    }

    pub fn server(&self) -> &ServerSettings {
        &self.server
    }

    pub fn snapshot(&self) -> &SnapshotSettings {
        &self.snapshot
    }

    /// Seconds between two snapshots
    pub fn send_interval(&self) -> f64 {
        self.server.send_interval()
    }

    /// Static target lookahead in seconds
    pub fn buffer_time(&self) -> f64 {
        self.send_interval() * self.snapshot.buffer_time_multiplier
    }

    pub fn buffer_limit(&self) -> usize {
        self.snapshot.buffer_limit
    }

    /// Drift EMA window in samples
    pub fn drift_ema_samples(&self) -> f64 {
        self.server.send_rate as f64 * self.snapshot.drift_ema_duration
    }

    /// Delivery interval EMA window in samples
    pub fn delivery_ema_samples(&self) -> f64 {
        self.server.send_rate as f64 * self.snapshot.delivery_time_ema_duration
    }

    /// Catch-up threshold in seconds
    pub fn positive_threshold_secs(&self) -> f64 {
        self.send_interval() * self.snapshot.catchup_positive_threshold
    }

    /// Slow-down threshold in seconds
    pub fn negative_threshold_secs(&self) -> f64 {
        self.send_interval() * self.snapshot.catchup_negative_threshold
    }
}
