//! Client replica - snapshot playback for one observed entity
//!
//! Owns the buffer, the local timeline and both EMAs. Everything happens
//! synchronously in "receive, then tick" order; nothing is shared across
//! entities or connections.

use mirage_core::{
    Interpolate, Position, ReceiveTime, ReplicaConfig, ServerTime, Snapshot, SnapshotMessage,
};
use tracing::info;

use crate::{
    admit, Admission, DeliveryModel, Interpolator, PlaybackClock, PlaybackMode, Sample,
    SnapshotBuffer, StepOutcome, TimescaleController,
};

/// Counters for one replica
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplicaStats {
    pub ticks: u64,
    pub inserted: u64,
    pub replaced: u64,
    pub stale: u64,
    pub overflow: u64,
    pub interpolating: u64,
    pub holding: u64,
    pub starved: u64,
}

/// Per-entity replication instance on the observing client
pub struct ClientReplica<P> {
    /// Validated configuration
    config: ReplicaConfig,
    /// Not-yet-consumed snapshots
    buffer: SnapshotBuffer<P>,
    /// Local virtual timeline
    clock: PlaybackClock,
    /// Bracket selection and consumption floor
    interpolator: Interpolator,
    /// Drift EMA and timescale choice
    controller: TimescaleController,
    /// Delivery interval EMA
    delivery: DeliveryModel,
    /// Last interpolated payload
    last_value: Option<P>,
    stats: ReplicaStats,
}

impl<P: Interpolate> ClientReplica<P> {
    /// Create a replica for a newly observed entity
    pub fn new(config: ReplicaConfig) -> Self {
        let settings = config.snapshot();
        ClientReplica {
            buffer: SnapshotBuffer::new(config.buffer_limit()),
            clock: PlaybackClock::new(settings.slowdown_speed, settings.catchup_speed),
            interpolator: Interpolator::new(),
            controller: TimescaleController::new(&config),
            delivery: DeliveryModel::new(config.delivery_ema_samples()),
            last_value: None,
            stats: ReplicaStats::default(),
            config,
        }
    }

    /// Admit an arriving snapshot, already stamped with its receive time.
    ///
    /// A snapshot with a new server time also re-tunes the timeline right
    /// away, so bursts are absorbed without waiting for the next tick.
    pub fn receive(&mut self, snapshot: Snapshot<P>) -> Admission {
        let was_empty = self.buffer.is_empty();
        let server_time = snapshot.server_time;
        let received = snapshot.received_time;

        let cursor = self.interpolator.cursor(&self.clock);
        let outcome = admit(&mut self.buffer, snapshot, cursor);

        match outcome {
            Admission::Inserted => self.stats.inserted += 1,
            Admission::Replaced => self.stats.replaced += 1,
            Admission::Stale => self.stats.stale += 1,
            Admission::Overflow => self.stats.overflow += 1,
        }

        // Duplicates carry no new timing information
        if outcome != Admission::Inserted {
            return outcome;
        }

        self.delivery.record_arrival(received);
        self.controller.adapt_buffer_time(self.delivery.jitter());
        let buffer_time = self.controller.buffer_time();

        if was_empty {
            // Start playback with exactly the target lookahead
            self.clock.set(server_time.as_secs_f64() - buffer_time);
        }

        if let Some(newest) = self.buffer.newest().map(|s| s.server_time) {
            let newest_secs = newest.as_secs_f64();
            self.clock.clamp(newest_secs - 2.0 * buffer_time, newest_secs);

            let timescale = self.controller.adjust(newest, self.clock.now());
            self.clock.set_rate(timescale);
        }

        outcome
    }

    /// Advance playback by `delta_time` real seconds.
    ///
    /// Returns `None` while nothing has been received; keep rendering
    /// [`Self::last_value`] in that case.
    pub fn tick(&mut self, delta_time: f64) -> Option<Sample<P>> {
        self.stats.ticks += 1;
        let sample = self
            .interpolator
            .step(&mut self.buffer, &mut self.clock, delta_time)?;

        match sample.outcome {
            StepOutcome::Interpolating => self.stats.interpolating += 1,
            StepOutcome::Holding => self.stats.holding += 1,
            StepOutcome::Starved => self.stats.starved += 1,
        }
        self.last_value = Some(sample.value.clone());
        Some(sample)
    }

    /// Drop all playback state, as on (re)connect
    pub fn reset(&mut self) {
        info!(
            buffered = self.buffer.len(),
            local_time = self.clock.now(),
            "resetting replica"
        );
        self.buffer.clear();
        self.clock.reset();
        self.interpolator.reset();
        self.controller.reset();
        self.delivery.reset();
        self.last_value = None;
        self.stats = ReplicaStats::default();
    }

    /// Last interpolated payload, if any tick produced one
    pub fn last_value(&self) -> Option<&P> {
        self.last_value.as_ref()
    }
}

impl ClientReplica<Position> {
    /// Decode-side convenience: stamp a wire message and admit it
    pub fn receive_message(&mut self, message: SnapshotMessage, received: ReceiveTime) -> Admission {
        self.receive(message.into_snapshot(received))
    }
}

impl<P> ClientReplica<P> {
    pub fn config(&self) -> &ReplicaConfig {
        &self.config
    }

    /// Local timeline position (seconds on the server axis)
    pub fn local_time(&self) -> f64 {
        self.clock.now()
    }

    /// Current playback timescale
    pub fn timescale(&self) -> f64 {
        self.clock.rate()
    }

    pub fn mode(&self) -> PlaybackMode {
        self.controller.mode()
    }

    /// Smoothed drift in seconds
    pub fn drift(&self) -> f64 {
        self.controller.drift()
    }

    /// Target lookahead currently in effect (seconds)
    pub fn buffer_time(&self) -> f64 {
        self.controller.buffer_time()
    }

    /// Newest buffered server time minus local time
    pub fn time_ahead(&self) -> Option<f64> {
        self.buffer.time_ahead(self.clock.now())
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn buffer(&self) -> &SnapshotBuffer<P> {
        &self.buffer
    }

    pub fn newest_server_time(&self) -> Option<ServerTime> {
        self.buffer.newest().map(|s| s.server_time)
    }

    pub fn controller(&self) -> &TimescaleController {
        &self.controller
    }

    pub fn delivery(&self) -> &DeliveryModel {
        &self.delivery
    }

    pub fn stats(&self) -> &ReplicaStats {
        &self.stats
    }
}
