//! Server runtime - moves the entity and releases snapshots

use mirage_core::{MirageResult, Position, ServerSettings, ServerTime, SnapshotMessage};
use tracing::{debug, info};

use crate::{MotionSource, SnapshotSender};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServerStats {
    pub ticks: u64,
    pub snapshots_sent: u64,
}

/// Authoritative side for one entity
#[derive(Clone, Debug)]
pub struct ServerRuntime<M> {
    motion: M,
    sender: SnapshotSender,
    /// Position sampled on the last tick
    current: Option<Position>,
    stats: ServerStats,
}

impl<M: MotionSource> ServerRuntime<M> {
    pub fn new(motion: M, settings: &ServerSettings) -> MirageResult<Self> {
        let sender = SnapshotSender::from_settings(settings)?;
        info!(
            send_rate = settings.send_rate,
            send_interval_ms = sender.send_interval().as_secs_f64() * 1000.0,
            "server runtime started"
        );
        Ok(ServerRuntime {
            motion,
            sender,
            current: None,
            stats: ServerStats::default(),
        })
    }

    /// Advance the simulation to `now`.
    ///
    /// Samples the motion source and returns the snapshot to broadcast when
    /// the send cadence is due.
    pub fn tick(&mut self, now: ServerTime) -> Option<SnapshotMessage> {
        self.stats.ticks += 1;
        let position = self.motion.position_at(now);
        self.current = Some(position);

        if !self.sender.poll(now) {
            return None;
        }

        self.stats.snapshots_sent += 1;
        debug!(?now, x = position.x, "sending snapshot");
        Some(SnapshotMessage::new(now, position))
    }

    /// Position from the last tick
    pub fn current_position(&self) -> Option<Position> {
        self.current
    }

    pub fn motion(&self) -> &M {
        &self.motion
    }

    pub fn sender(&self) -> &SnapshotSender {
        &self.sender
    }

    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }
}
