//! Snapshots - timestamped payloads produced by the authoritative server

use serde::{Deserialize, Serialize};

use crate::{ReceiveTime, ServerTime};

/// Payloads that can be blended between two snapshots.
///
/// The playback time math only ever produces a fraction `t` in `[0, 1]`;
/// how that fraction is applied is up to the payload.
pub trait Interpolate: Clone {
    fn interpolate(from: &Self, to: &Self, t: f64) -> Self;
}

/// 3D position in world units
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub const ZERO: Position = Position { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Linear interpolation
    pub fn lerp(&self, other: &Position, t: f32) -> Position {
        Position {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
            z: self.z + (other.z - self.z) * t,
        }
    }

    /// Distance to another position
    pub fn distance(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl std::ops::Add for Position {
    type Output = Position;

    fn add(self, rhs: Position) -> Position {
        Position::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Interpolate for Position {
    fn interpolate(from: &Self, to: &Self, t: f64) -> Self {
        from.lerp(to, t as f32)
    }
}

/// Immutable snapshot of one entity at one server instant.
///
/// `server_time` is the sort and dedup key on the client. `received_time`
/// is zero until the client admits the snapshot and stamps its arrival.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<P> {
    pub server_time: ServerTime,
    pub received_time: ReceiveTime,
    pub payload: P,
}

/// The snapshot type replicated by the ping-pong server
pub type PositionSnapshot = Snapshot<Position>;

impl<P> Snapshot<P> {
    pub fn new(server_time: ServerTime, payload: P) -> Self {
        Snapshot {
            server_time,
            received_time: ReceiveTime::ZERO,
            payload,
        }
    }

    /// Stamp the client-local arrival time
    pub fn with_received_time(mut self, received_time: ReceiveTime) -> Self {
        self.received_time = received_time;
        self
    }
}

impl<P: Interpolate> Snapshot<P> {
    /// Blend the payloads of two snapshots
    pub fn interpolate(from: &Snapshot<P>, to: &Snapshot<P>, t: f64) -> P {
        P::interpolate(&from.payload, &to.payload, t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_lerp() {
        let a = Position::new(0.0, 0.0, 0.0);
        let b = Position::new(2.0, -4.0, 8.0);

        assert_eq!(a.lerp(&b, 0.0), a);
        assert_eq!(a.lerp(&b, 1.0), b);
        assert_eq!(a.lerp(&b, 0.5), Position::new(1.0, -2.0, 4.0));
    }

    #[test]
    fn test_snapshot_interpolate_uses_payload_law() {
        let from = Snapshot::new(ServerTime::from_millis(0), Position::new(1.0, 0.0, 0.0));
        let to = Snapshot::new(ServerTime::from_millis(10), Position::new(3.0, 0.0, 0.0));

        let mid = Snapshot::interpolate(&from, &to, 0.25);
        assert!((mid.x - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_received_time_stamp() {
        let snap = Snapshot::new(ServerTime::from_millis(5), Position::ZERO)
            .with_received_time(ReceiveTime::from_millis(42));

        assert_eq!(snap.received_time, ReceiveTime::from_millis(42));
        assert_eq!(snap.server_time, ServerTime::from_millis(5));
    }
}
