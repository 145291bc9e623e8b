//! Motion sources

use mirage_core::{Position, ServerSettings, ServerTime};

/// Anything the server can sample for an authoritative position
pub trait MotionSource {
    fn position_at(&self, time: ServerTime) -> Position;
}

/// Back-and-forth sweep along the x axis.
///
/// Travels `distance` units at `speed` units per second, centred on
/// `origin`, reversing direction at each end.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PingPong {
    pub origin: Position,
    pub distance: f32,
    pub speed: f32,
}

impl PingPong {
    pub fn new(origin: Position, distance: f32, speed: f32) -> Self {
        PingPong {
            origin,
            distance,
            speed,
        }
    }

    /// Build from server settings, starting at `origin`
    pub fn from_settings(origin: Position, settings: &ServerSettings) -> Self {
        Self::new(origin, settings.distance, settings.speed)
    }

    /// Signed offset from origin along x, in `[-distance/2, distance/2)`
    pub fn offset_at(&self, time: ServerTime) -> f32 {
        if self.distance <= 0.0 {
            return 0.0;
        }
        let travelled = time.as_secs_f64() * f64::from(self.speed);
        let cycles = travelled / f64::from(self.distance);
        let repeat = cycles.floor();
        let phase = (cycles - repeat) - 0.5;

        let offset = if repeat.rem_euclid(2.0) == 0.0 {
            phase
        } else {
            -phase
        };
        (offset * f64::from(self.distance)) as f32
    }
}

impl MotionSource for PingPong {
    fn position_at(&self, time: ServerTime) -> Position {
        self.origin + Position::new(self.offset_at(time), 0.0, 0.0)
    }
}

/// Constant position, useful as a baseline
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stationary(pub Position);

impl MotionSource for Stationary {
    fn position_at(&self, _time: ServerTime) -> Position {
        self.0
    }
}
