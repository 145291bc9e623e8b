//! Time primitives for MIRAGE replication
//!
//! Two clocks never meet directly:
//! - ServerTime: the authoritative server's clock, stamped on every snapshot
//! - ReceiveTime: the observing client's monotonic clock, stamped on arrival
//!
//! The client's virtual playback time lives in plain `f64` seconds on the
//! same axis as ServerTime and is only ever related to it through the
//! snapshots themselves.

use std::ops::{Add, Sub};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Server time - authoritative capture time of a snapshot
/// Represented as microseconds since the server's epoch
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct ServerTime(pub i64);

impl ServerTime {
    pub const ZERO: ServerTime = ServerTime(0);
    pub const MAX: ServerTime = ServerTime(i64::MAX);
    pub const MIN: ServerTime = ServerTime(i64::MIN);

    #[inline]
    pub fn from_micros(micros: i64) -> Self {
        ServerTime(micros)
    }

    #[inline]
    pub fn from_millis(millis: i64) -> Self {
        ServerTime(millis * 1000)
    }

    /// Rounds to the nearest microsecond so that `1.0 / 30.0` style
    /// intervals land on stable keys.
    #[inline]
    pub fn from_secs_f64(secs: f64) -> Self {
        ServerTime((secs * 1_000_000.0).round() as i64)
    }

    #[inline]
    pub fn as_micros(self) -> i64 {
        self.0
    }

    #[inline]
    pub fn as_millis(self) -> i64 {
        self.0 / 1000
    }

    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }

    /// Signed distance to an earlier time, in seconds.
    /// Taken in `f64` so times at opposite ends of the axis cannot overflow.
    #[inline]
    pub fn secs_since(self, earlier: ServerTime) -> f64 {
        (self.0 as f64 - earlier.0 as f64) / 1_000_000.0
    }

    #[inline]
    pub fn saturating_add(self, duration: Duration) -> Self {
        ServerTime(self.0.saturating_add(duration.as_micros() as i64))
    }

    #[inline]
    pub fn saturating_sub(self, duration: Duration) -> Self {
        ServerTime(self.0.saturating_sub(duration.as_micros() as i64))
    }
}

impl Add<Duration> for ServerTime {
    type Output = ServerTime;

    #[inline]
    fn add(self, rhs: Duration) -> Self::Output {
        self.saturating_add(rhs)
    }
}

impl Sub<Duration> for ServerTime {
    type Output = ServerTime;

    #[inline]
    fn sub(self, rhs: Duration) -> Self::Output {
        self.saturating_sub(rhs)
    }
}

impl Sub<ServerTime> for ServerTime {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: ServerTime) -> Self::Output {
        Duration::from_micros(self.0.saturating_sub(rhs.0).max(0) as u64)
    }
}

impl std::fmt::Debug for ServerTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ts({:.3}ms)", self.0 as f64 / 1000.0)
    }
}

/// Receive time - client-local monotonic arrival time
/// Represented as microseconds since the client clock started
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct ReceiveTime(pub u64);

impl ReceiveTime {
    pub const ZERO: ReceiveTime = ReceiveTime(0);

    #[inline]
    pub fn from_micros(micros: u64) -> Self {
        ReceiveTime(micros)
    }

    #[inline]
    pub fn from_millis(millis: u64) -> Self {
        ReceiveTime(millis * 1000)
    }

    #[inline]
    pub fn from_secs_f64(secs: f64) -> Self {
        ReceiveTime((secs.max(0.0) * 1_000_000.0).round() as u64)
    }

    #[inline]
    pub fn as_micros(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }

    #[inline]
    pub fn saturating_add(self, duration: Duration) -> Self {
        ReceiveTime(self.0.saturating_add(duration.as_micros() as u64))
    }
}

impl Add<Duration> for ReceiveTime {
    type Output = ReceiveTime;

    #[inline]
    fn add(self, rhs: Duration) -> Self::Output {
        self.saturating_add(rhs)
    }
}

impl Sub<ReceiveTime> for ReceiveTime {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: ReceiveTime) -> Self::Output {
        Duration::from_micros(self.0.saturating_sub(rhs.0))
    }
}

impl std::fmt::Debug for ReceiveTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tr({:.3}ms)", self.0 as f64 / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_time_rounds_fractional_intervals() {
        let interval = 1.0 / 30.0;
        assert_eq!(ServerTime::from_secs_f64(interval).as_micros(), 33_333);
        assert_eq!(ServerTime::from_secs_f64(2.0 * interval).as_micros(), 66_667);
    }

    #[test]
    fn test_server_time_signed_distance() {
        let a = ServerTime::from_millis(100);
        let b = ServerTime::from_millis(150);

        assert!((b.secs_since(a) - 0.05).abs() < 1e-9);
        assert!((a.secs_since(b) + 0.05).abs() < 1e-9);
        // Duration subtraction saturates
        assert_eq!(a - b, Duration::ZERO);
    }

    #[test]
    fn test_server_time_distance_across_whole_axis() {
        let early = ServerTime::from_micros(i64::MIN + 10);
        let late = ServerTime::from_micros(i64::MAX - 10);

        let span = late.secs_since(early);
        assert!(span.is_finite() && span > 1.8e13);
        assert!(early.secs_since(late) < 0.0);

        assert_eq!(early - late, Duration::ZERO);
        assert_eq!(late - early, Duration::from_micros(i64::MAX as u64));
        assert_eq!(ServerTime::MAX + Duration::from_secs(1), ServerTime::MAX);
        assert_eq!(ServerTime::MIN - Duration::from_secs(1), ServerTime::MIN);
    }

    #[test]
    fn test_receive_time_monotonic() {
        let t1 = ReceiveTime::from_millis(100);
        let t2 = t1 + Duration::from_millis(10);

        assert!(t2 > t1);
        assert_eq!(t2 - t1, Duration::from_millis(10));
        assert_eq!(t1 - t2, Duration::ZERO);
    }

    #[test]
    fn test_receive_time_clamps_negative_seconds() {
        assert_eq!(ReceiveTime::from_secs_f64(-1.0), ReceiveTime::ZERO);
    }
}
