//! Clocks for the observing client
//!
//! - `ReceiveClock`: monotonic wall clock used to stamp snapshot arrivals
//! - `FrameTimer`: per-frame real delta time, clamped against stalls
//! - `PlaybackClock`: the local virtual timeline, elastic under timescale

use std::time::{Duration, Instant};

use mirage_core::ReceiveTime;

/// Largest real delta a single frame may report
pub const MAX_FRAME_DELTA: Duration = Duration::from_millis(100);

/// Monotonic arrival clock
/// INVARIANT: successive `now()` calls never go backwards
pub struct ReceiveClock {
    /// Reference to monotonic OS clock
    reference: Instant,
}

impl ReceiveClock {
    /// Create a new receive clock starting at zero
    pub fn new() -> Self {
        ReceiveClock {
            reference: Instant::now(),
        }
    }

    /// Time elapsed since the clock started
    pub fn now(&self) -> ReceiveTime {
        ReceiveTime::from_micros(self.reference.elapsed().as_micros() as u64)
    }
}

impl Default for ReceiveClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Measures real time between frames
pub struct FrameTimer {
    /// Last tick instant
    last_tick: Instant,
}

impl FrameTimer {
    pub fn new() -> Self {
        FrameTimer {
            last_tick: Instant::now(),
        }
    }

    /// Seconds since the previous tick
    pub fn tick(&mut self) -> f64 {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_tick);
        self.last_tick = now;

        // Clamp to prevent large jumps (e.g., after system sleep)
        elapsed.min(MAX_FRAME_DELTA).as_secs_f64()
    }

    /// Real time spent in the current frame so far
    pub fn elapsed(&self) -> Duration {
        self.last_tick.elapsed()
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Local virtual timeline, in seconds on the server's time axis.
/// Advances by `dt * rate`; the rate is bent by the timescale controller.
#[derive(Clone, Debug)]
pub struct PlaybackClock {
    /// Current local time
    value: f64,
    /// Clock rate multiplier (1.0 = real-time)
    rate: f64,
    /// Slowest allowed rate
    min_rate: f64,
    /// Fastest allowed rate
    max_rate: f64,
}

impl PlaybackClock {
    /// Create a clock at zero whose rate stays within `[min_rate, max_rate]`
    pub fn new(min_rate: f64, max_rate: f64) -> Self {
        PlaybackClock {
            value: 0.0,
            rate: 1.0,
            min_rate: min_rate.min(1.0),
            max_rate: max_rate.max(1.0),
        }
    }

    /// Advance by real elapsed seconds, returning the new local time
    pub fn advance(&mut self, dt: f64) -> f64 {
        self.value += dt.max(0.0) * self.rate;
        self.value
    }

    /// Current local time
    #[inline]
    pub fn now(&self) -> f64 {
        self.value
    }

    #[inline]
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Set clock rate, bounded to the configured range
    pub fn set_rate(&mut self, rate: f64) {
        self.rate = rate.clamp(self.min_rate, self.max_rate);
    }

    /// Jump to a specific time
    pub fn set(&mut self, value: f64) {
        self.value = value;
    }

    /// Keep local time within `[lower, upper]`
    pub fn clamp(&mut self, lower: f64, upper: f64) {
        self.value = self.value.max(lower).min(upper);
    }

    /// Back to `t = 0` at nominal rate
    pub fn reset(&mut self) {
        self.value = 0.0;
        self.rate = 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receive_clock_monotonic() {
        let clock = ReceiveClock::new();

        let t1 = clock.now();
        std::thread::sleep(Duration::from_millis(5));
        let t2 = clock.now();

        assert!(t2 > t1);
    }

    #[test]
    fn test_frame_timer_clamps_stalls() {
        let mut timer = FrameTimer::new();
        std::thread::sleep(Duration::from_millis(150));

        let dt = timer.tick();
        assert!((dt - MAX_FRAME_DELTA.as_secs_f64()).abs() < 1e-9);
    }

    #[test]
    fn test_playback_clock_advance() {
        let mut clock = PlaybackClock::new(0.9, 1.1);

        clock.advance(0.1);
        assert!((clock.now() - 0.1).abs() < 1e-12);

        // Negative deltas never run the timeline backwards
        clock.advance(-1.0);
        assert!((clock.now() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_playback_clock_rate_bounded() {
        let mut clock = PlaybackClock::new(0.9, 1.1);

        clock.set_rate(2.0);
        assert_eq!(clock.rate(), 1.1);
        clock.advance(1.0);
        assert!((clock.now() - 1.1).abs() < 1e-12);

        clock.set_rate(0.1);
        assert_eq!(clock.rate(), 0.9);
    }

    #[test]
    fn test_playback_clock_clamp_and_reset() {
        let mut clock = PlaybackClock::new(0.9, 1.1);
        clock.set(5.0);
        clock.clamp(1.0, 2.0);
        assert_eq!(clock.now(), 2.0);

        clock.clamp(3.0, 4.0);
        assert_eq!(clock.now(), 3.0);

        clock.set_rate(1.1);
        clock.reset();
        assert_eq!(clock.now(), 0.0);
        assert_eq!(clock.rate(), 1.0);
    }
}
