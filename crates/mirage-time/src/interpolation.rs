//! Interpolation stepper - advances the local timeline and brackets it
//!
//! Each tick the local timeline moves forward by `dt * timescale`, the two
//! buffered snapshots around it are selected, and everything older than the
//! pair is retired. Playback never extrapolates: past the newest snapshot it
//! holds there and pulls the timeline back onto it.

use mirage_core::{Interpolate, ServerTime, Snapshot};
use tracing::trace;

use crate::{PlaybackClock, PlaybackCursor, SnapshotBuffer};

/// How a step resolved
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// Timeline bracketed by two distinct snapshots
    Interpolating,
    /// Timeline before all buffered data, or exactly on the only snapshot
    Holding,
    /// Timeline ran past the newest snapshot and was clamped to it
    Starved,
}

/// Result of one step
#[derive(Clone, Debug, PartialEq)]
pub struct Sample<P> {
    pub from: Snapshot<P>,
    pub to: Snapshot<P>,
    /// Fraction between `from` and `to`, always in `[0, 1]`
    pub t: f64,
    pub outcome: StepOutcome,
    /// Interpolated payload
    pub value: P,
}

/// `t` for `local_time` between two server times; equal times give 1.
pub fn interpolation_factor(from: ServerTime, to: ServerTime, local_time: f64) -> f64 {
    let span = to.secs_since(from);
    if span <= 0.0 {
        return 1.0;
    }
    ((local_time - from.as_secs_f64()) / span).clamp(0.0, 1.0)
}

/// Stepper state: remembers how far playback has consumed
#[derive(Clone, Debug, Default)]
pub struct Interpolator {
    /// Server time of the last `to` snapshot emitted
    floor: Option<ServerTime>,
}

impl Interpolator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumption floor, see [`PlaybackCursor::floor`]
    pub fn floor(&self) -> Option<ServerTime> {
        self.floor
    }

    /// Cursor handed to admission
    pub fn cursor(&self, clock: &PlaybackClock) -> PlaybackCursor {
        PlaybackCursor {
            floor: self.floor,
            local_time: clock.now(),
        }
    }

    /// Advance the timeline by `delta_time` real seconds at the clock's
    /// current rate and sample the buffer.
    ///
    /// Returns `None` without touching the clock when nothing is buffered;
    /// the caller keeps whatever it rendered last.
    pub fn step<P: Interpolate>(
        &mut self,
        buffer: &mut SnapshotBuffer<P>,
        clock: &mut PlaybackClock,
        delta_time: f64,
    ) -> Option<Sample<P>> {
        if buffer.is_empty() {
            return None;
        }
        clock.advance(delta_time);
        self.sample(buffer, clock)
    }

    /// Bracket the clock's current time without advancing it
    pub fn sample<P: Interpolate>(
        &mut self,
        buffer: &mut SnapshotBuffer<P>,
        clock: &mut PlaybackClock,
    ) -> Option<Sample<P>> {
        let local_time = clock.now();
        let cursor_micros = (local_time * 1_000_000.0).floor() as i64;

        let (from, to, outcome) = match buffer.at_or_before(cursor_micros) {
            Some(from) => match buffer.after(from.server_time) {
                Some(to) => (from.clone(), to.clone(), StepOutcome::Interpolating),
                None => {
                    // Nothing newer: hold at the newest snapshot
                    let newest = from.clone();
                    let newest_time = newest.server_time.as_secs_f64();
                    let outcome = if local_time > newest_time {
                        clock.set(newest_time);
                        StepOutcome::Starved
                    } else {
                        StepOutcome::Holding
                    };
                    (newest.clone(), newest, outcome)
                }
            },
            None => {
                // Timeline still before all buffered data
                let oldest = buffer.oldest()?.clone();
                (oldest.clone(), oldest, StepOutcome::Holding)
            }
        };

        let retired = buffer.retire_before(from.server_time);
        if retired > 0 {
            trace!(retired, from = ?from.server_time, "retired consumed snapshots");
        }

        let t = if outcome == StepOutcome::Interpolating {
            interpolation_factor(from.server_time, to.server_time, clock.now())
        } else {
            1.0
        };
        let value = Snapshot::interpolate(&from, &to, t);

        self.floor = Some(to.server_time);

        Some(Sample {
            from,
            to,
            t,
            outcome,
            value,
        })
    }

    pub fn reset(&mut self) {
        self.floor = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirage_core::Position;

    fn snap(secs: f64, x: f32) -> Snapshot<Position> {
        Snapshot::new(ServerTime::from_secs_f64(secs), Position::new(x, 0.0, 0.0))
    }

    fn buffer_with(points: &[(f64, f32)]) -> SnapshotBuffer<Position> {
        let mut buffer = SnapshotBuffer::new(32);
        for &(secs, x) in points {
            buffer.upsert(snap(secs, x));
        }
        buffer
    }

    #[test]
    fn test_bracket_scenario_thirty_hertz() {
        let interval = 1.0 / 30.0;
        let mut buffer = buffer_with(&[
            (0.0, 0.0),
            (interval, 1.0),
            (2.0 * interval, 2.0),
            (3.0 * interval, 3.0),
        ]);
        let mut clock = PlaybackClock::new(0.96, 1.02);
        let mut interp = Interpolator::new();

        let sample = interp.step(&mut buffer, &mut clock, 0.05).unwrap();

        assert_eq!(sample.outcome, StepOutcome::Interpolating);
        assert_eq!(sample.from.server_time, ServerTime::from_secs_f64(interval));
        assert_eq!(sample.to.server_time, ServerTime::from_secs_f64(2.0 * interval));
        assert!((sample.t - 0.5).abs() < 1e-3);
        assert!((sample.value.x - 1.5).abs() < 1e-3);

        // The snapshot before the pair was retired
        assert_eq!(buffer.len(), 3);
        assert_eq!(interp.floor(), Some(ServerTime::from_secs_f64(2.0 * interval)));
    }

    #[test]
    fn test_empty_buffer_does_not_step() {
        let mut buffer: SnapshotBuffer<Position> = SnapshotBuffer::new(8);
        let mut clock = PlaybackClock::new(0.96, 1.02);
        let mut interp = Interpolator::new();

        assert!(interp.step(&mut buffer, &mut clock, 0.1).is_none());
        assert_eq!(clock.now(), 0.0);
    }

    #[test]
    fn test_single_snapshot_hold_is_idempotent() {
        let mut buffer = buffer_with(&[(0.5, 4.0)]);
        let mut clock = PlaybackClock::new(0.96, 1.02);
        clock.set(0.45);
        let mut interp = Interpolator::new();

        let first = interp.step(&mut buffer, &mut clock, 0.0).unwrap();
        assert_eq!(first.outcome, StepOutcome::Holding);

        for _ in 0..100 {
            let sample = interp.step(&mut buffer, &mut clock, 1.0 / 60.0).unwrap();
            assert_eq!(sample.value, first.value);
            assert_eq!(sample.t, 1.0);
            assert_eq!(sample.from, sample.to);
        }
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_starvation_clamps_to_newest() {
        let mut buffer = buffer_with(&[(0.0, 0.0), (0.1, 1.0)]);
        let mut clock = PlaybackClock::new(0.96, 1.02);
        let mut interp = Interpolator::new();

        let sample = interp.step(&mut buffer, &mut clock, 0.5).unwrap();

        assert_eq!(sample.outcome, StepOutcome::Starved);
        assert_eq!(sample.to.server_time, ServerTime::from_millis(100));
        assert_eq!(sample.value.x, 1.0);
        assert!((clock.now() - 0.1).abs() < 1e-9);
        // Only the newest snapshot remains
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_warm_up_holds_at_oldest_without_retiring() {
        let mut buffer = buffer_with(&[(1.0, 5.0), (1.1, 6.0)]);
        let mut clock = PlaybackClock::new(0.96, 1.02);
        clock.set(0.9);
        let mut interp = Interpolator::new();

        let sample = interp.step(&mut buffer, &mut clock, 0.01).unwrap();

        assert_eq!(sample.outcome, StepOutcome::Holding);
        assert_eq!(sample.value.x, 5.0);
        assert_eq!(sample.t, 1.0);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_exact_hit_on_snapshot() {
        let mut buffer = buffer_with(&[(0.0, 0.0), (0.1, 1.0), (0.2, 2.0)]);
        let mut clock = PlaybackClock::new(0.96, 1.02);
        clock.set(0.1);
        let mut interp = Interpolator::new();

        let sample = interp.sample(&mut buffer, &mut clock).unwrap();
        assert_eq!(sample.from.server_time, ServerTime::from_millis(100));
        assert_eq!(sample.to.server_time, ServerTime::from_millis(200));
        assert_eq!(sample.t, 0.0);
        assert_eq!(sample.value.x, 1.0);
    }

    #[test]
    fn test_interpolation_factor_bounds() {
        let a = ServerTime::from_millis(100);
        let b = ServerTime::from_millis(200);

        assert_eq!(interpolation_factor(a, b, 0.0), 0.0);
        assert_eq!(interpolation_factor(a, b, 1.0), 1.0);
        assert!((interpolation_factor(a, b, 0.125) - 0.25).abs() < 1e-9);
        assert_eq!(interpolation_factor(a, a, 0.1), 1.0);
    }

    #[test]
    fn test_timescale_applies_to_step() {
        let mut buffer = buffer_with(&[(0.0, 0.0), (1.0, 10.0)]);
        let mut clock = PlaybackClock::new(0.5, 2.0);
        clock.set_rate(2.0);
        let mut interp = Interpolator::new();

        let sample = interp.step(&mut buffer, &mut clock, 0.25).unwrap();
        assert!((clock.now() - 0.5).abs() < 1e-12);
        assert!((sample.value.x - 5.0).abs() < 1e-4);
    }
}
