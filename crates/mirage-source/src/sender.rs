//! Send cadence

use std::time::Duration;

use mirage_core::{MirageResult, ServerSettings, ServerTime};
use tracing::trace;

/// Decides on which server ticks a snapshot goes out.
///
/// A snapshot is due once `now >= last_send + send_interval`; the send
/// time is then reset to `now`, so the cadence follows the tick grid
/// rather than an ideal clock.
#[derive(Clone, Debug)]
pub struct SnapshotSender {
    send_interval: Duration,
    last_send: Option<ServerTime>,
    sent: u64,
}

impl SnapshotSender {
    pub fn new(send_interval: Duration) -> Self {
        SnapshotSender {
            send_interval,
            last_send: None,
            sent: 0,
        }
    }

    pub fn from_settings(settings: &ServerSettings) -> MirageResult<Self> {
        settings.validate()?;
        Ok(Self::new(Duration::from_secs_f64(settings.send_interval())))
    }

    /// Should a snapshot be sent at `now`? Marks it sent when it should.
    pub fn poll(&mut self, now: ServerTime) -> bool {
        let due = match self.last_send {
            None => true,
            Some(last) => now >= last + self.send_interval,
        };
        if due {
            trace!(?now, "snapshot due");
            self.last_send = Some(now);
            self.sent += 1;
        }
        due
    }

    pub fn send_interval(&self) -> Duration {
        self.send_interval
    }

    pub fn last_send(&self) -> Option<ServerTime> {
        self.last_send
    }

    /// Snapshots released so far
    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn reset(&mut self) {
        self.last_send = None;
        self.sent = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_poll_sends() {
        let mut sender = SnapshotSender::new(Duration::from_millis(50));
        assert!(sender.poll(ServerTime::from_millis(3)));
        assert_eq!(sender.last_send(), Some(ServerTime::from_millis(3)));
    }

    #[test]
    fn test_cadence_follows_ticks() {
        let mut sender = SnapshotSender::new(Duration::from_millis(50));
        let mut sent_at = Vec::new();

        // 60 Hz server ticks, just under 16.7 ms apart
        for tick in 0..30 {
            let now = ServerTime::from_micros(tick * 16_666);
            if sender.poll(now) {
                sent_at.push(now.as_millis());
            }
        }

        // Three ticks fall just short of 50 ms, so every fourth tick sends
        assert_eq!(sent_at, vec![0, 66, 133, 199, 266, 333, 399, 466]);
        assert_eq!(sender.sent(), 8);
    }

    #[test]
    fn test_exact_interval_is_due() {
        let mut sender = SnapshotSender::new(Duration::from_millis(100));
        assert!(sender.poll(ServerTime::from_millis(0)));
        assert!(!sender.poll(ServerTime::from_millis(99)));
        assert!(sender.poll(ServerTime::from_millis(100)));
    }

    #[test]
    fn test_from_settings_rejects_zero_rate() {
        let settings = ServerSettings {
            send_rate: 0,
            ..ServerSettings::default()
        };
        assert!(SnapshotSender::from_settings(&settings).is_err());
    }

    #[test]
    fn test_reset() {
        let mut sender = SnapshotSender::new(Duration::from_millis(100));
        sender.poll(ServerTime::from_millis(500));
        sender.reset();
        assert!(sender.poll(ServerTime::from_millis(0)));
    }
}
