//! Admission policy - how arriving snapshots enter the buffer
//!
//! Arrivals are unordered, lossy and may be duplicated. None of that is an
//! error: every outcome is reported as an [`Admission`] and the caller only
//! re-tunes its statistics for snapshots that actually landed.

use mirage_core::{ServerTime, Snapshot};
use tracing::{debug, trace};

use crate::SnapshotBuffer;

/// What happened to an arriving snapshot
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// New server time, stored
    Inserted,
    /// Same server time already buffered, replaced by the arrival
    Replaced,
    /// Older than what playback has already consumed, dropped
    Stale,
    /// Buffer full and the oldest entry is still in use, dropped
    Overflow,
}

impl Admission {
    /// Did the snapshot end up in the buffer?
    #[inline]
    pub fn accepted(self) -> bool {
        matches!(self, Admission::Inserted | Admission::Replaced)
    }
}

/// Where playback currently stands, as seen by admission
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PlaybackCursor {
    /// Server time of the newest snapshot playback has interpolated toward.
    /// Anything older can no longer be shown without running backwards.
    pub floor: Option<ServerTime>,
    /// Local timeline position, in seconds
    pub local_time: f64,
}

/// Admit a snapshot into the buffer.
///
/// - Older than the cursor floor: stale, dropped.
/// - Same server time as a buffered entry: replaced.
/// - Buffer full: the oldest entry is evicted only once the cursor has
///   moved past the second-oldest one, and only for an arrival newer than
///   it. Otherwise the arrival is dropped so the pair currently being
///   interpolated stays intact.
pub fn admit<P>(
    buffer: &mut SnapshotBuffer<P>,
    snapshot: Snapshot<P>,
    cursor: PlaybackCursor,
) -> Admission {
    let server_time = snapshot.server_time;

    if let Some(floor) = cursor.floor {
        if server_time < floor {
            trace!(?server_time, ?floor, "dropping stale snapshot");
            return Admission::Stale;
        }
    }

    if buffer.contains(server_time) {
        buffer.upsert(snapshot);
        trace!(?server_time, "replaced duplicate snapshot");
        return Admission::Replaced;
    }

    if buffer.is_full() {
        // Never trade a buffered snapshot for an older one
        if buffer.oldest().is_some_and(|s| server_time < s.server_time) {
            trace!(?server_time, "full buffer and arrival predates oldest entry, dropping");
            return Admission::Overflow;
        }

        let evictable = buffer
            .second_oldest()
            .is_some_and(|s| s.server_time.as_secs_f64() <= cursor.local_time);

        if !evictable {
            debug!(
                ?server_time,
                limit = buffer.limit(),
                "buffer full with oldest snapshot in use, dropping arrival"
            );
            return Admission::Overflow;
        }

        if let Some(evicted) = buffer.pop_oldest() {
            trace!(evicted = ?evicted.server_time, "evicted oldest snapshot");
        }
    }

    buffer.upsert(snapshot);
    Admission::Inserted
}
