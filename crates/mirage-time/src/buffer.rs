//! Snapshot buffer - time-keyed storage of not-yet-consumed snapshots

use std::collections::BTreeMap;

use mirage_core::{ServerTime, Snapshot};

/// Ordered, bounded collection of snapshots keyed by server time.
///
/// INVARIANT: keys strictly increase and each key holds at most one snapshot.
/// The buffer itself never refuses or evicts; that is the admission
/// policy's job. It only reports when it is full.
#[derive(Clone, Debug)]
pub struct SnapshotBuffer<P> {
    /// Buffered snapshots
    entries: BTreeMap<ServerTime, Snapshot<P>>,
    /// Maximum buffer size
    limit: usize,
}

impl<P> SnapshotBuffer<P> {
    /// Create a new buffer
    pub fn new(limit: usize) -> Self {
        SnapshotBuffer {
            entries: BTreeMap::new(),
            limit,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn limit(&self) -> usize {
        self.limit
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.limit
    }

    pub fn contains(&self, server_time: ServerTime) -> bool {
        self.entries.contains_key(&server_time)
    }

    pub fn get(&self, server_time: ServerTime) -> Option<&Snapshot<P>> {
        self.entries.get(&server_time)
    }

    /// Oldest buffered snapshot
    pub fn oldest(&self) -> Option<&Snapshot<P>> {
        self.entries.values().next()
    }

    /// Second-oldest buffered snapshot
    pub fn second_oldest(&self) -> Option<&Snapshot<P>> {
        self.entries.values().nth(1)
    }

    /// Newest buffered snapshot
    pub fn newest(&self) -> Option<&Snapshot<P>> {
        self.entries.values().next_back()
    }

    /// Latest snapshot at or before `micros`
    pub fn at_or_before(&self, micros: i64) -> Option<&Snapshot<P>> {
        self.entries
            .range(..=ServerTime::from_micros(micros))
            .next_back()
            .map(|(_, s)| s)
    }

    /// First snapshot strictly after `server_time`
    pub fn after(&self, server_time: ServerTime) -> Option<&Snapshot<P>> {
        use std::ops::Bound::{Excluded, Unbounded};
        self.entries
            .range((Excluded(server_time), Unbounded))
            .next()
            .map(|(_, s)| s)
    }

    /// Store a snapshot, returning the one it replaced if the key existed
    pub fn upsert(&mut self, snapshot: Snapshot<P>) -> Option<Snapshot<P>> {
        self.entries.insert(snapshot.server_time, snapshot)
    }

    /// Remove and return the oldest snapshot
    pub fn pop_oldest(&mut self) -> Option<Snapshot<P>> {
        self.entries.pop_first().map(|(_, s)| s)
    }

    /// Drop every snapshot strictly older than `server_time`.
    /// Returns how many were retired.
    pub fn retire_before(&mut self, server_time: ServerTime) -> usize {
        let before = self.entries.len();
        self.entries = self.entries.split_off(&server_time);
        before - self.entries.len()
    }

    /// Iterate in server time order
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Snapshot<P>> {
        self.entries.values()
    }

    /// Buffered lookahead: newest server time minus `local_time`, in seconds
    pub fn time_ahead(&self, local_time: f64) -> Option<f64> {
        self.newest().map(|s| s.server_time.as_secs_f64() - local_time)
    }

    /// Clear the buffer
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
