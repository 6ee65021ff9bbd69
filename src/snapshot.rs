//! Cached prediction state and its single-writer publication cell.
//!
//! A [`Snapshot`] is immutable once built. The owning poller replaces it
//! wholesale through a [`SnapshotPublisher`]; any number of
//! [`SnapshotReader`]s observe either the old or the new value, never a mix.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::watch;

/// Arrival offsets (seconds from `queried_at`) as last reported upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    arrivals: Vec<u32>,
    queried_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn new(arrivals: Vec<u32>, queried_at: DateTime<Utc>) -> Self {
        Self {
            arrivals,
            queried_at: Some(queried_at),
        }
    }

    /// The state before any query has succeeded.
    pub fn initial() -> Self {
        Self::default()
    }

    /// Offsets in the order the service returned them. Not necessarily sorted.
    pub fn arrivals(&self) -> &[u32] {
        &self.arrivals
    }

    /// When the query behind this snapshot completed; `None` until the first
    /// successful query.
    pub fn queried_at(&self) -> Option<DateTime<Utc>> {
        self.queried_at
    }

    pub fn is_initial(&self) -> bool {
        self.queried_at.is_none()
    }

    /// How old the data is at `now`.
    pub fn age(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.queried_at.map(|at| now - at)
    }
}

/// Creates a publication cell holding [`Snapshot::initial`].
pub fn channel() -> (SnapshotPublisher, SnapshotReader) {
    let (tx, rx) = watch::channel(Arc::new(Snapshot::initial()));
    (SnapshotPublisher { tx }, SnapshotReader { rx })
}

/// Write half. Owned by exactly one poller.
#[derive(Debug)]
pub struct SnapshotPublisher {
    tx: watch::Sender<Arc<Snapshot>>,
}

impl SnapshotPublisher {
    /// Replaces the published snapshot in one step.
    ///
    /// `completed_at` is clamped to the previous timestamp if the wall clock
    /// stepped backwards, keeping timestamps non-decreasing.
    pub fn publish(&self, arrivals: Vec<u32>, completed_at: DateTime<Utc>) -> Arc<Snapshot> {
        let previous = self.tx.borrow().queried_at();
        let queried_at = match previous {
            Some(prev) if prev > completed_at => prev,
            _ => completed_at,
        };

        let snapshot = Arc::new(Snapshot::new(arrivals, queried_at));
        self.tx.send_replace(Arc::clone(&snapshot));
        snapshot
    }

    pub fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.tx.borrow())
    }

    pub fn subscribe(&self) -> SnapshotReader {
        SnapshotReader {
            rx: self.tx.subscribe(),
        }
    }
}

/// Read half. Cheap to clone; reads never wait on the network.
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    rx: watch::Receiver<Arc<Snapshot>>,
}

impl SnapshotReader {
    pub fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.rx.borrow())
    }

    /// Waits for the next publication and returns it. Returns `None` once the
    /// publisher is gone.
    pub async fn changed(&mut self) -> Option<Arc<Snapshot>> {
        self.rx.changed().await.ok()?;
        Some(Arc::clone(&self.rx.borrow_and_update()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_initial_state_is_empty() {
        let (_publisher, reader) = channel();
        let snapshot = reader.current();
        assert!(snapshot.is_initial());
        assert!(snapshot.arrivals().is_empty());
        assert_eq!(snapshot.age(at(10)), None);
    }

    #[test]
    fn test_publish_replaces_whole_snapshot() {
        let (publisher, reader) = channel();
        publisher.publish(vec![300, 600, 1200], at(1000));
        assert_eq!(*reader.current(), Snapshot::new(vec![300, 600, 1200], at(1000)));

        publisher.publish(vec![], at(1120));
        let snapshot = reader.current();
        assert!(snapshot.arrivals().is_empty());
        assert_eq!(snapshot.queried_at(), Some(at(1120)));
        assert!(!snapshot.is_initial());
    }

    #[test]
    fn test_publish_clamps_backwards_clock() {
        let (publisher, reader) = channel();
        publisher.publish(vec![60], at(2000));
        publisher.publish(vec![30], at(1990));
        assert_eq!(reader.current().queried_at(), Some(at(2000)));
        assert_eq!(reader.current().arrivals(), &[30]);
    }

    #[test]
    fn test_concurrent_reads_never_tear() {
        // Each published snapshot encodes its own timestamp in every arrival
        // and in its length, so a mixed read is detectable.
        let (publisher, reader) = channel();
        let base = 1_000_000;
        let done = Arc::new(AtomicBool::new(false));

        let readers: Vec<_> = (0..8)
            .map(|_| {
                let reader = reader.clone();
                let done = Arc::clone(&done);
                thread::spawn(move || {
                    while !done.load(Ordering::Relaxed) {
                        let snapshot = reader.current();
                        if let Some(queried_at) = snapshot.queried_at() {
                            let tag = (queried_at.timestamp() - base) as u32;
                            assert_eq!(snapshot.arrivals().len(), 1 + (tag as usize % 7));
                            assert!(snapshot.arrivals().iter().all(|&s| s == tag));
                        } else {
                            assert!(snapshot.arrivals().is_empty());
                        }
                    }
                })
            })
            .collect();

        for tag in 0..20_000u32 {
            let len = 1 + (tag as usize % 7);
            publisher.publish(vec![tag; len], at(base + tag as i64));
        }
        done.store(true, Ordering::Relaxed);

        for handle in readers {
            handle.join().unwrap();
        }
    }

    #[tokio::test]
    async fn test_changed_yields_new_snapshot() {
        let (publisher, mut reader) = channel();
        let waiter = tokio::spawn(async move { reader.changed().await });
        publisher.publish(vec![42], at(5));
        let snapshot = waiter.await.unwrap().unwrap();
        assert_eq!(snapshot.arrivals(), &[42]);
    }

    #[tokio::test]
    async fn test_changed_ends_when_publisher_dropped() {
        let (publisher, mut reader) = channel();
        drop(publisher);
        assert!(reader.changed().await.is_none());
    }
}
