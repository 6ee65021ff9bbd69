//! Background polling for a single subject.
//!
//! Each [`StopPoller`] owns one tokio task that sleeps out its stagger delay,
//! then alternates between one fetch and one fixed-interval sleep forever.
//! Only that task writes the subject's snapshot; readers go through a
//! [`SnapshotReader`] and never wait on the network.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, warn};

use crate::clock::Clock;
use crate::error::FetchError;
use crate::fetch::PredictionSource;
use crate::snapshot::{self, Snapshot, SnapshotPublisher, SnapshotReader};
use crate::subject::Subject;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(120);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Timing for one poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// Delay before the first fetch.
    pub stagger: Duration,
    /// Sleep between the end of one fetch and the start of the next.
    pub interval: Duration,
    /// Upper bound on a single fetch.
    pub request_timeout: Duration,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            stagger: Duration::ZERO,
            interval: DEFAULT_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Handle to a running per-subject polling task.
///
/// Dropping the handle stops the task.
pub struct StopPoller {
    subject: Arc<Subject>,
    reader: SnapshotReader,
    handle: JoinHandle<()>,
}

impl StopPoller {
    /// Starts polling `subject` on the current tokio runtime.
    pub fn spawn<S>(
        subject: Subject,
        source: Arc<S>,
        schedule: Schedule,
        clock: Arc<dyn Clock>,
    ) -> Self
    where
        S: PredictionSource + ?Sized + 'static,
    {
        let subject = Arc::new(subject);
        let (publisher, reader) = snapshot::channel();

        let span = tracing::info_span!(
            "stop_poller",
            agency = %subject.agency(),
            route = %subject.route(),
            stop = %subject.stop(),
            label = %subject.label(),
        );
        let handle = tokio::spawn(
            run(Arc::clone(&subject), source, schedule, clock, publisher).instrument(span),
        );

        Self {
            subject,
            reader,
            handle,
        }
    }

    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    /// The latest snapshot. Never blocks.
    pub fn current_snapshot(&self) -> Arc<Snapshot> {
        self.reader.current()
    }

    /// A reader that can wait for future publications.
    pub fn subscribe(&self) -> SnapshotReader {
        self.reader.clone()
    }

    /// Stops the task at its next suspension point.
    pub fn shutdown(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for StopPoller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn run<S>(
    subject: Arc<Subject>,
    source: Arc<S>,
    schedule: Schedule,
    clock: Arc<dyn Clock>,
    publisher: SnapshotPublisher,
) where
    S: PredictionSource + ?Sized,
{
    debug!(stagger_secs = schedule.stagger.as_secs(), "Waiting out startup stagger");
    tokio::time::sleep(schedule.stagger).await;

    loop {
        match poll_once(&subject, source.as_ref(), schedule.request_timeout, clock.as_ref(), &publisher)
            .await
        {
            Ok(snapshot) => {
                debug!(arrivals = snapshot.arrivals().len(), "Snapshot published");
            }
            Err(e) if e.is_transient() => {
                warn!(error = %e, "Prediction query failed, keeping previous snapshot");
            }
            Err(e) => {
                error!(error = %e, "Prediction response rejected, keeping previous snapshot");
            }
        }

        tokio::time::sleep(schedule.interval).await;
    }
}

/// Runs one fetch for `subject`, bounded by `timeout`, and publishes the
/// result. On failure the published snapshot is left as it was.
pub async fn poll_once<S>(
    subject: &Subject,
    source: &S,
    timeout: Duration,
    clock: &dyn Clock,
    publisher: &SnapshotPublisher,
) -> Result<Arc<Snapshot>, FetchError>
where
    S: PredictionSource + ?Sized,
{
    let arrivals = match tokio::time::timeout(timeout, source.fetch(subject)).await {
        Ok(result) => result?,
        Err(_) => return Err(FetchError::Timeout(timeout)),
    };

    let snapshot = publisher.publish(arrivals, clock.now());
    if snapshot.arrivals().is_empty() {
        info!("No current predictions");
    }
    Ok(snapshot)
}
