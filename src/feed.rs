//! One poller per configured subject.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::clock::{Clock, SystemClock};
use crate::config::FeedConfig;
use crate::fetch::PredictionSource;
use crate::poller::{Schedule, StopPoller};
use crate::subject::Subject;

/// Startup delay for the poller at `index` in creation order.
pub fn stagger_delay(index: usize, increment: Duration) -> Duration {
    increment.saturating_mul(u32::try_from(index).unwrap_or(u32::MAX))
}

/// Owns the pollers for a fleet of subjects.
pub struct FeedManager {
    pollers: Vec<StopPoller>,
}

impl FeedManager {
    /// Spawns a poller for every subject in `config`, staggered by position.
    pub fn start<S>(config: &FeedConfig, source: Arc<S>) -> Self
    where
        S: PredictionSource + ?Sized + 'static,
    {
        Self::start_with_clock(config, source, Arc::new(SystemClock))
    }

    pub fn start_with_clock<S>(config: &FeedConfig, source: Arc<S>, clock: Arc<dyn Clock>) -> Self
    where
        S: PredictionSource + ?Sized + 'static,
    {
        let pollers: Vec<_> = config
            .subjects
            .iter()
            .enumerate()
            .map(|(index, subject)| {
                let schedule = Schedule {
                    stagger: stagger_delay(index, config.stagger),
                    interval: config.interval,
                    request_timeout: config.request_timeout,
                };
                StopPoller::spawn(
                    subject.clone(),
                    Arc::clone(&source),
                    schedule,
                    Arc::clone(&clock),
                )
            })
            .collect();

        info!(
            subjects = pollers.len(),
            interval_secs = config.interval.as_secs(),
            stagger_secs = config.stagger.as_secs(),
            "Feed started"
        );

        Self { pollers }
    }

    /// Pollers in configuration order.
    pub fn pollers(&self) -> &[StopPoller] {
        &self.pollers
    }

    pub fn get(&self, index: usize) -> Option<&StopPoller> {
        self.pollers.get(index)
    }

    /// First poller whose subject has the given label.
    pub fn find(&self, label: &str) -> Option<&StopPoller> {
        self.pollers.iter().find(|p| p.subject().label() == label)
    }

    pub fn subjects(&self) -> impl Iterator<Item = &Subject> {
        self.pollers.iter().map(StopPoller::subject)
    }

    pub fn len(&self) -> usize {
        self.pollers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pollers.is_empty()
    }

    /// Stops every poller. Snapshots stay readable.
    pub fn shutdown(&self) {
        for poller in &self.pollers {
            poller.shutdown();
        }
        info!("Feed stopped");
    }
}
