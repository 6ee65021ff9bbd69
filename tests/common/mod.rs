#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use nextbus_feed::clock::Clock;
use nextbus_feed::error::FetchError;
use nextbus_feed::fetch::PredictionSource;
use nextbus_feed::subject::Subject;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Wall clock that follows tokio's (possibly paused) clock from `origin`.
pub struct TestClock {
    origin: DateTime<Utc>,
    start: Instant,
}

impl TestClock {
    pub fn starting_at(unix_secs: i64) -> Self {
        Self {
            origin: Utc.timestamp_opt(unix_secs, 0).unwrap(),
            start: Instant::now(),
        }
    }

    pub fn at(&self, offset_secs: i64) -> DateTime<Utc> {
        self.origin + chrono::Duration::seconds(offset_secs)
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        self.origin + chrono::Duration::from_std(self.start.elapsed()).unwrap()
    }
}

pub enum Reply {
    Arrivals(Vec<u32>),
    Fail,
    Hang,
}

/// One recorded fetch: which stop, and when relative to the stub's creation.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub stop: String,
    pub at: Duration,
}

type Responder = Box<dyn Fn(&Subject, usize) -> Reply + Send + Sync>;

/// Prediction source whose replies are decided per stop and per call number.
pub struct StubSource {
    start: Instant,
    calls: Mutex<Vec<Call>>,
    respond: Responder,
}

impl StubSource {
    pub fn new(respond: impl Fn(&Subject, usize) -> Reply + Send + Sync + 'static) -> Self {
        Self {
            start: Instant::now(),
            calls: Mutex::new(Vec::new()),
            respond: Box::new(respond),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, stop: &str) -> Vec<Duration> {
        self.calls()
            .into_iter()
            .filter(|c| c.stop == stop)
            .map(|c| c.at)
            .collect()
    }
}

#[async_trait]
impl PredictionSource for StubSource {
    async fn fetch(&self, subject: &Subject) -> Result<Vec<u32>, FetchError> {
        let nth = {
            let mut calls = self.calls.lock().unwrap();
            let nth = calls.iter().filter(|c| c.stop == subject.stop()).count();
            calls.push(Call {
                stop: subject.stop().to_string(),
                at: self.start.elapsed(),
            });
            nth
        };

        match (self.respond)(subject, nth) {
            Reply::Arrivals(arrivals) => Ok(arrivals),
            Reply::Fail => Err(FetchError::Upstream("stubbed failure".into())),
            Reply::Hang => std::future::pending().await,
        }
    }
}

pub fn subject(stop: &str, label: &str) -> Subject {
    Subject::new("actransit", "210", stop, label)
}
