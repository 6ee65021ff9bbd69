//! Prediction queries against the NextBus public XML feed.

mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use async_trait::async_trait;
use reqwest::Url;

use crate::error::FetchError;
use crate::parser::parse_predictions;
use crate::subject::Subject;

pub const DEFAULT_BASE_URL: &str = "http://webservices.nextbus.com/service/publicXMLFeed";

/// Something that can answer "when is the next vehicle" for a subject.
///
/// One call is one round trip; implementations do not retry.
#[async_trait]
pub trait PredictionSource: Send + Sync {
    /// Seconds until each predicted arrival, in the order the service lists
    /// them. An empty list is a valid answer.
    async fn fetch(&self, subject: &Subject) -> Result<Vec<u32>, FetchError>;
}

/// Builds the `command=predictions` URL for `subject`.
pub fn predictions_url(base_url: &str, subject: &Subject) -> Result<Url, FetchError> {
    Url::parse_with_params(
        base_url,
        &[
            ("command", "predictions"),
            ("a", subject.agency()),
            ("r", subject.route()),
            ("s", subject.stop()),
        ],
    )
    .map_err(|e| FetchError::InvalidUrl(format!("{base_url}: {e}")))
}

/// Issues a GET and returns the body of a 2xx response.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: Url) -> Result<Vec<u8>, FetchError> {
    let req = reqwest::Request::new(reqwest::Method::GET, url);

    let resp = client.execute(req).await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Status(status));
    }
    Ok(resp.bytes().await?.to_vec())
}

/// [`PredictionSource`] backed by the NextBus XML feed.
pub struct NextBusClient<C> {
    http: C,
    base_url: String,
}

impl<C: HttpClient> NextBusClient<C> {
    pub fn new(http: C, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl<C: HttpClient> PredictionSource for NextBusClient<C> {
    #[tracing::instrument(skip_all, fields(subject = %subject))]
    async fn fetch(&self, subject: &Subject) -> Result<Vec<u32>, FetchError> {
        let url = predictions_url(&self.base_url, subject)?;
        let bytes = fetch_bytes(&self.http, url).await?;
        tracing::trace!(bytes = bytes.len(), "Prediction response received");
        parse_predictions(&bytes)
    }
}
