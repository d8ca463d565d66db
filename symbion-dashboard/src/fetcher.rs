//! Metrics fetcher: one timed GET per host, never failing to its caller
//!
//! A failed poll (transport error, timeout, non-2xx status, malformed body)
//! resolves to the host's previous record flagged stale, so a flaky link
//! freezes the readings instead of dropping them to zero.

use crate::model::{ConnectivityStatus, MetricsRecord, MonitoredHost, UNKNOWN_HOSTNAME};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP status {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Body served by a host's metrics endpoint. Extra fields are ignored.
#[derive(Debug, Deserialize)]
struct MetricsPayload {
    cpu_usage_percent: Option<f64>,
    memory_usage_percent: Option<f64>,
    disk_usage_percent: Option<f64>,
    hostname: Option<String>,
}

/// Parse a flat JSON object into a fresh record
///
/// Missing or `null` percentages become 0, a missing hostname becomes
/// `"Unknown"`. Anything that is not a JSON object is malformed.
pub fn parse_payload(body: &[u8]) -> Result<MetricsRecord, FetchError> {
    let object: Map<String, Value> = serde_json::from_slice(body)?;
    let payload = MetricsPayload::deserialize(Value::Object(object))?;

    Ok(MetricsRecord {
        cpu_percent: payload.cpu_usage_percent.unwrap_or(0.0),
        ram_percent: payload.memory_usage_percent.unwrap_or(0.0),
        disk_percent: payload.disk_usage_percent.unwrap_or(0.0),
        hostname: payload.hostname.unwrap_or_else(|| UNKNOWN_HOSTNAME.to_string()),
        status: ConnectivityStatus::Ok,
    })
}

/// Fold a fetch outcome into the record to display
pub fn resolve(
    previous: Option<&MetricsRecord>,
    outcome: Result<MetricsRecord, FetchError>,
) -> MetricsRecord {
    match outcome {
        Ok(record) => record,
        Err(_) => previous
            .cloned()
            .map(MetricsRecord::into_stale)
            .unwrap_or_else(MetricsRecord::default_error),
    }
}

/// A success after `previous` is a recovery only if the host had answered before
pub fn is_recovery(previous: &MetricsRecord) -> bool {
    previous.is_stale() && *previous != MetricsRecord::default_error()
}

#[derive(Debug, Clone)]
pub struct MetricsFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl MetricsFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("symbion-dashboard/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Poll one host; failures fall back to its last record, marked stale
    pub async fn fetch(&self, host: &MonitoredHost) -> MetricsRecord {
        let outcome = self.try_fetch(&host.endpoint_url).await;

        match &outcome {
            Ok(record) if is_recovery(&host.last_record) => {
                info!(
                    "Host {} reachable again ({} @ {})",
                    host.display_name, record.hostname, host.endpoint_url
                );
            }
            Ok(record) => {
                debug!(
                    "Host {}: cpu={:.1}% ram={:.1}% disk={:.1}%",
                    host.display_name, record.cpu_percent, record.ram_percent, record.disk_percent
                );
            }
            Err(e) => {
                warn!(
                    "Host {} fetch failed ({}): {} - keeping last reading",
                    host.display_name, host.endpoint_url, e
                );
            }
        }

        resolve(Some(&host.last_record), outcome)
    }

    /// Single GET bounded by the timeout; dropping the request future on
    /// expiry cancels the in-flight request.
    pub async fn try_fetch(&self, url: &str) -> Result<MetricsRecord, FetchError> {
        let request = async {
            let response = self.client.get(url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status(status));
            }
            let body = response.bytes().await?;
            parse_payload(&body)
        };

        tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))?
    }
}
