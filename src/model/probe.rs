//! Reachability probe for OpenAI-compatible inference endpoints.

use std::time::{Duration, Instant};

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::time::sleep;

use super::ModelConfig;
use crate::error::{RunnerError, RunnerResult};

/// Per-request timeout applied to probe requests.
const PROBE_TIMEOUT_SECS: u64 = 15;

/// Outcome of a successful probe.
#[derive(Debug, Clone)]
pub struct ProbeReport {
    /// HTTP status returned by the endpoint.
    pub status: u16,
    /// Model identifiers advertised by the endpoint, if it lists any.
    pub models: Vec<String>,
    /// Round-trip time of the successful attempt.
    pub latency: Duration,
    /// Number of attempts it took.
    pub attempts: u32,
}

impl ProbeReport {
    /// Whether the configured model is among the advertised ones.
    ///
    /// Endpoints that do not list models are given the benefit of the doubt.
    pub fn serves(&self, model_name: &str) -> bool {
        self.models.is_empty() || self.models.iter().any(|m| m == model_name)
    }
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

/// Checks that the configured endpoint answers and accepts the credential.
pub struct EndpointProbe {
    config: ModelConfig,
    client: Client,
}

impl EndpointProbe {
    /// Create a new probe for the given configuration.
    pub fn new(config: ModelConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { config, client }
    }

    /// Issue `GET {base_url}/models`, retrying transient failures.
    pub async fn check(&self) -> RunnerResult<ProbeReport> {
        let url = format!("{}/models", self.config.base_url.trim_end_matches('/'));
        let max_attempts = self.config.max_retries + 1;
        let mut last_error: Option<RunnerError> = None;

        for attempt in 1..=max_attempts {
            let started = Instant::now();
            match self.send_request(&url).await {
                Ok((status, models)) => {
                    tracing::debug!(%url, status, attempt, "endpoint probe succeeded");
                    return Ok(ProbeReport {
                        status,
                        models,
                        latency: started.elapsed(),
                        attempts: attempt,
                    });
                }
                Err(e) if attempt < max_attempts && Self::is_retryable_error(&e) => {
                    tracing::warn!(
                        "Probe failed (attempt {}/{}): {}. Retrying in {}s",
                        attempt,
                        max_attempts,
                        e,
                        self.config.retry_delay_secs
                    );
                    sleep(Duration::from_secs(self.config.retry_delay_secs)).await;
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| RunnerError::Network("probe never ran".to_string())))
    }

    /// Transport failures, server errors and rate limits are worth another try.
    fn is_retryable_error(error: &RunnerError) -> bool {
        match error {
            RunnerError::Network(_) => true,
            RunnerError::RemoteService {
                status: Some(status),
                ..
            } => *status >= 500 || *status == StatusCode::TOO_MANY_REQUESTS.as_u16(),
            _ => false,
        }
    }

    async fn send_request(&self, url: &str) -> RunnerResult<(u16, Vec<String>)> {
        let response = self
            .client
            .get(url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .send()
            .await
            .map_err(|e| RunnerError::Network(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RunnerError::RemoteService {
                status: Some(status.as_u16()),
                message: if error_text.trim().is_empty() {
                    status.to_string()
                } else {
                    error_text.trim().to_string()
                },
            });
        }

        let body = response.text().await?;
        let models = serde_json::from_str::<ModelList>(&body)
            .map(|list| list.data.into_iter().map(|m| m.id).collect())
            .unwrap_or_default();
        Ok((status.as_u16(), models))
    }
}
