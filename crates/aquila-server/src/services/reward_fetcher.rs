//! Reward lookups against the polaris and cosmos loyalty services

use std::time::Duration;

use aquila::RewardPayload;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use tracing::{error, info, warn};

use crate::config::RewardServiceConfig;
use crate::error::Result;

/// Statuses retried by the transport before a response is classified
const RETRY_STATUSES: [StatusCode; 3] = [
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// Longest sleep between two retries
pub const MAX_BACKOFF: Duration = Duration::from_secs(120);

/// Which upstream service a request is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    Polaris,
    Cosmos,
}

impl EndpointKind {
    pub fn service_name(&self) -> &'static str {
        match self {
            EndpointKind::Polaris => "polaris",
            EndpointKind::Cosmos => "cosmos",
        }
    }
}

/// Classified result of a single reward lookup
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Success(RewardPayload),
    NotFound,
    /// Reachable, but answered with something we can't use
    UpstreamError { status: u16, body: String },
    /// The request never produced a response
    Unreachable { cause: String },
}

/// Source of reward data
#[async_trait]
pub trait RewardProvider: Send + Sync {
    async fn fetch(&self, retailer: &str, reward_id: &str, kind: EndpointKind) -> FetchOutcome;
}

/// Bounded retry of idempotent GETs on gateway errors
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_factor: f64,
}

impl RetryPolicy {
    /// Sleep before retry number `attempt` (1-based), capped at [`MAX_BACKOFF`]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let secs = self.backoff_factor * f64::from(1u32 << exponent);
        if secs.is_nan() || secs <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(secs)
            .unwrap_or(MAX_BACKOFF)
            .min(MAX_BACKOFF)
    }

    fn should_retry(&self, attempt: u32, status: StatusCode) -> bool {
        attempt < self.max_retries && RETRY_STATUSES.contains(&status)
    }
}

/// Build the HTTP client shared by the fetcher and readiness checks
pub fn build_http_client(config: &RewardServiceConfig) -> Result<Client> {
    Ok(Client::builder()
        .connect_timeout(config.connect_timeout)
        .read_timeout(config.read_timeout)
        .build()?)
}

/// HTTP reward provider
pub struct RewardFetcher {
    client: Client,
    polaris_base_url: String,
    cosmos_base_url: String,
    retry: RetryPolicy,
}

impl RewardFetcher {
    pub fn new(client: Client, config: &RewardServiceConfig) -> Self {
        Self {
            client,
            polaris_base_url: config.base_url(EndpointKind::Polaris),
            cosmos_base_url: config.base_url(EndpointKind::Cosmos),
            retry: RetryPolicy {
                max_retries: config.max_retries,
                backoff_factor: config.backoff_factor,
            },
        }
    }

    pub fn reward_url(&self, retailer: &str, reward_id: &str, kind: EndpointKind) -> String {
        let base_url = match kind {
            EndpointKind::Polaris => &self.polaris_base_url,
            EndpointKind::Cosmos => &self.cosmos_base_url,
        };
        format!("{}/{}/reward/{}", base_url, retailer, reward_id)
    }

    async fn get_with_retry(&self, url: &str) -> reqwest::Result<Response> {
        let mut attempt = 0;
        loop {
            let response = self.client.get(url).send().await?;
            let status = response.status();
            if !self.retry.should_retry(attempt, status) {
                return Ok(response);
            }

            attempt += 1;
            let delay = self.retry.backoff(attempt);
            warn!(url, status = status.as_u16(), attempt, ?delay, "Retrying reward request");
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl RewardProvider for RewardFetcher {
    async fn fetch(&self, retailer: &str, reward_id: &str, kind: EndpointKind) -> FetchOutcome {
        let service = kind.service_name();
        let url = self.reward_url(retailer, reward_id, kind);

        let response = match self.get_with_retry(&url).await {
            Ok(response) => response,
            Err(e) => {
                error!(service, error = %e, "Unable to reach {}", service);
                return FetchOutcome::Unreachable {
                    cause: e.to_string(),
                };
            }
        };

        let status = response.status();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                error!(service, error = %e, "Failed to read response from {}", service);
                return FetchOutcome::Unreachable {
                    cause: e.to_string(),
                };
            }
        };

        if status != StatusCode::OK {
            info!(
                service,
                status = status.as_u16(),
                response = %String::from_utf8_lossy(&body),
                "Received a negative response from {}",
                service
            );
            if status == StatusCode::NOT_FOUND {
                return FetchOutcome::NotFound;
            }
            return FetchOutcome::UpstreamError {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            };
        }

        match RewardPayload::from_slice(&body) {
            Ok(payload) => FetchOutcome::Success(payload),
            Err(e) => {
                error!(service, error = %e, "Received an invalid reward payload from {}", service);
                FetchOutcome::UpstreamError {
                    status: status.as_u16(),
                    body: String::from_utf8_lossy(&body).into_owned(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reward_url_per_endpoint() {
        let config = RewardServiceConfig {
            polaris_host: "http://polaris".into(),
            cosmos_host: "http://cosmos".into(),
            ..RewardServiceConfig::default()
        };
        let fetcher = RewardFetcher::new(Client::new(), &config);

        assert_eq!(
            fetcher.reward_url("test-retailer", "abc", EndpointKind::Polaris),
            "http://polaris/loyalty/test-retailer/reward/abc"
        );
        assert_eq!(
            fetcher.reward_url("test-retailer", "abc", EndpointKind::Cosmos),
            "http://cosmos/loyalty/test-retailer/reward/abc"
        );
    }

    #[test]
    fn test_backoff_doubles() {
        let retry = RetryPolicy {
            max_retries: 3,
            backoff_factor: 1.0,
        };
        assert_eq!(retry.backoff(1), Duration::from_secs(1));
        assert_eq!(retry.backoff(2), Duration::from_secs(2));
        assert_eq!(retry.backoff(3), Duration::from_secs(4));

        let no_wait = RetryPolicy {
            max_retries: 3,
            backoff_factor: 0.0,
        };
        assert_eq!(no_wait.backoff(3), Duration::ZERO);
    }

    #[test]
    fn test_backoff_is_capped() {
        for backoff_factor in [f64::INFINITY, 1e300, 100.0] {
            let retry = RetryPolicy {
                max_retries: 3,
                backoff_factor,
            };
            assert_eq!(retry.backoff(3), MAX_BACKOFF);
        }

        for backoff_factor in [f64::NAN, f64::NEG_INFINITY, -1.0] {
            let retry = RetryPolicy {
                max_retries: 3,
                backoff_factor,
            };
            assert_eq!(retry.backoff(1), Duration::ZERO);
        }
    }

    #[test]
    fn test_only_gateway_errors_are_retried() {
        let retry = RetryPolicy {
            max_retries: 2,
            backoff_factor: 0.0,
        };
        assert!(retry.should_retry(0, StatusCode::BAD_GATEWAY));
        assert!(retry.should_retry(1, StatusCode::GATEWAY_TIMEOUT));
        assert!(!retry.should_retry(2, StatusCode::SERVICE_UNAVAILABLE));
        assert!(!retry.should_retry(0, StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!retry.should_retry(0, StatusCode::NOT_FOUND));
    }
}
