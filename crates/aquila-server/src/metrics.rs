//! Prometheus metrics
//!
//! Metrics go through the `metrics` facade and are rendered by
//! `metrics-exporter-prometheus`, normally on a dedicated listener.

use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::error::{ApiError, Result};

pub const REWARD_REQUESTS_TOTAL: &str = "bpl_reward_http_requests_total";

/// Label used when a value is unknown or does not apply
pub const NOT_APPLICABLE: &str = "N/A";

/// Labels of one `bpl_reward_http_requests_total` increment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardRequestLabels {
    pub retailer_slug: String,
    pub response_status: u16,
    pub response_template: String,
}

impl RewardRequestLabels {
    pub fn new(
        retailer_slug: impl Into<String>,
        response_status: u16,
        response_template: impl Into<String>,
    ) -> Self {
        Self {
            retailer_slug: retailer_slug.into(),
            response_status,
            response_template: response_template.into(),
        }
    }
}

/// Install the global Prometheus recorder
pub fn install_recorder() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ApiError::Internal(format!("Failed to install metrics recorder: {}", e)))?;

    metrics::describe_counter!(
        REWARD_REQUESTS_TOTAL,
        "Total /reward http requests by response status, response template, and retailer slug."
    );

    Ok(handle)
}

#[inline]
pub fn record_reward_request(labels: &RewardRequestLabels) {
    metrics::counter!(
        REWARD_REQUESTS_TOTAL,
        "retailer_slug" => labels.retailer_slug.clone(),
        "response_status" => labels.response_status.to_string(),
        "response_template" => labels.response_template.clone()
    )
    .increment(1);
}

/// Router exposing `GET /metrics`
pub fn router<S>(handle: PrometheusHandle) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/metrics", get(move || std::future::ready(handle.render())))
}

/// Serve `/metrics` on its own port
pub async fn spawn_metrics_server(
    host: &str,
    port: u16,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let listener = TcpListener::bind((host, port)).await?;
    info!("Metrics server listening on {}", listener.local_addr()?);

    let app: Router = router(handle);
    Ok(tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    }))
}
