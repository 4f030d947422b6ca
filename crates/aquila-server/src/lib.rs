//! Aquila HTTP server
//!
//! Serves reward pages rendered from retailer templates, plus health checks
//! and Prometheus metrics.

use std::sync::Arc;

use aquila_templates::{BlobStorage, S3Storage, TemplateCache};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod routes;
pub mod services;

use config::ServerConfig;
use error::Result;
use services::{ReadinessProbe, ResolutionPolicy, RewardFetcher, reward_fetcher::build_http_client};

/// Main application state
#[derive(Clone)]
pub struct AppState {
    pub policy: Arc<ResolutionPolicy>,
    pub readiness: Arc<ReadinessProbe>,
}

impl AppState {
    /// Connect to the template store and wire up the services
    pub async fn from_config(config: &ServerConfig) -> Result<Self> {
        let store: Option<Arc<dyn BlobStorage>> = match (&config.blob, config.fetch_templates) {
            (Some(settings), true) => Some(Arc::new(S3Storage::from_settings(settings)?)),
            _ => None,
        };

        let templates = match &store {
            Some(store) => TemplateCache::connect(store.clone()).await,
            None => {
                warn!("Template fetching disabled, only default templates will be served");
                TemplateCache::disabled()
            }
        };

        let client = build_http_client(&config.rewards)?;
        let fetcher = RewardFetcher::new(client.clone(), &config.rewards);
        let container = config
            .blob
            .as_ref()
            .map(|b| b.bucket.clone())
            .unwrap_or_default();

        Ok(Self {
            policy: Arc::new(ResolutionPolicy::new(Arc::new(templates), Arc::new(fetcher))),
            readiness: Arc::new(ReadinessProbe::new(
                store,
                container,
                client,
                config.rewards.polaris_host.clone(),
            )),
        })
    }
}

/// Create the main application router
///
/// `/metrics` is only mounted here when a handle is passed in; normally it
/// lives on the dedicated metrics listener.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let mut router = Router::new()
        .merge(routes::rewards::router())
        .merge(routes::health::router());

    if let Some(handle) = metrics_handle {
        info!("Exposing /metrics on the main port");
        router = router.merge(metrics::router(handle));
    }

    router
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
