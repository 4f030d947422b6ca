//! Reward page routes
//!
//! `/reward` is served from polaris and `/rewards` from cosmos; otherwise the
//! two behave the same.

use axum::{
    Router,
    extract::{Query, State},
    response::Html,
    routing::get,
};
use tracing::error;

use crate::{
    AppState,
    error::{ApiError, Result},
    metrics::{self, NOT_APPLICABLE, RewardRequestLabels},
    services::{EndpointKind, RewardQuery},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/reward", get(polaris_reward))
        .route("/rewards", get(cosmos_reward))
}

async fn polaris_reward(
    State(state): State<AppState>,
    Query(query): Query<RewardQuery>,
) -> Result<Html<String>> {
    reward_page(&state, &query, EndpointKind::Polaris).await
}

async fn cosmos_reward(
    State(state): State<AppState>,
    Query(query): Query<RewardQuery>,
) -> Result<Html<String>> {
    reward_page(&state, &query, EndpointKind::Cosmos).await
}

async fn reward_page(
    state: &AppState,
    query: &RewardQuery,
    kind: EndpointKind,
) -> Result<Html<String>> {
    let resolution = state
        .policy
        .resolve(query, kind)
        .await
        .map_err(local_failure)?;

    let labels = resolution.labels();
    match resolution.render() {
        Ok(html) => {
            metrics::record_reward_request(&labels);
            Ok(Html(html))
        }
        Err(e) if e.status().is_client_error() => {
            metrics::record_reward_request(&labels);
            Err(e)
        }
        Err(e) => Err(local_failure(e)),
    }
}

/// Log and count a failure that happened on our side of the request
fn local_failure(e: ApiError) -> ApiError {
    error!(error = %e, "Failed to build reward page");
    if let Some(retailer) = e.retailer() {
        metrics::record_reward_request(&RewardRequestLabels::new(
            retailer,
            e.status().as_u16(),
            NOT_APPLICABLE,
        ));
    }
    e
}
