//! Liveness and readiness probes

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde_json::{Map, Value, json};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/livez", get(livez))
        .route("/readyz", get(readyz))
}

async fn livez() -> Json<Value> {
    Json(json!({}))
}

async fn readyz(State(state): State<AppState>) -> (StatusCode, Json<Map<String, Value>>) {
    let errors: Map<String, Value> = state
        .readiness
        .check()
        .await
        .into_iter()
        .map(|(component, reason)| (component, Value::String(reason)))
        .collect();

    let status = if errors.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(errors))
}
