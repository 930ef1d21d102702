/// API Request Handlers

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::core::{ServiceHealth, StatsSnapshot};
use crate::App;

/// A whole-request failure, rendered as `500 {"error": ...}`
#[derive(Debug)]
pub struct ApiError(anyhow::Error);

impl<E: Into<anyhow::Error>> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = format!("{:#}", self.0);
        tracing::error!(error = %message, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": message }))).into_response()
    }
}

/// Run one health cycle
pub async fn get_health(State(app): State<Arc<App>>) -> Result<Json<Vec<ServiceHealth>>, ApiError> {
    let health = app.monitor.poll().await?;
    Ok(Json(health))
}

pub async fn get_stats(State(app): State<Arc<App>>) -> Json<StatsSnapshot> {
    Json(app.stats.collect().await)
}

pub async fn ping() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
