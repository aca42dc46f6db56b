use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde_json::{Value, json};

use super::AppState;
use crate::db::Store;

/// 200 when every check passes, 503 otherwise. The body lists each check.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let is_database_online = match state.store.ping().await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(error = %err, "database health check failed");
            false
        }
    };

    let status = if is_database_online {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(json!({ "is_database_online": is_database_online })))
}
