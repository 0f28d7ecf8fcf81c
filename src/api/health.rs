use axum::Json;
use serde_json::{Value, json};

/// Liveness probe. No dependencies are checked.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
