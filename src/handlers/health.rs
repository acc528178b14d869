use axum::response::Json;
use serde_json::json;

use crate::errors::Result;

pub async fn healthcheck() -> Result<Json<serde_json::Value>> {
    Ok(Json(json!({
        "is_alive": true,
        "app_name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}
