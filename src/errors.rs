use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage unavailable after {attempts} attempts")]
    StorageUnavailable {
        attempts: u32,
        #[source]
        source: sqlx::Error,
    },

    #[error("Redemption append outcome unknown: {0}")]
    AppendStatusUnknown(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error")
            }
            AppError::Migrate(ref e) => {
                tracing::error!("Migration error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error")
            }
            AppError::Validation(ref msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            AppError::StorageUnavailable { attempts, ref source } => {
                tracing::error!("Storage unavailable after {} attempts: {}", attempts, source);
                (StatusCode::SERVICE_UNAVAILABLE, "Storage unavailable")
            }
            AppError::AppendStatusUnknown(ref msg) => {
                tracing::error!("Redemption append outcome unknown: {}", msg);
                (StatusCode::BAD_GATEWAY, "Redemption status unknown")
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
