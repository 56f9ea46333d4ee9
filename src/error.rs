use axum::{http::StatusCode, response::IntoResponse};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("unknown report table: {0}")]
    TableNotFound(String),

    #[error("unknown column: {0}")]
    ColumnNotFound(String),

    #[error("invalid metric: {0}")]
    InvalidMetric(String),

    #[error("Graph API credentials not configured")]
    CredentialsMissing,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::TableNotFound(_) | AppError::ColumnNotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidMetric(_) | AppError::CredentialsMissing | AppError::Config(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}
