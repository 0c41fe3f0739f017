// Error taxonomy shared by the gateway

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Server misconfiguration (unset shared secret and similar)
    #[error("{0}")]
    Config(String),

    #[error("Missing Bearer token")]
    MissingToken,

    #[error("Invalid API key")]
    InvalidToken,

    #[error("No active storage credentials")]
    NoCredentials,

    /// One credential failed; the orchestrator moves on to the next one
    #[error("{detail}")]
    ProviderUpload {
        credential_name: String,
        detail: String,
    },

    #[error("unsupported provider {0}")]
    UnsupportedProvider(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn provider_upload(credential_name: impl Into<String>, detail: impl Into<String>) -> Self {
        AppError::ProviderUpload {
            credential_name: credential_name.into(),
            detail: detail.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingToken => StatusCode::UNAUTHORIZED,
            AppError::InvalidToken => StatusCode::FORBIDDEN,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ProviderUpload { .. } | AppError::UnsupportedProvider(_) => StatusCode::BAD_GATEWAY,
            AppError::Config(_)
            | AppError::NoCredentials
            | AppError::Database(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;
