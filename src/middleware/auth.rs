// Shared-secret bearer authentication for external clients

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::models::AppState;
use crate::types::{AppError, AppResult};

const BEARER_PREFIX: &str = "Bearer ";

/// Trim, then drop everything outside `[A-Za-z0-9_\-.~]`
pub fn sanitize_api_key(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '~'))
        .collect()
}

/// Check an `Authorization` header value against the configured secret.
///
/// Order matters: an unconfigured secret is a server error even for callers
/// that send no header at all.
pub fn authorize(header: Option<&str>, configured_secret: &str) -> AppResult<()> {
    let expected = sanitize_api_key(configured_secret);
    if expected.is_empty() {
        return Err(AppError::Config("EXTERNAL_UPLOAD_API_KEY not configured".to_string()));
    }

    let header = header
        .filter(|value| value.starts_with(BEARER_PREFIX))
        .ok_or(AppError::MissingToken)?;
    // Every "Bearer " is dropped, not just the scheme prefix
    let token = header.replace(BEARER_PREFIX, "");

    if constant_time_compare(sanitize_api_key(&token).as_bytes(), expected.as_bytes()) {
        Ok(())
    } else {
        Err(AppError::InvalidToken)
    }
}

/// Compares in time independent of where the first mismatch is.
/// Returns `false` if lengths differ, after still walking max(len1, len2) bytes.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    let max_len = std::cmp::max(a.len(), b.len());
    let mut diff = (a.len() != b.len()) as u8;
    for i in 0..max_len {
        let byte_a = a.get(i).copied().unwrap_or(0);
        let byte_b = b.get(i).copied().unwrap_or(0);
        diff |= byte_a ^ byte_b;
    }
    diff == 0
}

/// Layer for `/api/external/*`; runs before the body is read
pub async fn require_upload_key(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    match authorize(header, &state.config.auth.external_upload_api_key) {
        Ok(()) => next.run(req).await,
        Err(e) => {
            if matches!(e, AppError::MissingToken | AppError::InvalidToken) {
                warn!(path = %req.uri().path(), "Rejected external request: {}", e);
            }
            e.into_response()
        }
    }
}
