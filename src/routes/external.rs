//! External upload API
//!
//! Both routes sit behind the shared-secret bearer check:
//! - `POST /api/external/upload` - multipart `file` (+ optional `provider`), failover upload
//! - `POST /api/external/signature` - client-side signing material for one credential

use axum::{
    extract::{
        multipart::{Multipart, MultipartRejection},
        DefaultBodyLimit, State,
    },
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use tracing::{info, warn};

use crate::middleware::require_upload_key;
use crate::models::{
    AppState, SignatureRequest, SignatureResponse, StorageProvider, UploadFailureResponse,
    UploadOutcome, UploadRequest, UploadSuccessResponse,
};
use crate::storage::{CredentialPool, UploadOrchestrator};
use crate::types::{AppError, AppResult};

const FILE_REQUIRED: &str = "file is required";
const DEFAULT_FILE_NAME: &str = "upload";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/external/upload", post(external_upload))
        .route("/api/external/signature", post(upload_signature))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_upload_key))
        .layer(DefaultBodyLimit::max(state.config.upload.max_upload_bytes))
        .with_state(state)
}

async fn external_upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Response> {
    let mut multipart = multipart.map_err(|e| {
        warn!("Upload without a multipart body: {}", e);
        AppError::InvalidRequest(FILE_REQUIRED.to_string())
    })?;

    let request = read_upload_form(&mut multipart).await?;
    info!(
        file_name = %request.file_name,
        size = request.file_bytes.len(),
        filter = ?request.provider_filter,
        "External upload request received"
    );

    let orchestrator = UploadOrchestrator::new(
        CredentialPool::new(state.credentials.clone()),
        state.adapters.clone(),
    );

    let response = match orchestrator.upload(&request).await? {
        UploadOutcome::Success { file, credential_name } => (
            StatusCode::OK,
            Json(UploadSuccessResponse {
                success: true,
                data: file,
                provider: credential_name,
            }),
        )
            .into_response(),
        UploadOutcome::Exhausted { errors } => (
            StatusCode::BAD_GATEWAY,
            Json(UploadFailureResponse {
                success: false,
                errors,
            }),
        )
            .into_response(),
    };

    Ok(response)
}

/// Pull `file` and `provider` out of the form; other fields are ignored
async fn read_upload_form(multipart: &mut Multipart) -> AppResult<UploadRequest> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut provider: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidRequest(e.body_text()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            // A `file` part without a filename is a plain form field, not an upload
            Some("file") if field.file_name().is_some() => {
                let file_name = field
                    .file_name()
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .unwrap_or(DEFAULT_FILE_NAME)
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::InvalidRequest(e.body_text()))?;
                file = Some((file_name, bytes.to_vec()));
            }
            Some("provider") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::InvalidRequest(e.body_text()))?;
                provider = Some(value);
            }
            _ => {}
        }
    }

    let (file_name, file_bytes) = file.ok_or_else(|| AppError::InvalidRequest(FILE_REQUIRED.to_string()))?;

    Ok(UploadRequest {
        file_bytes,
        file_name,
        provider_filter: parse_provider_filter(provider.as_deref())?,
    })
}

/// Empty means no filter. A provider nobody knows can match no credential.
fn parse_provider_filter(value: Option<&str>) -> AppResult<Option<StorageProvider>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(id) => match StorageProvider::from_id(id) {
            Some(provider) => Ok(Some(provider)),
            None => {
                warn!(provider = %id, "Upload requested an unknown provider");
                Err(AppError::NoCredentials)
            }
        },
    }
}

async fn upload_signature(
    State(state): State<AppState>,
    Json(request): Json<SignatureRequest>,
) -> AppResult<Json<SignatureResponse>> {
    let credential = state
        .credentials
        .list_credentials()
        .await?
        .into_iter()
        .find(|c| c.id == request.credential_id && c.is_active)
        .ok_or_else(|| AppError::NotFound(format!("credential {}", request.credential_id)))?;

    let signature = state
        .adapters
        .sign(&credential, &request.file_name)?
        .ok_or_else(|| {
            AppError::InvalidRequest(format!("Signature not supported for provider {}", credential.provider))
        })?;

    info!(credential = %credential.name, "Issued upload signature");

    Ok(Json(SignatureResponse {
        success: true,
        provider: credential.name,
        signature,
    }))
}
