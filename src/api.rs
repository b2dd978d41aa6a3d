use crate::auth::AdminAuth;
use crate::error::{AuthError, StoreError};
use crate::models::{
    Category, ChangePasswordRequest, DocumentListResponse, DocumentRecord, ListQuery,
    LoginRequest, LoginResponse, PublicDocument, SweepResponse,
};
use crate::store::DocumentStore;
use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

/// Room for multipart boundaries and the category field on top of the file.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub struct AppState {
    pub store: Arc<DocumentStore>,
    pub auth: Arc<AdminAuth>,
    pub max_upload_bytes: usize,
}

pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/public-docs", get(public_documents))
        .route("/api/documents/:id/download", get(download_document))
        .route("/admin/login", post(login))
        .route("/admin/logout", post(logout))
        .route("/admin/password", post(change_password))
        .route("/admin/documents", get(list_documents).post(upload_document))
        .route("/admin/documents/:id", delete(delete_document))
        .route("/admin/sweep", post(sweep))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("invalid upload: {0}")]
    Multipart(#[from] MultipartError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("file exceeds the {0} byte upload limit")]
    PayloadTooLarge(usize),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Store(StoreError::InvalidCategory(_)) => StatusCode::BAD_REQUEST,
            ApiError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Auth(AuthError::InvalidCredentials | AuthError::Unauthorized) => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::Auth(AuthError::WeakPassword(_) | AuthError::PasswordMismatch) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Auth(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Multipart(e) => e.status(),
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

async fn require_admin<'a>(state: &AppState, headers: &'a HeaderMap) -> Result<&'a str, ApiError> {
    let token = bearer_token(headers).ok_or(AuthError::Unauthorized)?;
    state.auth.authorize(token).await?;
    Ok(token)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy", "message": "document service is running" }))
}

async fn public_documents(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PublicDocument>>, ApiError> {
    let records = state.store.list(Some(Category::Public)).await?;
    Ok(Json(records.into_iter().map(PublicDocument::from).collect()))
}

async fn download_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let (record, bytes) = state.store.read(&id).await?;
    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        header_safe_filename(&record.original_name)
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/octet-stream")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let response = state.auth.login(&payload.username, &payload.password).await?;
    Ok(Json(response))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let token = require_admin(&state, &headers).await?;
    state.auth.logout(token).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn change_password(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    require_admin(&state, &headers).await?;
    state
        .auth
        .change_password(&payload.new_password, &payload.confirm_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_documents(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<DocumentListResponse>, ApiError> {
    require_admin(&state, &headers).await?;
    let category = query
        .category
        .as_deref()
        .map(str::parse::<Category>)
        .transpose()?;

    let documents = state.store.list(category).await?;
    Ok(Json(DocumentListResponse { documents }))
}

/// Multipart form with a `document` file field and a `category` text field.
async fn upload_document(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<DocumentRecord>), ApiError> {
    require_admin(&state, &headers).await?;

    let mut document: Option<(String, Vec<u8>)> = None;
    let mut category: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        match field.name().unwrap_or_default() {
            "document" => {
                let name = field
                    .file_name()
                    .map(base_name)
                    .filter(|n| !n.is_empty())
                    .unwrap_or("upload.bin")
                    .to_string();
                let bytes = field.bytes().await?;
                if bytes.len() > state.max_upload_bytes {
                    return Err(ApiError::PayloadTooLarge(state.max_upload_bytes));
                }
                document = Some((name, bytes.to_vec()));
            }
            "category" => category = Some(field.text().await?),
            _ => {}
        }
    }

    let category: Category = category
        .ok_or_else(|| ApiError::BadRequest("missing category field".to_string()))?
        .parse()?;
    let (original_name, bytes) = document
        .ok_or_else(|| ApiError::BadRequest("no document provided".to_string()))?;

    let record = state.store.create(&original_name, &bytes, category).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn delete_document(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require_admin(&state, &headers).await?;
    state.store.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn sweep(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SweepResponse>, ApiError> {
    require_admin(&state, &headers).await?;
    let expired_removed = state.store.sweep_expired().await?;
    let orphans_removed = state.store.sweep_orphans().await?;

    info!(expired_removed, orphans_removed, "manual sweep finished");
    Ok(Json(SweepResponse {
        expired_removed,
        orphans_removed,
    }))
}

/// Browsers send bare names, but some clients include the local path.
fn base_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name).trim()
}

fn header_safe_filename(name: &str) -> String {
    let safe: String = name
        .chars()
        .filter(|c| (c.is_ascii_graphic() || *c == ' ') && *c != '"' && *c != '\\')
        .collect();
    if safe.trim().is_empty() {
        "download".to_string()
    } else {
        safe
    }
}
