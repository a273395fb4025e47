//! Render API handlers.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use sketchloop_core::{Job, RenderError, SubmitRequest};

use crate::state::AppState;

/// Maximum allowed limit for job listings
const MAX_LIMIT: usize = 100;

/// Default limit for job listings
const DEFAULT_LIMIT: usize = 20;

/// Multipart field carrying the drawing.
const IMAGE_FIELD: &str = "image";

/// Multipart field carrying the optional variant hint.
const DEMO_INDEX_FIELD: &str = "demoIndex";

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for listing jobs
#[derive(Debug, Deserialize)]
pub struct ListRendersParams {
    /// Maximum number of jobs to return
    pub limit: Option<usize>,
}

/// Error body returned by every render endpoint
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn render_error(err: RenderError) -> ApiError {
    let status = match &err {
        RenderError::Busy => StatusCode::TOO_MANY_REQUESTS,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    api_error(status, err.to_string())
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/render - run one render job and return its final record.
pub async fn submit_render(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<Job>, ApiError> {
    let request = read_submission(multipart).await?;
    let job = state.render().submit(request).await.map_err(render_error)?;
    Ok(Json(job))
}

/// GET /api/render/{id}
pub async fn get_render(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    match state.store().get(&id) {
        Ok(Some(job)) => Ok(Json(job)),
        Ok(None) => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("Job not found: {}", id),
        )),
        Err(e) => Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

/// GET /api/renders - most recent jobs first.
pub async fn list_renders(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListRendersParams>,
) -> Result<Json<Vec<Job>>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    state
        .store()
        .list_recent(limit)
        .map(Json)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

/// Pulls the image and variant hint out of the multipart body.
///
/// Unknown fields are skipped. A missing or empty image is a 400.
async fn read_submission(mut multipart: Multipart) -> Result<SubmitRequest, ApiError> {
    let mut image = None;
    let mut original_name = None;
    let mut demo_index = 0;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.body_text()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(IMAGE_FIELD) => {
                original_name = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.body_text()))?;
                image = Some(bytes);
            }
            Some(DEMO_INDEX_FIELD) => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.body_text()))?;
                demo_index = parse_demo_index(&text);
            }
            other => {
                debug!(field = ?other, "Ignoring unknown multipart field");
            }
        }
    }

    let image = match image {
        Some(bytes) if !bytes.is_empty() => bytes,
        _ => return Err(api_error(StatusCode::BAD_REQUEST, "No image uploaded")),
    };

    let mut request = SubmitRequest::new(image).with_demo_index(demo_index);
    if let Some(name) = original_name {
        request = request.with_original_name(name);
    }
    Ok(request)
}

/// Lenient integer parse: anything unparseable becomes 0.
fn parse_demo_index(text: &str) -> i32 {
    let trimmed = text.trim();
    trimmed.parse().unwrap_or_else(|_| {
        if !trimmed.is_empty() {
            warn!(value = trimmed, "Ignoring unparseable demoIndex");
        }
        0
    })
}
