//! HTTP API for the course assistant.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/query` | Answer a question, with citations |
//! | `GET`  | `/api/courses` | Course count and titles |
//! | `DELETE` | `/api/session/{id}` | Clear a session's history |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `rate_limited` (429),
//! `upstream_error` (502), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so a browser front end
//! can be served from anywhere.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use coursemate_core::models::Citation;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::assistant::CourseAssistant;
use crate::llm::LlmError;
use crate::traits::ToolError;

/// Build the router. Exposed separately from [`run_server`] for tests.
pub fn router(assistant: Arc<CourseAssistant>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/query", post(handle_query))
        .route("/api/courses", get(handle_courses))
        .route("/api/session/{id}", delete(handle_clear_session))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(assistant)
}

/// Bind to `bind` and serve until the process is terminated.
pub async fn run_server(bind: &str, assistant: Arc<CourseAssistant>) -> anyhow::Result<()> {
    let app = router(assistant);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("coursemate listening on http://{}", bind);
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

/// Map a failed query to a status by its root cause. Model and course
/// index failures are upstream errors.
fn classify_error(err: anyhow::Error) -> AppError {
    let message = format!("{:#}", err);
    if let Some(llm) = err.downcast_ref::<LlmError>() {
        return match llm {
            LlmError::RateLimited => AppError {
                status: StatusCode::TOO_MANY_REQUESTS,
                code: "rate_limited",
                message,
            },
            _ => AppError {
                status: StatusCode::BAD_GATEWAY,
                code: "upstream_error",
                message,
            },
        };
    }
    match err.downcast_ref::<ToolError>() {
        Some(ToolError::Transport { .. }) => {
            return AppError {
                status: StatusCode::BAD_GATEWAY,
                code: "upstream_error",
                message,
            };
        }
        Some(ToolError::UnknownTool(_)) => {
            error!(error = %message, "model requested an unregistered tool");
        }
        _ => {}
    }
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message,
    }
}

// ============ POST /api/query ============

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<Citation>,
    pub session_id: String,
}

async fn handle_query(
    State(assistant): State<Arc<CourseAssistant>>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, AppError> {
    if req.query.trim().is_empty() {
        return Err(bad_request("query must not be empty"));
    }

    let result = assistant
        .answer(&req.query, req.session_id.as_deref())
        .await
        .map_err(classify_error)?;

    Ok(Json(QueryResponse {
        answer: result.answer,
        sources: result.sources,
        session_id: result.session_id,
    }))
}

// ============ GET /api/courses ============

#[derive(Debug, Serialize)]
pub struct CourseStats {
    pub total_courses: usize,
    pub course_titles: Vec<String>,
}

async fn handle_courses(
    State(assistant): State<Arc<CourseAssistant>>,
) -> Result<Json<CourseStats>, AppError> {
    let course_titles = assistant
        .store()
        .course_titles()
        .await
        .map_err(classify_error)?;

    Ok(Json(CourseStats {
        total_courses: course_titles.len(),
        course_titles,
    }))
}

// ============ DELETE /api/session/{id} ============

async fn handle_clear_session(
    State(assistant): State<Arc<CourseAssistant>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if assistant.sessions().clear_session(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(format!("no session with id: {}", id)))
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
