//! Route handlers.

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use chrono::Utc;
use helpdesk_core::{Case, CaseError, CaseId, CaseStatus, Category, ConversationSummary, MessageId, Role};
use helpdesk_runtime::{AnalyticsReport, CaseDetails, analytics};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::auth::AuthUser;
use super::error::ApiError;
use crate::health::{self, HealthResponse};
use crate::server::AppState;

const STAFF: &[Role] = &[Role::Agent, Role::LeadAgent];

/// Parse an optional JSON body; an empty body means all defaults.
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| ApiError(CaseError::Validation(format!("invalid request body: {e}"))))
}

/// `POST /complaints` body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateComplaint {
    /// Defaults to OTHER.
    pub category: Option<Category>,
}

/// `GET /complaints` query.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Status filter.
    pub status: Option<CaseStatus>,
}

/// `POST /complaints/{id}/summarize` body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeRequest {
    /// Messages to include; all of them when absent.
    pub message_ids: Option<Vec<MessageId>>,
}

/// POST /complaints
pub async fn create_complaint(
    State(state): State<AppState>,
    auth: AuthUser,
    body: Bytes,
) -> Result<(StatusCode, Json<Case>), ApiError> {
    let who = auth.require(&[Role::User], "file complaints")?;
    let request: CreateComplaint = parse_body(&body)?;
    let case = state.lifecycle.create(who.user_id, request.category).await?;
    Ok((StatusCode::CREATED, Json(case)))
}

/// GET /complaints
pub async fn list_complaints(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<CaseDetails>>, ApiError> {
    let Query(query) =
        query.map_err(|e| ApiError(CaseError::Validation(format!("invalid query: {e}"))))?;
    Ok(Json(state.lifecycle.list_for(&who, query.status).await?))
}

/// GET /complaints/{id}
pub async fn get_complaint(
    State(state): State<AppState>,
    AuthUser(who): AuthUser,
    Path(case_id): Path<CaseId>,
) -> Result<Json<CaseDetails>, ApiError> {
    Ok(Json(state.lifecycle.details_for(&who, case_id).await?))
}

/// POST /complaints/{id}/assign
pub async fn assign_complaint(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(case_id): Path<CaseId>,
) -> Result<Json<Case>, ApiError> {
    let who = auth.require(STAFF, "take complaints")?;
    Ok(Json(state.lifecycle.assign(case_id, who.user_id).await?))
}

/// POST /complaints/{id}/resolve
pub async fn resolve_complaint(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(case_id): Path<CaseId>,
) -> Result<Json<CaseDetails>, ApiError> {
    let who = auth.require(&[Role::User], "resolve complaints")?;
    let _ = state.lifecycle.resolve_by_user(case_id, who.user_id).await?;
    Ok(Json(state.lifecycle.details_for(&who, case_id).await?))
}

/// POST /complaints/{id}/summarize
pub async fn summarize_complaint(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(case_id): Path<CaseId>,
    body: Bytes,
) -> Result<Json<ConversationSummary>, ApiError> {
    let who = auth.require(STAFF, "summarize complaints")?;
    let request: SummarizeRequest = parse_body(&body)?;
    let summary = state
        .lifecycle
        .summarize(&who, case_id, request.message_ids)
        .await?;
    Ok(Json(summary))
}

/// GET /analytics
pub async fn get_analytics(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<AnalyticsReport>, ApiError> {
    let _ = auth.require(&[Role::LeadAgent], "view analytics")?;
    let report = analytics(state.lifecycle.store().as_ref(), Utc::now()).await?;
    Ok(Json(report))
}

/// GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.start_time,
        state.rooms.connection_count(),
        state.rooms.room_count(),
    ))
}

/// GET /metrics
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(CONTENT_TYPE, "text/plain; version=0.0.4")],
            crate::metrics::render(handle),
        ),
        None => (
            StatusCode::NOT_FOUND,
            [(CONTENT_TYPE, "text/plain; version=0.0.4")],
            String::new(),
        ),
    }
}
