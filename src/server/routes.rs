//! Route handlers.

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::AppState;
use super::wire::{
    ApproveRequest, DataResponse, RejectRequest, ReviewsResponse, ScheduleResponse, StatusUpdate,
    SuccessResponse, TasksResponse,
};
use crate::domain::{DataStatus, DataType, PullTask, ReviewTask};
use crate::error::ApiError;
use crate::review::Decision;
use crate::tasks::{NewTask, TaskFilter};

const INVALID_TYPE: &str = "Invalid data type";
const INVALID_BODY: &str = "Invalid request body";
const POINT_NOT_FOUND: &str = "Data point not found";

#[derive(Debug, Deserialize)]
pub(super) struct DataQuery {
    #[serde(rename = "type")]
    kind: Option<String>,
}

pub(super) async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "alive",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub(super) async fn get_data(
    State(state): State<AppState>,
    query: Result<Query<DataQuery>, QueryRejection>,
) -> Result<Json<DataResponse>, ApiError> {
    let kind: DataType = query
        .ok()
        .and_then(|Query(q)| q.kind)
        .and_then(|k| k.parse().ok())
        .ok_or_else(|| ApiError::BadRequest(INVALID_TYPE.to_string()))?;

    let data = state.data.get_data(kind);
    debug!(kind = %kind, points = data.len(), "served dataset");
    Ok(Json(DataResponse { data }))
}

pub(super) async fn post_data(
    State(state): State<AppState>,
    body: Result<Json<StatusUpdate>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Json(update) = body.map_err(|_| ApiError::BadRequest(INVALID_BODY.to_string()))?;
    if update.id.trim().is_empty() {
        return Err(ApiError::BadRequest(INVALID_BODY.to_string()));
    }
    let status: DataStatus = update
        .status
        .parse()
        .map_err(|_| ApiError::BadRequest(INVALID_BODY.to_string()))?;

    if !state.data.update_data_status(&update.id, status) {
        return Err(ApiError::NotFound(POINT_NOT_FOUND.to_string()));
    }
    Ok(Json(SuccessResponse { success: true }))
}

pub(super) async fn schedule(State(state): State<AppState>) -> Json<ScheduleResponse> {
    Json(ScheduleResponse {
        tasks: state.data.schedule(),
    })
}

pub(super) async fn list_reviews(State(state): State<AppState>) -> Result<Json<ReviewsResponse>, ApiError> {
    let mut reviews = state.reviews.list()?;
    reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let counts = state.reviews.counts()?;
    Ok(Json(ReviewsResponse { reviews, counts }))
}

pub(super) async fn get_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ReviewTask>, ApiError> {
    Ok(Json(state.reviews.get(&id)?))
}

pub(super) async fn approve_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<ReviewTask>, ApiError> {
    let req: ApproveRequest = parse_body(&body)?;
    let decision = Decision {
        comment: req.comment,
        reviewer: req.reviewer,
    };
    Ok(Json(state.reviews.approve(&id, &req.edits, decision)?))
}

pub(super) async fn reject_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<ReviewTask>, ApiError> {
    let req: RejectRequest = parse_body(&body)?;
    let decision = Decision {
        comment: req.comment,
        reviewer: req.reviewer,
    };
    Ok(Json(state.reviews.reject(&id, decision)?))
}

pub(super) async fn list_tasks(
    State(state): State<AppState>,
    filter: Result<Query<TaskFilter>, QueryRejection>,
) -> Result<Json<TasksResponse>, ApiError> {
    let Query(filter) = filter.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    Ok(Json(TasksResponse {
        tasks: state.tasks.list(&filter),
    }))
}

pub(super) async fn create_task(
    State(state): State<AppState>,
    body: Result<Json<NewTask>, JsonRejection>,
) -> Result<(StatusCode, Json<PullTask>), ApiError> {
    let Json(spec) = body.map_err(|_| ApiError::BadRequest(INVALID_BODY.to_string()))?;
    let task = state.tasks.create(spec)?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub(super) async fn start_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PullTask>, ApiError> {
    Ok(Json(state.tasks.start(&id)?))
}

pub(super) async fn stop_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PullTask>, ApiError> {
    Ok(Json(state.tasks.stop(&id)?))
}

/// Decode an optional JSON body; an empty body means "all defaults".
fn parse_body<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|_| ApiError::BadRequest(INVALID_BODY.to_string()))
}
