//! Scheduled post routes over [`PostStore`](crate::services::scheduler::PostStore).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::error::ApiError;
use crate::services::Envelope;
use crate::services::scheduler::{
    self, CalendarMonth, NewPost, PostStatus, PostUpdate, PublishOutcome, ScheduledPost, SchedulerError,
};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<PostStatus>,
}

#[derive(Debug, Deserialize)]
pub struct RescheduleBody {
    pub scheduled_time: String,
}

pub(crate) fn scheduler_error(e: &SchedulerError) -> ApiError {
    let status = match e {
        SchedulerError::NotFound(_) => StatusCode::NOT_FOUND,
        SchedulerError::InvalidTime(_)
        | SchedulerError::InvalidMonth(_)
        | SchedulerError::EmptyContent
        | SchedulerError::UnsupportedPlatform(_)
        | SchedulerError::StatusNotSettable(_) => StatusCode::BAD_REQUEST,
        SchedulerError::Busy(_) | SchedulerError::AlreadyPublished(_) => StatusCode::CONFLICT,
        SchedulerError::PlatformUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        SchedulerError::Publish(_) => StatusCode::BAD_GATEWAY,
    };
    ApiError::from_code(status, e)
}

fn enveloped<T>(result: Result<T, SchedulerError>) -> Result<Json<Envelope<T>>, ApiError> {
    result.map(|data| Json(Envelope::ok(data))).map_err(|e| scheduler_error(&e))
}

/// `GET /api/scheduled-posts?status=`: ordered by scheduled time.
pub async fn list(State(state): State<AppState>, Query(query): Query<ListQuery>) -> Json<Envelope<Vec<ScheduledPost>>> {
    Json(Envelope::ok(state.posts.list(query.status).await))
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<NewPost>,
) -> Result<(StatusCode, Json<Envelope<ScheduledPost>>), ApiError> {
    let post = state.posts.create(body).await.map_err(|e| scheduler_error(&e))?;
    Ok((StatusCode::CREATED, Json(Envelope::ok(post))))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Envelope<ScheduledPost>>, ApiError> {
    enveloped(state.posts.get(id).await)
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<PostUpdate>,
) -> Result<Json<Envelope<ScheduledPost>>, ApiError> {
    enveloped(state.posts.update(id, patch).await)
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Value>, ApiError> {
    state.posts.delete(id).await.map_err(|e| scheduler_error(&e))?;
    Ok(Json(json!({ "success": true, "message": "Post deleted successfully" })))
}

pub async fn reschedule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<RescheduleBody>,
) -> Result<Json<Envelope<ScheduledPost>>, ApiError> {
    enveloped(state.posts.reschedule(id, &body.scheduled_time).await)
}

/// `POST /api/scheduled-posts/:id/publish`: publish now, ignoring the
/// scheduled time.
pub async fn publish(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Envelope<PublishOutcome>>, ApiError> {
    enveloped(scheduler::publish_now(&state.posts, state.platform.as_deref(), id).await)
}

pub async fn calendar(
    State(state): State<AppState>,
    Path((year, month)): Path<(i32, u8)>,
) -> Result<Json<Envelope<CalendarMonth>>, ApiError> {
    enveloped(state.posts.calendar(year, month).await)
}
