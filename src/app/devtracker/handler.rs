//! 开发跟踪处理器

use axum::{
    extract::State,
    routing::{delete, get, post},
    Router,
};
use chrono::Utc;
use uuid::Uuid;

use super::model::*;
use crate::app::AppState;
use crate::core::extract::{ApiPath, ApiQuery, JsonBody, ValidJson};
use crate::core::response::{created, ok, ApiResult, Created};
use crate::core::view::Group;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dev-tracker", get(list_items).post(create_item))
        .route("/dev-tracker/timeline", get(timeline))
        .route(
            "/dev-tracker/:id",
            get(get_item).put(update_item).delete(delete_item),
        )
        .route("/dev-tracker/:id/status", post(change_status))
        .route("/feedback", get(list_feedback).post(submit_feedback))
        .route("/feedback/:id", delete(delete_feedback))
        .route("/feedback/:id/resolve", post(resolve_feedback))
}

async fn list_items(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DevQuery>,
) -> ApiResult<Vec<DevTrackerItem>> {
    ok(state.devtracker.list(&query).await?)
}

async fn get_item(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<DevTrackerItem> {
    ok(state.devtracker.get(id).await?)
}

async fn create_item(
    State(state): State<AppState>,
    ValidJson(form): ValidJson<DevItemForm>,
) -> Created<DevTrackerItem> {
    created(state.devtracker.create(form).await?)
}

async fn update_item(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(form): ValidJson<DevItemForm>,
) -> ApiResult<DevTrackerItem> {
    ok(state.devtracker.update(id, form).await?)
}

async fn delete_item(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<()> {
    ok(state.devtracker.delete(id).await?)
}

async fn change_status(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    JsonBody(change): JsonBody<DevStatusChange>,
) -> ApiResult<DevTrackerItem> {
    ok(state.devtracker.change_status(id, change.status).await?)
}

async fn timeline(State(state): State<AppState>) -> ApiResult<Vec<Group<TimelineRange, DevTrackerItem>>> {
    ok(state.devtracker.timeline(Utc::now()).await?)
}

async fn list_feedback(State(state): State<AppState>) -> ApiResult<Vec<Feedback>> {
    ok(state.devtracker.list_feedback().await?)
}

async fn submit_feedback(
    State(state): State<AppState>,
    ValidJson(form): ValidJson<FeedbackForm>,
) -> Created<Feedback> {
    created(state.devtracker.submit_feedback(form).await?)
}

async fn resolve_feedback(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Feedback> {
    ok(state.devtracker.resolve_feedback(id).await?)
}

async fn delete_feedback(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<()> {
    ok(state.devtracker.delete_feedback(id).await?)
}
