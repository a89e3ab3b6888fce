//! 周复盘处理器

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use uuid::Uuid;

use super::model::*;
use crate::app::AppState;
use crate::core::extract::{ApiPath, JsonBody, ValidJson};
use crate::core::response::{created, ok, ApiResult, Created};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/aars", get(list_aars).post(create_aar))
        .route("/aars/action-items/open", get(open_action_items))
        .route("/aars/week/:date", get(get_week))
        .route("/aars/:id", get(get_aar).put(update_aar).delete(delete_aar))
        .route("/aars/:id/observations", post(add_observation))
        .route("/aars/:id/action-items", post(add_action_item))
        .route("/aars/:id/action-items/:item_id/status", post(set_action_status))
}

async fn list_aars(State(state): State<AppState>) -> ApiResult<Vec<WeeklyAar>> {
    ok(state.aar.list().await?)
}

async fn get_aar(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<WeeklyAar> {
    ok(state.aar.get(id).await?)
}

async fn get_week(State(state): State<AppState>, ApiPath(date): ApiPath<NaiveDate>) -> ApiResult<WeeklyAar> {
    ok(state.aar.find_week(date).await?)
}

async fn create_aar(State(state): State<AppState>, ValidJson(form): ValidJson<AarForm>) -> Created<WeeklyAar> {
    created(state.aar.create(form).await?)
}

async fn update_aar(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(form): ValidJson<AarForm>,
) -> ApiResult<WeeklyAar> {
    ok(state.aar.update(id, form).await?)
}

async fn delete_aar(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<()> {
    ok(state.aar.delete(id).await?)
}

async fn add_observation(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(form): ValidJson<ObservationForm>,
) -> Created<WeeklyAar> {
    created(state.aar.add_observation(id, form).await?)
}

async fn add_action_item(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(form): ValidJson<ActionItemForm>,
) -> Created<WeeklyAar> {
    created(state.aar.add_action_item(id, form).await?)
}

async fn set_action_status(
    State(state): State<AppState>,
    ApiPath((id, item_id)): ApiPath<(Uuid, Uuid)>,
    JsonBody(change): JsonBody<ActionStatusChange>,
) -> ApiResult<WeeklyAar> {
    ok(state.aar.set_action_status(id, item_id, change.status).await?)
}

async fn open_action_items(State(state): State<AppState>) -> ApiResult<Vec<OpenActionItem>> {
    ok(state.aar.open_action_items().await?)
}
