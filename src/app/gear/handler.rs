//! 装备处理器

use axum::{
    extract::State,
    routing::{get, post, put},
    Router,
};
use uuid::Uuid;

use super::model::*;
use crate::app::{shared::today, AppState};
use crate::core::extract::{ApiPath, ApiQuery, JsonBody, ValidJson};
use crate::core::response::{created, ok, ApiResult, Created};
use crate::core::view::Group;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/gear", get(list_gear).post(create_gear))
        .route("/gear/grouped", get(grouped_gear))
        .route("/gear/expiring", get(expiring))
        .route("/gear/:id", get(get_gear).put(update_gear).delete(delete_gear))
        .route("/gear/:id/assign", post(assign_gear))
        .route("/gear/:id/unassign", post(unassign_gear))
        .route("/gear/:id/contents", post(add_content))
        .route(
            "/gear/:id/contents/:item_id",
            put(update_content).delete(remove_content),
        )
}

async fn list_gear(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<GearQuery>,
) -> ApiResult<Vec<GearItem>> {
    ok(state.gear.list(&query).await?)
}

async fn grouped_gear(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<GearQuery>,
) -> ApiResult<Vec<Group<String, GearItem>>> {
    ok(state.gear.grouped(&query).await?)
}

async fn get_gear(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<GearItem> {
    ok(state.gear.get(id).await?)
}

async fn create_gear(
    State(state): State<AppState>,
    ValidJson(form): ValidJson<GearForm>,
) -> Created<GearItem> {
    created(state.gear.create(form).await?)
}

async fn update_gear(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(form): ValidJson<GearForm>,
) -> ApiResult<GearItem> {
    ok(state.gear.update(id, form).await?)
}

async fn delete_gear(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<()> {
    ok(state.gear.delete(id).await?)
}

async fn assign_gear(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    JsonBody(req): JsonBody<AssignRequest>,
) -> ApiResult<GearItem> {
    ok(state.gear.assign(id, req.member_id).await?)
}

async fn unassign_gear(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<GearItem> {
    ok(state.gear.unassign(id).await?)
}

async fn add_content(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(form): ValidJson<ContainerItemForm>,
) -> Created<GearItem> {
    created(state.gear.add_content(id, form).await?)
}

async fn update_content(
    State(state): State<AppState>,
    ApiPath((id, item_id)): ApiPath<(Uuid, Uuid)>,
    ValidJson(form): ValidJson<ContainerItemForm>,
) -> ApiResult<GearItem> {
    ok(state.gear.update_content(id, item_id, form).await?)
}

async fn remove_content(
    State(state): State<AppState>,
    ApiPath((id, item_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<GearItem> {
    ok(state.gear.remove_content(id, item_id).await?)
}

async fn expiring(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ExpiringQuery>,
) -> ApiResult<Vec<ExpiringItem>> {
    let within_days = query
        .within_days
        .unwrap_or(state.config.farm.expiring_within_days);
    ok(state.gear.expiring(within_days, today()).await?)
}
