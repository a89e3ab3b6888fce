//! 物资申请处理器

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use super::model::*;
use crate::app::AppState;
use crate::core::extract::{ApiPath, ApiQuery, JsonBody, ValidJson};
use crate::core::response::{created, ok, ApiResult, Created};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/supply-requests", get(list_requests).post(create_request))
        .route(
            "/supply-requests/:id",
            get(get_request).put(update_request).delete(delete_request),
        )
        .route("/supply-requests/:id/status", post(change_status))
}

async fn list_requests(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SupplyQuery>,
) -> ApiResult<SupplyList> {
    ok(state.supply.list(&query).await?)
}

async fn get_request(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<SupplyRequest> {
    ok(state.supply.get(id).await?)
}

async fn create_request(
    State(state): State<AppState>,
    ValidJson(form): ValidJson<SupplyRequestForm>,
) -> Created<SupplyRequest> {
    created(state.supply.create(form).await?)
}

async fn update_request(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(form): ValidJson<SupplyRequestForm>,
) -> ApiResult<SupplyRequest> {
    ok(state.supply.update(id, form).await?)
}

async fn delete_request(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<()> {
    ok(state.supply.delete(id).await?)
}

async fn change_status(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    JsonBody(change): JsonBody<StatusChange>,
) -> ApiResult<SupplyRequest> {
    ok(state.supply.change_status(id, change).await?)
}
