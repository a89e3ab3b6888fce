//! 团队处理器

use axum::{
    extract::State,
    routing::get,
    Router,
};
use uuid::Uuid;

use super::model::*;
use crate::app::{shared::today, AppState};
use crate::core::extract::{ApiPath, ApiQuery, ValidJson};
use crate::core::response::{created, ok, ApiResult, Created};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/team/members", get(list_members).post(create_member))
        .route(
            "/team/members/:id",
            get(get_member).put(update_member).delete(delete_member),
        )
        .route("/team/members/:id/vitals", get(list_vitals).post(add_vital))
        .route("/team/members/:id/weights", get(list_weights).post(add_weight))
        .route("/team/checkins", get(list_checkins).post(submit_checkin))
        .route("/team/overview", get(overview))
}

async fn list_members(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<MemberQuery>,
) -> ApiResult<Vec<TeamMember>> {
    ok(state.team.list_members(&query).await?)
}

async fn get_member(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<TeamMember> {
    ok(state.team.get_member(id).await?)
}

async fn create_member(
    State(state): State<AppState>,
    ValidJson(form): ValidJson<MemberForm>,
) -> Created<TeamMember> {
    created(state.team.create_member(form).await?)
}

async fn update_member(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(form): ValidJson<MemberForm>,
) -> ApiResult<TeamMember> {
    ok(state.team.update_member(id, form).await?)
}

async fn delete_member(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<()> {
    ok(state.team.delete_member(id).await?)
}

async fn submit_checkin(
    State(state): State<AppState>,
    ValidJson(form): ValidJson<CheckinForm>,
) -> Created<DailyCheckin> {
    created(state.team.submit_checkin(form, today()).await?)
}

async fn list_checkins(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CheckinQuery>,
) -> ApiResult<Vec<DailyCheckin>> {
    ok(state.team.list_checkins(&query).await?)
}

async fn add_vital(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(form): ValidJson<VitalForm>,
) -> Created<Vital> {
    created(state.team.add_vital(id, form).await?)
}

async fn list_vitals(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Vec<Vital>> {
    ok(state.team.list_vitals(id).await?)
}

async fn add_weight(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ValidJson(form): ValidJson<WeightForm>,
) -> Created<WeightLog> {
    created(state.team.add_weight(id, form, today()).await?)
}

async fn list_weights(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Vec<WeightLog>> {
    state.team.get_member(id).await?;
    ok(state.team.list_weights(id).await?)
}

async fn overview(State(state): State<AppState>) -> ApiResult<TeamOverview> {
    ok(state.team.overview(today()).await?)
}
