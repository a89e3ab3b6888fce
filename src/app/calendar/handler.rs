//! 日历处理器

use axum::{
    extract::State,
    routing::get,
    Router,
};

use super::model::CalendarDay;
use crate::app::{
    shared::{today, DateRange},
    AppState,
};
use crate::core::extract::ApiQuery;
use crate::core::response::{ok, ApiResult};

pub fn routes() -> Router<AppState> {
    Router::new().route("/calendar", get(agenda))
}

async fn agenda(State(state): State<AppState>, ApiQuery(range): ApiQuery<DateRange>) -> ApiResult<Vec<CalendarDay>> {
    ok(state.calendar.agenda(range, today()).await?)
}
