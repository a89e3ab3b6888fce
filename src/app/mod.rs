//! 应用层：各业务模块的模型、服务与路由

pub mod aar;
pub mod auth;
pub mod calendar;
pub mod devtracker;
pub mod finance;
pub mod gear;
pub mod shared;
pub mod supply;
pub mod team;

use axum::{middleware, Router};
use std::sync::Arc;

use crate::config::Config;
use crate::infrastructure::Store;

/// 处理器共享的状态，克隆开销只有若干个 `Arc`
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Store,
    pub team: team::TeamService,
    pub gear: gear::GearService,
    pub supply: supply::SupplyService,
    pub aar: aar::AarService,
    pub finance: finance::FinanceService,
    pub calendar: calendar::CalendarService,
    pub devtracker: devtracker::DevTrackerService,
    pub auth: auth::AuthService,
}

impl AppState {
    pub fn new(config: Config, store: Store) -> Self {
        Self {
            team: team::TeamService::new(store.clone()),
            gear: gear::GearService::new(store.clone()),
            supply: supply::SupplyService::new(store.clone()),
            aar: aar::AarService::new(store.clone(), config.farm.week_starts_on_monday),
            finance: finance::FinanceService::new(store.clone()),
            calendar: calendar::CalendarService::new(store.clone()),
            devtracker: devtracker::DevTrackerService::new(store.clone()),
            auth: auth::AuthService::new(&config.auth),
            config: Arc::new(config),
            store,
        }
    }
}

/// `/api` 下的全部路由；除登录外都经过认证中间件
pub fn api_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .merge(team::handler::routes())
        .merge(gear::handler::routes())
        .merge(supply::handler::routes())
        .merge(aar::handler::routes())
        .merge(finance::handler::routes())
        .merge(calendar::handler::routes())
        .merge(devtracker::handler::routes())
        .merge(auth::handler::routes())
        .route_layer(middleware::from_fn_with_state(state, auth::middleware::require_auth));

    Router::new()
        .merge(auth::handler::public_routes())
        .merge(protected)
}
