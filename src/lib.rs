//! # Homestead
//!
//! 农场管理后端：团队名册与健康记录、装备库存、物资申请、周复盘、
//! 财务与产出、日历和开发跟踪。
//!
//! 分层结构：
//! - `core`：错误、统一响应、请求提取器、中间件、派生视图工具
//! - `infrastructure`：日志、记录存储（内存 / Postgres）
//! - `app`：各业务模块

pub mod app;
pub mod config;
pub mod core;
pub mod infrastructure;

use axum::{extract::State, middleware, routing::get, Json, Router};
use serde_json::{json, Value};
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

pub use app::AppState;
pub use config::Config;

use crate::app::{aar::model::WeeklyAar, devtracker::model::DevTrackerItem, gear::model::GearItem};
use crate::app::{finance::model::Order, supply::model::SupplyRequest, team::model::TeamMember};
use crate::core::response::{ok, ApiResult};

/// 组装完整的应用路由
pub fn build_app(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.server.timeout_seconds);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/api", app::api_routes(state.clone()))
        .layer(middleware::from_fn(crate::core::middleware::request_logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TimeoutLayer::new(timeout))
        .with_state(state)
}

async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "farm": state.config.farm.name,
        "auth_required": state.auth.enabled(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn health(State(state): State<AppState>) -> ApiResult<Value> {
    let store = &state.store;
    ok(json!({
        "status": "ok",
        "backend": store.backend(),
        "records": {
            "team_members": store.count::<TeamMember>().await?,
            "gear": store.count::<GearItem>().await?,
            "supply_requests": store.count::<SupplyRequest>().await?,
            "aars": store.count::<WeeklyAar>().await?,
            "orders": store.count::<Order>().await?,
            "dev_tracker": store.count::<DevTrackerItem>().await?,
        },
        "sessions": state.auth.session_count().await,
    }))
}
