//! 登录处理器

use axum::{extract::State, routing::{get, post}, Extension, Router};
use chrono::Utc;

use super::model::*;
use crate::app::AppState;
use crate::core::error::CoreError;
use crate::core::extract::ValidJson;
use crate::core::response::{ok, ApiResult};

/// 无需令牌的路由
pub fn public_routes() -> Router<AppState> {
    Router::new().route("/auth/login", post(login))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
}

async fn login(State(state): State<AppState>, ValidJson(request): ValidJson<LoginRequest>) -> ApiResult<LoginResponse> {
    ok(state.auth.login(request, Utc::now()).await?)
}

async fn logout(State(state): State<AppState>, context: Option<Extension<AuthContext>>) -> ApiResult<()> {
    if let Some(Extension(context)) = context {
        state.auth.logout(&context.token).await;
    }
    ok(())
}

async fn me(context: Option<Extension<AuthContext>>) -> ApiResult<SessionUser> {
    let Extension(context) = context.ok_or(CoreError::Unauthorized)?;
    ok(context.user)
}
