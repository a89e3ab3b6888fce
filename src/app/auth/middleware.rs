//! 认证中间件

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use super::model::AuthContext;
use crate::app::AppState;
use crate::core::error::CoreError;

/// 从 `Authorization: Bearer <token>` 中取出令牌
fn bearer_token(req: &Request) -> Option<String> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// 有效令牌写入 `AuthContext`；开启登录时缺少或无效的令牌返回 401
pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Result<Response, CoreError> {
    let context = match bearer_token(&req) {
        Some(token) => match state.auth.authenticate(&token, Utc::now()).await {
            Ok(user) => Some(AuthContext { token, user }),
            Err(err) if state.auth.enabled() => return Err(err),
            Err(_) => None,
        },
        None if state.auth.enabled() => return Err(CoreError::Unauthorized),
        None => None,
    };

    if let Some(context) = context {
        req.extensions_mut().insert(context);
    }
    Ok(next.run(req).await)
}
