//! 登录与内存会话

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use super::model::*;
use crate::config::{AuthConfig, AuthUser};
use crate::core::error::CoreError;

#[derive(Clone)]
pub struct AuthService {
    enabled: bool,
    ttl: Duration,
    users: Arc<Vec<AuthUser>>,
    sessions: Arc<RwLock<HashMap<String, SessionUser>>>,
}

impl AuthService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            enabled: config.enabled,
            ttl: Duration::hours(config.token_ttl_hours),
            users: Arc::new(config.users.clone()),
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub async fn login(&self, request: LoginRequest, now: DateTime<Utc>) -> Result<LoginResponse, CoreError> {
        let username = request.username.trim();
        let user = self
            .users
            .iter()
            .find(|u| u.username == username && u.password == request.password)
            .ok_or_else(|| {
                warn!("登录失败: {}", username);
                CoreError::Unauthorized
            })?;

        let token = Uuid::new_v4().simple().to_string();
        let session = SessionUser {
            username: user.username.clone(),
            display_name: user.display_name.clone().unwrap_or_else(|| user.username.clone()),
            expires_at: now + self.ttl,
        };
        self.sessions.write().await.insert(token.clone(), session.clone());
        info!("用户登录: {}", session.username);

        Ok(LoginResponse {
            token,
            username: session.username,
            display_name: session.display_name,
            expires_at: session.expires_at,
        })
    }

    pub async fn logout(&self, token: &str) {
        if let Some(session) = self.sessions.write().await.remove(token) {
            info!("用户登出: {}", session.username);
        }
    }

    /// 校验令牌，过期会话在此处清除
    pub async fn authenticate(&self, token: &str, now: DateTime<Utc>) -> Result<SessionUser, CoreError> {
        let session = self
            .sessions
            .read()
            .await
            .get(token)
            .cloned()
            .ok_or(CoreError::Unauthorized)?;

        if session.expires_at <= now {
            self.sessions.write().await.remove(token);
            info!("会话已过期: {}", session.username);
            return Err(CoreError::Unauthorized);
        }
        Ok(session)
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
