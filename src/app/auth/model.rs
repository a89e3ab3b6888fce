//! 登录数据模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::app::shared::not_blank;

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "用户名不能为空"))]
    pub username: String,
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "密码不能为空"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub display_name: String,
    pub expires_at: DateTime<Utc>,
}

/// 当前会话用户
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionUser {
    pub username: String,
    pub display_name: String,
    pub expires_at: DateTime<Utc>,
}

/// 认证中间件写入请求扩展，供后续处理器读取
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub token: String,
    pub user: SessionUser,
}
