//! 核心错误处理模块

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::error;

/// 内部错误对外展示的兜底提示
pub const FALLBACK_MESSAGE: &str = "操作失败，请稍后再试";

/// 核心错误类型
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Validation(String),
    #[error("认证失败，请提供有效的认证信息")]
    Unauthorized,
    #[error("权限不足，无法访问此资源")]
    Forbidden,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("内部错误: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn not_found(label: &str, id: impl std::fmt::Display) -> Self {
        CoreError::NotFound(format!("{} {} 不存在", label, id))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            CoreError::BadRequest(_) | CoreError::Validation(_) => StatusCode::BAD_REQUEST,
            CoreError::Unauthorized => StatusCode::UNAUTHORIZED,
            CoreError::Forbidden => StatusCode::FORBIDDEN,
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::Conflict(_) => StatusCode::CONFLICT,
            CoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            CoreError::BadRequest(_) => "BAD_REQUEST",
            CoreError::Validation(_) => "VALIDATION_ERROR",
            CoreError::Unauthorized => "UNAUTHORIZED",
            CoreError::Forbidden => "FORBIDDEN",
            CoreError::NotFound(_) => "NOT_FOUND",
            CoreError::Conflict(_) => "CONFLICT",
            CoreError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// 返回给客户端的提示；内部错误细节只写日志
    pub fn user_message(&self) -> String {
        match self {
            CoreError::Internal(_) => FALLBACK_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

/// 错误响应结构
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub message: String,
    #[serde(default)]
    pub user_message: Option<String>,
    pub code: u16,
    pub timestamp: String,
}

impl ErrorResponse {
    /// 优先使用服务端给出的提示，否则使用调用方的兜底文案
    pub fn display_message<'a>(&'a self, fallback: &'a str) -> &'a str {
        match self.user_message.as_deref() {
            Some(msg) if !msg.trim().is_empty() => msg,
            _ => fallback,
        }
    }
}

impl From<&CoreError> for ErrorResponse {
    fn from(err: &CoreError) -> Self {
        let status = err.status();
        let user_message = err.user_message();
        Self {
            success: false,
            error: err.code().to_string(),
            message: user_message.clone(),
            user_message: Some(user_message),
            code: status.as_u16(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        if let CoreError::Internal(detail) = &self {
            error!("内部错误: {}", detail);
        }
        let status = self.status();
        let body = ErrorResponse::from(&self);
        (status, axum::Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for CoreError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = err
            .field_errors()
            .into_iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| {
                    error
                        .message
                        .as_ref()
                        .map(|msg| msg.to_string())
                        .unwrap_or_else(|| format!("字段 {} 无效", field))
                })
            })
            .collect();
        messages.sort();

        CoreError::Validation(messages.join(", "))
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Internal(format!("记录序列化失败: {}", err))
    }
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        CoreError::Internal(format!("数据库错误: {}", err))
    }
}
