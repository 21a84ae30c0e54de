//! 管理后台错误类型定义
//!
//! 统一转换为 `{success, code, message, data}` 响应体

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use outreach_notification::NotificationError;
use serde_json::json;
use uuid::Uuid;

/// 管理后台错误类型
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    // 认证错误
    #[error("未授权: {0}")]
    Unauthorized(String),
    #[error("禁止访问: {0}")]
    Forbidden(String),

    // 验证错误
    #[error("参数验证失败: {0}")]
    Validation(String),

    // 资源不存在
    #[error("订阅者不存在: {0}")]
    SubscriberNotFound(Uuid),
    #[error("通知记录不存在: {0}")]
    EventNotFound(Uuid),

    // 业务错误
    #[error("订阅者已存在: {0}")]
    SubscriberAlreadyExists(String),
    #[error("订阅者存储不可用: {0}")]
    StoreUnavailable(String),

    // 系统错误
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),
    #[error("内部错误: {0}")]
    Internal(String),
}

impl AdminError {
    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::SubscriberNotFound(_) | Self::EventNotFound(_) => StatusCode::NOT_FOUND,
            Self::SubscriberAlreadyExists(_) => StatusCode::CONFLICT,
            Self::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 返回错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::SubscriberNotFound(_) => "SUBSCRIBER_NOT_FOUND",
            Self::EventNotFound(_) => "NOTIFICATION_EVENT_NOT_FOUND",
            Self::SubscriberAlreadyExists(_) => "SUBSCRIBER_ALREADY_EXISTS",
            Self::StoreUnavailable(_) => "SUBSCRIBER_STORE_UNAVAILABLE",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 返回给调用方的错误信息，系统级错误只给出通用提示
    pub fn client_message(&self) -> String {
        match self {
            Self::Database(_) | Self::Internal(_) => "服务内部错误，请稍后重试".to_string(),
            Self::StoreUnavailable(_) => "订阅者存储暂不可用，本次未发送任何通知".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 详细信息仅记录日志
        match &self {
            Self::Database(e) => tracing::error!(error = %e, "数据库操作失败"),
            Self::Internal(e) => tracing::error!(error = %e, "内部错误"),
            Self::StoreUnavailable(e) => tracing::error!(error = %e, "订阅者存储不可用"),
            _ => {}
        }
        let message = self.client_message();

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": serde_json::Value::Null
        });

        (status, axum::Json(body)).into_response()
    }
}

/// 从 validator 错误转换
impl From<validator::ValidationErrors> for AdminError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

/// 从 JSON 序列化错误转换
impl From<serde_json::Error> for AdminError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON 处理错误: {}", err))
    }
}

/// 从通知服务的错误转换
impl From<NotificationError> for AdminError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::SubscriberNotFound(id) => Self::SubscriberNotFound(id),
            NotificationError::SubscriberAlreadyExists(contact) => {
                Self::SubscriberAlreadyExists(contact)
            }
            NotificationError::SubscriberStoreUnavailable(msg) => Self::StoreUnavailable(msg),
            NotificationError::EventNotFound(id) => Self::EventNotFound(id),
            NotificationError::Validation(msg) => Self::Validation(msg),
            NotificationError::Database(e) => Self::Database(e),
            other => Self::Internal(other.to_string()),
        }
    }
}

/// 服务层 Result 类型别名
pub type Result<T> = std::result::Result<T, AdminError>;
