//! 通知服务错误类型
//!
//! 区分致命错误（订阅者存储不可用）与非致命错误（审计记录写入失败）。
//! 单个订阅者、单个渠道的发送失败不走这里，而是落在 `ChannelResult` 与分发结果中。

use thiserror::Error;
use uuid::Uuid;

/// 通知服务错误类型
#[derive(Debug, Error)]
pub enum NotificationError {
    // === 订阅者相关错误 ===
    #[error("订阅者不存在: {0}")]
    SubscriberNotFound(Uuid),

    #[error("订阅者已存在: {0}")]
    SubscriberAlreadyExists(String),

    #[error("订阅者存储不可用: {0}")]
    SubscriberStoreUnavailable(String),

    // === 通知记录相关错误 ===
    #[error("通知记录不存在: {0}")]
    EventNotFound(Uuid),

    #[error("通知记录写入失败: {0}")]
    RecordWrite(String),

    // === 配置错误 ===
    #[error("渠道配置错误: {channel} - {message}")]
    ChannelConfig { channel: String, message: String },

    // === 系统错误 ===
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON 序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("参数校验失败: {0}")]
    Validation(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 通知服务 Result 类型别名
pub type Result<T> = std::result::Result<T, NotificationError>;

impl NotificationError {
    /// 检查是否为可重试的错误
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_) | Self::SubscriberStoreUnavailable(_))
    }

    /// 获取错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::SubscriberNotFound(_) => "SUBSCRIBER_NOT_FOUND",
            Self::SubscriberAlreadyExists(_) => "SUBSCRIBER_ALREADY_EXISTS",
            Self::SubscriberStoreUnavailable(_) => "SUBSCRIBER_STORE_UNAVAILABLE",
            Self::EventNotFound(_) => "NOTIFICATION_EVENT_NOT_FOUND",
            Self::RecordWrite(_) => "RECORD_WRITE_FAILED",
            Self::ChannelConfig { .. } => "CHANNEL_CONFIG_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
