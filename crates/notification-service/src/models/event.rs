//! 通知记录与审计实体定义
//!
//! NotificationEvent 写入后不可变，每次分发调用对应一条记录。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// 通知来源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
pub enum SourceType {
    /// 新增政绩 / 成果
    Achievement,
    /// 直播 / 广播公告
    Broadcast,
    /// 订阅状态变更通知
    SubscriberStatus,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Achievement => "achievement",
            Self::Broadcast => "broadcast",
            Self::SubscriberStatus => "subscriber_status",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 通知记录状态
///
/// 失败收件人为空时为 sent，否则为 partial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum EventStatus {
    Sent,
    Partial,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Partial => "partial",
        }
    }
}

/// 各渠道成功发送数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelCounts {
    pub email: i32,
    pub sms: i32,
    pub whatsapp: i32,
}

/// 失败收件人
///
/// `email` 字段保存订阅者的联系方式（仅手机号订阅者为手机号）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedRecipient {
    pub email: String,
    pub error: String,
}

/// 通知分发审计记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    pub id: Uuid,
    pub source_type: SourceType,
    pub source_id: String,
    pub recipients_attempted: i32,
    pub recipients_succeeded: i32,
    pub channel_counts: ChannelCounts,
    pub failed_recipients: Vec<FailedRecipient>,
    pub errors: Vec<String>,
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
}

impl NotificationEvent {
    pub fn new(
        source_type: SourceType,
        source_id: impl Into<String>,
        recipients_attempted: i32,
        recipients_succeeded: i32,
        channel_counts: ChannelCounts,
        failed_recipients: Vec<FailedRecipient>,
        errors: Vec<String>,
    ) -> Self {
        let status = if failed_recipients.is_empty() {
            EventStatus::Sent
        } else {
            EventStatus::Partial
        };

        Self {
            id: Uuid::now_v7(),
            source_type,
            source_id: source_id.into(),
            recipients_attempted,
            recipients_succeeded,
            channel_counts,
            failed_recipients,
            errors,
            status,
            created_at: Utc::now(),
        }
    }
}

/// 通知动态（站内通知列表）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub id: Uuid,
    pub source_type: SourceType,
    pub source_id: String,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl FeedItem {
    pub fn new(
        source_type: SourceType,
        source_id: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            source_type,
            source_id: source_id.into(),
            title: title.into(),
            message: message.into(),
            created_at: Utc::now(),
        }
    }
}

/// 管理员操作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
pub enum AdminActionKind {
    StatusChange,
    Delete,
}

/// 管理员操作审计记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AdminAction {
    pub id: Uuid,
    pub admin_id: String,
    pub admin_name: String,
    pub action: AdminActionKind,
    pub subscriber_id: Uuid,
    /// 操作明细，如状态变更前后的值、删除时的联系方式快照
    pub detail: Value,
    pub created_at: DateTime<Utc>,
}

impl AdminAction {
    pub fn new(
        admin_id: impl Into<String>,
        admin_name: impl Into<String>,
        action: AdminActionKind,
        subscriber_id: Uuid,
        detail: Value,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            admin_id: admin_id.into(),
            admin_name: admin_name.into(),
            action,
            subscriber_id,
            detail,
            created_at: Utc::now(),
        }
    }
}
