//! 通知类型定义
//!
//! 定义通知相关的数据结构和枚举类型。

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{NotificationError, Result};
use crate::models::SourceType;

/// 无任何可用渠道时记录的错误
pub const NO_VALID_CHANNEL: &str = "no valid channel";

/// 通知渠道类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    Email,
    Sms,
    WhatsApp,
}

impl ChannelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Sms => "sms",
            Self::WhatsApp => "whatsapp",
        }
    }

    pub fn all() -> [Self; 3] {
        [Self::Email, Self::Sms, Self::WhatsApp]
    }
}

impl std::fmt::Display for ChannelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 通知请求内容
///
/// 由触发方（管理后台）提供，模板引擎据此渲染各渠道文案
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub source_type: SourceType,
    pub source_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl NotificationPayload {
    pub fn new(
        source_type: SourceType,
        source_id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            source_type,
            source_id: source_id.into(),
            title: title.into(),
            description: None,
            category: None,
            url: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// 标题与来源 ID 不能为空
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(NotificationError::Validation("title 不能为空".to_string()));
        }
        if self.source_id.trim().is_empty() {
            return Err(NotificationError::Validation("sourceId 不能为空".to_string()));
        }
        Ok(())
    }
}

/// 渲染后的通知文案
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedContent {
    /// 邮件主题
    pub subject: String,
    /// 邮件正文（纯文本）
    pub body: String,
    /// 短信 / WhatsApp 文本
    pub short_text: String,
}

/// 发送状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendStatus {
    Success,
    Failed,
    Skipped,
}

impl SendStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

/// 单渠道发送结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelResult {
    pub channel: ChannelType,
    pub status: SendStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// 服务商返回的消息 ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_message_id: Option<String>,
    /// 服务商受理的收件数
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted: Option<u32>,
    /// 服务商拒收的收件数
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected: Option<u32>,
    pub duration_ms: u64,
}

impl ChannelResult {
    pub fn success(channel: ChannelType, message_id: Option<String>, duration_ms: u64) -> Self {
        Self {
            channel,
            status: SendStatus::Success,
            error: None,
            external_message_id: message_id,
            accepted: None,
            rejected: None,
            duration_ms,
        }
    }

    pub fn failed(channel: ChannelType, error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            channel,
            status: SendStatus::Failed,
            error: Some(error.into()),
            external_message_id: None,
            accepted: None,
            rejected: None,
            duration_ms,
        }
    }

    pub fn skipped(channel: ChannelType, reason: impl Into<String>) -> Self {
        Self {
            channel,
            status: SendStatus::Skipped,
            error: Some(reason.into()),
            external_message_id: None,
            accepted: None,
            rejected: None,
            duration_ms: 0,
        }
    }

    pub fn with_counts(mut self, accepted: u32, rejected: u32) -> Self {
        self.accepted = Some(accepted);
        self.rejected = Some(rejected);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == SendStatus::Success
    }
}

/// 单个订阅者的多渠道发送结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberOutcome {
    pub subscriber_id: Uuid,
    /// 联系方式，用作错误前缀
    pub contact: String,
    pub email: Option<ChannelResult>,
    pub sms: Option<ChannelResult>,
    pub whatsapp: Option<ChannelResult>,
    pub errors: Vec<String>,
}

impl SubscriberOutcome {
    pub fn new(subscriber_id: Uuid, contact: impl Into<String>) -> Self {
        Self {
            subscriber_id,
            contact: contact.into(),
            email: None,
            sms: None,
            whatsapp: None,
            errors: Vec::new(),
        }
    }

    /// 记录渠道结果，失败时同时追加错误信息
    pub fn record(&mut self, result: ChannelResult) {
        if result.status == SendStatus::Failed {
            let error = result.error.as_deref().unwrap_or("unknown error");
            self.errors.push(format!("{}: {}", result.channel, error));
        }
        match result.channel {
            ChannelType::Email => self.email = Some(result),
            ChannelType::Sms => self.sms = Some(result),
            ChannelType::WhatsApp => self.whatsapp = Some(result),
        }
    }

    pub fn result(&self, channel: ChannelType) -> Option<&ChannelResult> {
        match channel {
            ChannelType::Email => self.email.as_ref(),
            ChannelType::Sms => self.sms.as_ref(),
            ChannelType::WhatsApp => self.whatsapp.as_ref(),
        }
    }

    pub fn results(&self) -> impl Iterator<Item = &ChannelResult> {
        [&self.email, &self.sms, &self.whatsapp]
            .into_iter()
            .filter_map(Option::as_ref)
    }

    pub fn channel_succeeded(&self, channel: ChannelType) -> bool {
        self.result(channel).is_some_and(ChannelResult::is_success)
    }

    /// 任一渠道成功即视为送达
    pub fn is_success(&self) -> bool {
        self.results().any(ChannelResult::is_success)
    }
}
