//! 消息网关客户端
//!
//! 短信与 WhatsApp 共用同一个 HTTP 消息网关，接口约定：
//!
//! ```text
//! POST {endpoint}
//! Authorization: Bearer {api_key}
//! {"channel": "sms", "from": "OUTREACH", "to": ["+2348012345678"], "body": "..."}
//!
//! 200 {"messageId": "msg_123", "accepted": 1, "rejected": 0}
//! 400/422 号码无效  402 余额不足  其他非 2xx 服务商错误
//! ```

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use outreach_shared::config::MessagingSettings;
use outreach_shared::retry::{RetryPolicy, retry_with_policy};

use super::normalize_phone;
use crate::error::{NotificationError, Result};
use crate::notification::types::{ChannelResult, ChannelType};

/// 错误响应体在错误信息中保留的最大长度
const MAX_ERROR_BODY_LEN: usize = 200;

/// 网关发送失败原因
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayFailure {
    #[error("号码格式无效: {0}")]
    InvalidNumber(String),

    #[error("消息网关账户余额不足")]
    InsufficientBalance,

    #[error("消息网关拒绝请求 (HTTP {status}): {body}")]
    Provider { status: u16, body: String },

    #[error("消息网关请求超时")]
    Timeout,

    #[error("无法连接消息网关: {0}")]
    Connection(String),

    #[error("消息网关响应无法解析: {0}")]
    InvalidResponse(String),

    #[error("消息网关未受理任何收件人")]
    NotAccepted,
}

impl GatewayFailure {
    /// 超时、连接失败、限流与 5xx 可重试
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Connection(_) => true,
            Self::Provider { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    fn from_status(status: u16, body: String, destination: &str) -> Self {
        match status {
            402 => Self::InsufficientBalance,
            400 | 422 => Self::InvalidNumber(destination.to_string()),
            _ => {
                let body: String = body.chars().take(MAX_ERROR_BODY_LEN).collect();
                Self::Provider { status, body }
            }
        }
    }

    fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Connection(err.to_string())
        }
    }
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    channel: &'a str,
    from: &'a str,
    to: [&'a str; 1],
    body: &'a str,
}

/// 网关受理回执
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayReceipt {
    #[serde(alias = "id")]
    pub message_id: Option<String>,
    #[serde(default)]
    pub accepted: Option<u32>,
    #[serde(default)]
    pub rejected: Option<u32>,
}

/// 消息网关客户端
pub struct GatewayClient {
    channel: ChannelType,
    http: reqwest::Client,
    settings: MessagingSettings,
    retry: RetryPolicy,
}

impl GatewayClient {
    pub fn new(channel: ChannelType, settings: MessagingSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()
            .map_err(|e| NotificationError::ChannelConfig {
                channel: channel.to_string(),
                message: format!("HTTP 客户端初始化失败: {}", e),
            })?;

        Ok(Self {
            channel,
            http,
            retry: RetryPolicy::with_max_retries(settings.max_retries),
            settings,
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    /// 校验号码后发送，返回统一的渠道结果
    ///
    /// `wire_prefix` 会拼接在规范化后的号码前，WhatsApp 使用 `whatsapp:`
    pub async fn deliver(&self, destination: &str, text: &str, wire_prefix: &str) -> ChannelResult {
        if !self.settings.enabled {
            return ChannelResult::skipped(self.channel, format!("{} 渠道已禁用", self.channel));
        }

        let start = Instant::now();

        let Some(number) = normalize_phone(destination) else {
            let failure = GatewayFailure::InvalidNumber(destination.to_string());
            warn!(channel = %self.channel, error = %failure, "号码校验失败，跳过发送");
            return ChannelResult::failed(
                self.channel,
                failure.to_string(),
                start.elapsed().as_millis() as u64,
            );
        };
        let wire_to = format!("{}{}", wire_prefix, number);

        let outcome = retry_with_policy(
            &self.retry,
            "send_gateway_message",
            GatewayFailure::is_transient,
            || self.post(&wire_to, text),
        )
        .await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(receipt) => {
                info!(
                    channel = %self.channel,
                    message_id = ?receipt.message_id,
                    duration_ms,
                    "消息发送成功"
                );
                ChannelResult::success(self.channel, receipt.message_id, duration_ms).with_counts(
                    receipt.accepted.unwrap_or(1),
                    receipt.rejected.unwrap_or(0),
                )
            }
            Err(failure) => {
                warn!(channel = %self.channel, error = %failure, duration_ms, "消息发送失败");
                ChannelResult::failed(self.channel, failure.to_string(), duration_ms)
            }
        }
    }

    async fn post(&self, to: &str, text: &str) -> std::result::Result<GatewayReceipt, GatewayFailure> {
        let request = SendRequest {
            channel: self.channel.as_str(),
            from: &self.settings.sender_id,
            to: [to],
            body: text,
        };

        debug!(channel = %self.channel, to = %to, "消息网关请求中...");

        let mut builder = self.http.post(&self.settings.endpoint).json(&request);
        if !self.settings.api_key.is_empty() {
            builder = builder.bearer_auth(&self.settings.api_key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| GatewayFailure::from_reqwest(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayFailure::from_status(status.as_u16(), body, to));
        }

        let receipt: GatewayReceipt = response
            .json()
            .await
            .map_err(|e| GatewayFailure::InvalidResponse(e.to_string()))?;

        if receipt.accepted == Some(0) {
            return Err(GatewayFailure::NotAccepted);
        }

        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            GatewayFailure::from_status(402, String::new(), "+2348012345678"),
            GatewayFailure::InsufficientBalance
        );
        assert_eq!(
            GatewayFailure::from_status(400, String::new(), "+2348012345678"),
            GatewayFailure::InvalidNumber("+2348012345678".to_string())
        );
        assert_eq!(
            GatewayFailure::from_status(422, String::new(), "+2348012345678"),
            GatewayFailure::InvalidNumber("+2348012345678".to_string())
        );
        assert!(matches!(
            GatewayFailure::from_status(503, "upstream down".to_string(), "+1"),
            GatewayFailure::Provider { status: 503, .. }
        ));
    }

    #[test]
    fn test_provider_body_truncated() {
        let failure = GatewayFailure::from_status(500, "x".repeat(1000), "+1");
        match failure {
            GatewayFailure::Provider { body, .. } => assert_eq!(body.len(), MAX_ERROR_BODY_LEN),
            other => panic!("unexpected failure: {:?}", other),
        }
    }

    #[test]
    fn test_transient_classification() {
        assert!(GatewayFailure::Timeout.is_transient());
        assert!(GatewayFailure::Connection("reset".to_string()).is_transient());
        assert!(
            GatewayFailure::Provider {
                status: 429,
                body: String::new()
            }
            .is_transient()
        );
        assert!(!GatewayFailure::InsufficientBalance.is_transient());
        assert!(!GatewayFailure::InvalidNumber("+1".to_string()).is_transient());
    }

    #[test]
    fn test_receipt_parsing() {
        let receipt: GatewayReceipt =
            serde_json::from_str(r#"{"messageId":"m-1","accepted":2,"rejected":1}"#).unwrap();
        assert_eq!(receipt.message_id.as_deref(), Some("m-1"));
        assert_eq!(receipt.accepted, Some(2));

        let minimal: GatewayReceipt = serde_json::from_str(r#"{"id":"m-2"}"#).unwrap();
        assert_eq!(minimal.message_id.as_deref(), Some("m-2"));
        assert_eq!(minimal.accepted, None);
    }
}
