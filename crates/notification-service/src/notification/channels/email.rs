//! Email 邮件通知渠道
//!
//! 通过 SMTP 发送纯文本邮件。服务商错误按类型归类为不同的失败原因，
//! 便于运营人员区分账号配置问题、网络问题与收件人问题。

use std::time::{Duration, Instant};

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use outreach_shared::config::{EmailSettings, SmtpTls};
use outreach_shared::retry::{RetryPolicy, retry_with_policy};

use super::NotificationChannel;
use crate::error::{NotificationError, Result};
use crate::models::Subscriber;
use crate::notification::types::{ChannelResult, ChannelType, RenderedContent};

/// 邮件发送失败原因
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmailFailure {
    #[error("SMTP 认证失败 ({0})，请检查邮箱账号与授权码")]
    Authentication(u16),

    #[error("无法连接 SMTP 服务器")]
    Connection,

    #[error("SMTP 请求超时")]
    Timeout,

    #[error("SMTP 服务器域名解析失败")]
    Dns,

    #[error("SMTP TLS 握手失败")]
    Tls,

    #[error("邮件被服务器拒收 ({code}): {detail}")]
    Rejected { code: u16, detail: String },

    #[error("收件地址无效: {0}")]
    InvalidAddress(String),

    #[error("邮件发送失败: {0}")]
    Other(String),
}

impl EmailFailure {
    /// 连接类错误与 4xx 临时拒收可重试
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Connection | Self::Timeout => true,
            Self::Rejected { code, .. } => (400..500).contains(code),
            _ => false,
        }
    }

    /// 依据 SMTP 状态码与错误链文本归类
    pub fn classify(status: Option<u16>, timed_out: bool, tls: bool, message: &str) -> Self {
        if timed_out {
            return Self::Timeout;
        }
        if let Some(code @ (530 | 534 | 535)) = status {
            return Self::Authentication(code);
        }
        if tls {
            return Self::Tls;
        }

        let lower = message.to_lowercase();
        if lower.contains("lookup")
            || lower.contains("resolve")
            || lower.contains("dns")
            || lower.contains("name or service not known")
        {
            return Self::Dns;
        }
        if let Some(code) = status.filter(|c| (400..600).contains(c)) {
            return Self::Rejected {
                code,
                detail: message.to_string(),
            };
        }
        if lower.contains("timed out") {
            return Self::Timeout;
        }
        if lower.contains("connection")
            || lower.contains("broken pipe")
            || lower.contains("network")
            || lower.contains("unexpected eof")
        {
            return Self::Connection;
        }

        Self::Other(message.to_string())
    }

    fn from_smtp_error(err: &lettre::transport::smtp::Error) -> Self {
        let status = err
            .status()
            .and_then(|code| code.to_string().parse::<u16>().ok());
        Self::classify(status, err.is_timeout(), err.is_tls(), &error_chain_message(err))
    }
}

/// 拼接错误链上的全部信息
fn error_chain_message(err: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(e) = source {
        parts.push(e.to_string());
        source = e.source();
    }
    parts.join(": ")
}

/// Email 邮件通知渠道
pub struct EmailChannel {
    settings: EmailSettings,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    retry: RetryPolicy,
}

impl EmailChannel {
    /// 根据配置创建，SMTP 主机或发件地址非法时返回配置错误
    pub fn new(settings: EmailSettings) -> Result<Self> {
        let config_error = |message: String| NotificationError::ChannelConfig {
            channel: ChannelType::Email.to_string(),
            message,
        };

        let address: Address = settings
            .from_address
            .parse()
            .map_err(|e| config_error(format!("发件地址非法: {}", e)))?;
        let from = Mailbox::new(
            (!settings.from_name.is_empty()).then(|| settings.from_name.clone()),
            address,
        );

        let mailer = Self::build_transport(&settings)
            .map_err(|e| config_error(format!("SMTP 传输初始化失败: {}", e)))?;

        Ok(Self {
            retry: RetryPolicy::with_max_retries(settings.max_retries),
            settings,
            mailer,
            from,
        })
    }

    /// 覆盖重试策略
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn build_transport(
        settings: &EmailSettings,
    ) -> std::result::Result<AsyncSmtpTransport<Tokio1Executor>, lettre::transport::smtp::Error>
    {
        let builder = match settings.tls {
            SmtpTls::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(settings.smtp_host.as_str())
            }
            SmtpTls::Starttls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.smtp_host)?
            }
            SmtpTls::Wrapper => AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.smtp_host)?,
        };

        // 单次 IO 超时沿用 lettre 默认值，整体时限由 deliver 中的 tokio 超时控制
        let mut builder = builder.port(settings.smtp_port);

        if !settings.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ));
        }

        Ok(builder.build())
    }

    fn message_domain(&self) -> &str {
        self.settings
            .from_address
            .split_once('@')
            .map(|(_, domain)| domain)
            .unwrap_or("localhost")
    }

    /// 发送一封邮件，成功时返回 Message-ID
    async fn deliver(
        &self,
        destination: &str,
        content: &RenderedContent,
    ) -> std::result::Result<String, EmailFailure> {
        let to: Mailbox = destination
            .parse()
            .map_err(|_| EmailFailure::InvalidAddress(destination.to_string()))?;

        let message_id = format!("<{}@{}>", Uuid::new_v4(), self.message_domain());

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(content.subject.clone())
            .message_id(Some(message_id.clone()))
            .header(ContentType::TEXT_PLAIN)
            .body(content.body.clone())
            .map_err(|e| EmailFailure::Other(e.to_string()))?;

        debug!(to = %destination, "Email 发送中...");

        let timeout = Duration::from_millis(self.settings.timeout_ms);
        match tokio::time::timeout(timeout, self.mailer.send(message)).await {
            Err(_) => Err(EmailFailure::Timeout),
            Ok(Err(e)) => Err(EmailFailure::from_smtp_error(&e)),
            Ok(Ok(_)) => Ok(message_id),
        }
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn channel_type(&self) -> ChannelType {
        ChannelType::Email
    }

    fn name(&self) -> &str {
        "Email"
    }

    fn destination(&self, subscriber: &Subscriber) -> Option<String> {
        subscriber.email_address().map(String::from)
    }

    async fn send(&self, destination: &str, content: &RenderedContent) -> ChannelResult {
        if !self.settings.enabled {
            return ChannelResult::skipped(self.channel_type(), "邮件渠道已禁用");
        }

        let start = Instant::now();
        let outcome = retry_with_policy(
            &self.retry,
            "send_email",
            EmailFailure::is_transient,
            || self.deliver(destination, content),
        )
        .await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(message_id) => {
                info!(message_id = %message_id, duration_ms, "Email 发送成功");
                ChannelResult::success(self.channel_type(), Some(message_id), duration_ms)
                    .with_counts(1, 0)
            }
            Err(failure) => {
                warn!(error = %failure, duration_ms, "Email 发送失败");
                ChannelResult::failed(self.channel_type(), failure.to_string(), duration_ms)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_authentication() {
        for code in [530, 534, 535] {
            assert_eq!(
                EmailFailure::classify(Some(code), false, false, "permanent error"),
                EmailFailure::Authentication(code)
            );
        }
    }

    #[test]
    fn test_classify_transport_errors() {
        assert_eq!(
            EmailFailure::classify(None, true, false, ""),
            EmailFailure::Timeout
        );
        assert_eq!(
            EmailFailure::classify(None, false, true, "handshake failure"),
            EmailFailure::Tls
        );
        assert_eq!(
            EmailFailure::classify(
                None,
                false,
                false,
                "Connection error: failed to lookup address information: Name or service not known"
            ),
            EmailFailure::Dns
        );
        assert_eq!(
            EmailFailure::classify(
                None,
                false,
                false,
                "Connection error: Connection refused (os error 111)"
            ),
            EmailFailure::Connection
        );
        assert_eq!(
            EmailFailure::classify(None, false, false, "io error: operation timed out"),
            EmailFailure::Timeout
        );
    }

    #[test]
    fn test_classify_rejected() {
        let failure = EmailFailure::classify(
            Some(550),
            false,
            false,
            "permanent error (550): mailbox unavailable",
        );
        assert!(matches!(failure, EmailFailure::Rejected { code: 550, .. }));
        assert!(!failure.is_transient());

        let greylisted = EmailFailure::classify(Some(451), false, false, "try again later");
        assert!(greylisted.is_transient());
    }

    #[test]
    fn test_classify_unknown() {
        assert_eq!(
            EmailFailure::classify(None, false, false, "something odd"),
            EmailFailure::Other("something odd".to_string())
        );
    }

    #[test]
    fn test_failure_messages_are_distinct() {
        let messages: std::collections::HashSet<String> = [
            EmailFailure::Authentication(535),
            EmailFailure::Connection,
            EmailFailure::Timeout,
            EmailFailure::Dns,
            EmailFailure::Tls,
            EmailFailure::InvalidAddress("x".to_string()),
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        assert_eq!(messages.len(), 6);
    }

    #[tokio::test]
    async fn test_invalid_from_address_rejected() {
        let settings = EmailSettings {
            from_address: "not-an-address".to_string(),
            ..Default::default()
        };
        let err = EmailChannel::new(settings).err().unwrap();
        assert_eq!(err.error_code(), "CHANNEL_CONFIG_ERROR");
    }

    #[tokio::test]
    async fn test_disabled_channel_skips() {
        let settings = EmailSettings {
            enabled: false,
            tls: SmtpTls::None,
            ..Default::default()
        };
        let channel = EmailChannel::new(settings).unwrap();
        let content = RenderedContent {
            subject: "s".to_string(),
            body: "b".to_string(),
            short_text: "t".to_string(),
        };

        let result = channel.send("a@example.org", &content).await;
        assert_eq!(result.status, crate::notification::types::SendStatus::Skipped);
    }

    #[tokio::test]
    async fn test_invalid_destination_fails() {
        let settings = EmailSettings {
            tls: SmtpTls::None,
            ..Default::default()
        };
        let channel = EmailChannel::new(settings).unwrap();
        let content = RenderedContent {
            subject: "s".to_string(),
            body: "b".to_string(),
            short_text: "t".to_string(),
        };

        let result = channel.send("no-at-sign", &content).await;
        assert_eq!(result.status, crate::notification::types::SendStatus::Failed);
        assert!(result.error.unwrap().contains("收件地址无效"));
    }
}
