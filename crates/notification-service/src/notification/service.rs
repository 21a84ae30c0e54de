//! 通知服务
//!
//! 面向单个订阅者的多渠道发送：筛选可用渠道、渲染文案、并行发送、汇总结果。
//!
//! ## 设计说明
//!
//! - **多渠道并行**：各渠道独立发送，互不影响
//! - **部分失败容忍**：任一渠道成功即视为送达
//! - **无可用渠道**：记录 `no valid channel` 并视为失败

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, instrument, warn};

use outreach_shared::config::NotificationConfig;
use outreach_shared::observability::metrics;

use super::channels::{EmailChannel, NotificationChannel, SmsChannel, WhatsAppChannel};
use super::template::TemplateEngine;
use super::types::{
    ChannelType, NO_VALID_CHANNEL, NotificationPayload, SendStatus, SubscriberOutcome,
};
use crate::error::Result;
use crate::models::Subscriber;

/// 通知服务
///
/// 管理通知渠道和模板引擎，提供统一的发送接口。
pub struct NotificationService {
    /// 已注册的通知渠道
    channels: Vec<Arc<dyn NotificationChannel>>,
    template_engine: Arc<TemplateEngine>,
}

impl NotificationService {
    pub fn new(template_engine: Arc<TemplateEngine>) -> Self {
        Self {
            channels: Vec::new(),
            template_engine,
        }
    }

    /// 使用默认模板创建，不含任何渠道
    pub fn with_default_templates() -> Self {
        Self::new(Arc::new(TemplateEngine::with_defaults()))
    }

    /// 按配置构造，只注册已启用的渠道
    pub fn from_config(config: &NotificationConfig) -> Result<Self> {
        let mut service = Self::with_default_templates();

        if config.email.enabled {
            service.register_channel(Arc::new(EmailChannel::new(config.email.clone())?));
        }
        if config.sms.enabled {
            service.register_channel(Arc::new(SmsChannel::new(config.sms.clone())?));
        }
        if config.whatsapp.enabled {
            service.register_channel(Arc::new(WhatsAppChannel::new(config.whatsapp.clone())?));
        }

        if service.channels.is_empty() {
            warn!("未启用任何通知渠道，所有订阅者都将记为 no valid channel");
        }
        Ok(service)
    }

    /// 注册通知渠道，同类型渠道重复注册时后者替换前者
    pub fn register_channel(&mut self, channel: Arc<dyn NotificationChannel>) {
        info!(
            channel_type = %channel.channel_type(),
            channel_name = channel.name(),
            "注册通知渠道"
        );
        self.channels
            .retain(|c| c.channel_type() != channel.channel_type());
        self.channels.push(channel);
    }

    /// 链式注册
    pub fn with_channel(mut self, channel: Arc<dyn NotificationChannel>) -> Self {
        self.register_channel(channel);
        self
    }

    /// 获取所有已注册的渠道类型
    pub fn registered_channel_types(&self) -> Vec<ChannelType> {
        self.channels.iter().map(|c| c.channel_type()).collect()
    }

    /// 订阅者可用的渠道及收件地址
    ///
    /// 要求订阅状态可接收通知、渠道偏好开启、对应联系方式存在
    fn eligible_channels(
        &self,
        subscriber: &Subscriber,
    ) -> Vec<(Arc<dyn NotificationChannel>, String)> {
        if !subscriber.status.is_notifiable() {
            return Vec::new();
        }

        self.channels
            .iter()
            .filter(|c| subscriber.preferences.allows(c.channel_type()))
            .filter_map(|c| c.destination(subscriber).map(|d| (c.clone(), d)))
            .collect()
    }

    /// 向单个订阅者发送通知
    ///
    /// 各渠道并行发送，结果汇总到 `SubscriberOutcome`；本方法不会失败。
    #[instrument(
        skip(self, subscriber, payload),
        fields(
            subscriber_id = %subscriber.id,
            source_type = %payload.source_type,
            source_id = %payload.source_id
        )
    )]
    pub async fn notify(
        &self,
        subscriber: &Subscriber,
        payload: &NotificationPayload,
    ) -> SubscriberOutcome {
        let mut outcome = SubscriberOutcome::new(subscriber.id, subscriber.contact());

        let targets = self.eligible_channels(subscriber);
        if targets.is_empty() {
            debug!(status = %subscriber.status, "订阅者没有可用渠道");
            outcome.errors.push(NO_VALID_CHANNEL.to_string());
            return outcome;
        }

        let content = self.template_engine.render_content(payload, subscriber);

        let send_futures = targets.iter().map(|(channel, destination)| {
            let content = &content;
            async move { channel.send(destination, content).await }
        });

        for result in join_all(send_futures).await {
            metrics::record_channel_send(result.channel.as_str(), result.status.as_str());
            outcome.record(result);
        }

        // 渠道全部被跳过（如均已禁用）等同于没有可用渠道
        if outcome.results().all(|r| r.status == SendStatus::Skipped) {
            outcome.errors.push(NO_VALID_CHANNEL.to_string());
        }

        self.log_outcome(&outcome);
        outcome
    }

    fn log_outcome(&self, outcome: &SubscriberOutcome) {
        if outcome.is_success() {
            if outcome.errors.is_empty() {
                debug!("通知发送成功");
            } else {
                info!(errors = ?outcome.errors, "通知部分渠道发送失败");
            }
        } else {
            warn!(errors = ?outcome.errors, "通知所有渠道发送失败");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChannelPreferences, NewSubscriber, SourceType, SubscriberStatus};
    use crate::notification::types::{ChannelResult, RenderedContent};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// 记录调用的测试渠道
    struct StubChannel {
        channel_type: ChannelType,
        status: SendStatus,
        calls: Mutex<Vec<String>>,
    }

    impl StubChannel {
        fn new(channel_type: ChannelType, status: SendStatus) -> Arc<Self> {
            Arc::new(Self {
                channel_type,
                status,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl NotificationChannel for StubChannel {
        fn channel_type(&self) -> ChannelType {
            self.channel_type
        }

        fn name(&self) -> &str {
            "stub"
        }

        fn destination(&self, subscriber: &Subscriber) -> Option<String> {
            match self.channel_type {
                ChannelType::Email => subscriber.email_address().map(String::from),
                _ => subscriber.phone_number().map(String::from),
            }
        }

        async fn send(&self, destination: &str, _content: &RenderedContent) -> ChannelResult {
            self.calls.lock().unwrap().push(destination.to_string());
            match self.status {
                SendStatus::Success => {
                    ChannelResult::success(self.channel_type, Some("stub-1".to_string()), 1)
                }
                SendStatus::Failed => ChannelResult::failed(self.channel_type, "stub failure", 1),
                SendStatus::Skipped => ChannelResult::skipped(self.channel_type, "disabled"),
            }
        }
    }

    fn subscriber(email: &str, phone: Option<&str>, prefs: ChannelPreferences) -> Subscriber {
        let mut s = Subscriber::from_new(NewSubscriber {
            email: Some(email.to_string()),
            phone: phone.map(String::from),
            name: Some("Ada".to_string()),
            preferences: Some(prefs),
        });
        s.status = SubscriberStatus::Active;
        s
    }

    fn payload() -> NotificationPayload {
        NotificationPayload::new(SourceType::Achievement, "42", "New clinic opened")
    }

    fn all_channels() -> ChannelPreferences {
        ChannelPreferences {
            email: true,
            sms: true,
            whatsapp: true,
        }
    }

    #[tokio::test]
    async fn test_phone_only_subscriber_succeeds_via_sms() {
        let email = StubChannel::new(ChannelType::Email, SendStatus::Success);
        let sms = StubChannel::new(ChannelType::Sms, SendStatus::Success);
        let service = NotificationService::with_default_templates()
            .with_channel(email.clone())
            .with_channel(sms.clone());

        let s = subscriber("", Some("+2348012345678"), ChannelPreferences::default());
        let outcome = service.notify(&s, &payload()).await;

        assert!(outcome.is_success());
        assert!(outcome.email.is_none());
        assert!(outcome.channel_succeeded(ChannelType::Sms));
        assert_eq!(email.call_count(), 0);
        assert_eq!(sms.call_count(), 1);
        assert_eq!(outcome.contact, "+2348012345678");
    }

    #[tokio::test]
    async fn test_no_valid_channel() {
        let email = StubChannel::new(ChannelType::Email, SendStatus::Success);
        let service = NotificationService::with_default_templates().with_channel(email.clone());

        // 只有手机号，而服务只注册了邮件渠道
        let s = subscriber("", Some("+2348012345678"), all_channels());
        let outcome = service.notify(&s, &payload()).await;

        assert!(!outcome.is_success());
        assert_eq!(outcome.errors, vec![NO_VALID_CHANNEL.to_string()]);
        assert_eq!(email.call_count(), 0);
    }

    #[tokio::test]
    async fn test_ineligible_status_receives_nothing() {
        let email = StubChannel::new(ChannelType::Email, SendStatus::Success);
        let service = NotificationService::with_default_templates().with_channel(email.clone());

        for status in [
            SubscriberStatus::Inactive,
            SubscriberStatus::Unsubscribed,
            SubscriberStatus::Terminated,
        ] {
            let mut s = subscriber("a@example.org", None, all_channels());
            s.status = status;
            let outcome = service.notify(&s, &payload()).await;
            assert!(!outcome.is_success());
            assert_eq!(outcome.errors, vec![NO_VALID_CHANNEL.to_string()]);
        }
        assert_eq!(email.call_count(), 0);
    }

    #[tokio::test]
    async fn test_preference_disabled_channel_not_used() {
        let email = StubChannel::new(ChannelType::Email, SendStatus::Success);
        let sms = StubChannel::new(ChannelType::Sms, SendStatus::Success);
        let service = NotificationService::with_default_templates()
            .with_channel(email.clone())
            .with_channel(sms.clone());

        let prefs = ChannelPreferences {
            email: true,
            sms: false,
            whatsapp: false,
        };
        let s = subscriber("a@example.org", Some("+2348012345678"), prefs);
        let outcome = service.notify(&s, &payload()).await;

        assert!(outcome.is_success());
        assert!(outcome.sms.is_none());
        assert_eq!(sms.call_count(), 0);
    }

    #[tokio::test]
    async fn test_one_failing_channel_does_not_block_other() {
        let email = StubChannel::new(ChannelType::Email, SendStatus::Failed);
        let sms = StubChannel::new(ChannelType::Sms, SendStatus::Success);
        let whatsapp = StubChannel::new(ChannelType::WhatsApp, SendStatus::Failed);
        let service = NotificationService::with_default_templates()
            .with_channel(email)
            .with_channel(sms)
            .with_channel(whatsapp);

        let s = subscriber("a@example.org", Some("+2348012345678"), all_channels());
        let outcome = service.notify(&s, &payload()).await;

        assert!(outcome.is_success());
        assert_eq!(outcome.errors.len(), 2);
        assert!(outcome.errors.iter().any(|e| e.starts_with("email:")));
        assert!(outcome.errors.iter().any(|e| e.starts_with("whatsapp:")));
    }

    #[tokio::test]
    async fn test_all_skipped_counts_as_no_valid_channel() {
        let email = StubChannel::new(ChannelType::Email, SendStatus::Skipped);
        let service = NotificationService::with_default_templates().with_channel(email);

        let s = subscriber("a@example.org", None, all_channels());
        let outcome = service.notify(&s, &payload()).await;

        assert!(!outcome.is_success());
        assert_eq!(outcome.errors, vec![NO_VALID_CHANNEL.to_string()]);
    }

    #[tokio::test]
    async fn test_from_config_registers_enabled_channels_only() {
        let mut config = NotificationConfig::default();
        config.email.tls = outreach_shared::config::SmtpTls::None;
        config.sms.enabled = true;
        config.whatsapp.enabled = false;

        let service = NotificationService::from_config(&config).unwrap();
        assert_eq!(
            service.registered_channel_types(),
            vec![ChannelType::Email, ChannelType::Sms]
        );
    }

    #[test]
    fn test_register_replaces_same_type() {
        let mut service = NotificationService::with_default_templates();
        service.register_channel(StubChannel::new(ChannelType::Email, SendStatus::Success));
        service.register_channel(StubChannel::new(ChannelType::Email, SendStatus::Failed));
        service.register_channel(StubChannel::new(ChannelType::Sms, SendStatus::Success));

        assert_eq!(
            service.registered_channel_types(),
            vec![ChannelType::Email, ChannelType::Sms]
        );
    }
}
