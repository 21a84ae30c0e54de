//! SMS 短信通知渠道
//!
//! 通过消息网关发送短信，正文使用渲染后的短文本。

use async_trait::async_trait;

use outreach_shared::config::MessagingSettings;

use super::{GatewayClient, NotificationChannel};
use crate::error::Result;
use crate::models::Subscriber;
use crate::notification::types::{ChannelResult, ChannelType, RenderedContent};

/// SMS 短信通知渠道
pub struct SmsChannel {
    client: GatewayClient,
}

impl SmsChannel {
    pub fn new(settings: MessagingSettings) -> Result<Self> {
        Ok(Self {
            client: GatewayClient::new(ChannelType::Sms, settings)?,
        })
    }

    pub fn from_client(client: GatewayClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NotificationChannel for SmsChannel {
    fn channel_type(&self) -> ChannelType {
        ChannelType::Sms
    }

    fn name(&self) -> &str {
        "SMS"
    }

    fn destination(&self, subscriber: &Subscriber) -> Option<String> {
        subscriber.phone_number().map(String::from)
    }

    async fn send(&self, destination: &str, content: &RenderedContent) -> ChannelResult {
        self.client
            .deliver(destination, &content.short_text, "")
            .await
    }
}
