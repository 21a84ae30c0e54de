//! WhatsApp 通知渠道
//!
//! 与短信共用消息网关，收件号码在线路上带 `whatsapp:` 前缀。

use async_trait::async_trait;

use outreach_shared::config::MessagingSettings;

use super::{GatewayClient, NotificationChannel};
use crate::error::Result;
use crate::models::Subscriber;
use crate::notification::types::{ChannelResult, ChannelType, RenderedContent};

pub const WHATSAPP_PREFIX: &str = "whatsapp:";

/// WhatsApp 通知渠道
pub struct WhatsAppChannel {
    client: GatewayClient,
}

impl WhatsAppChannel {
    pub fn new(settings: MessagingSettings) -> Result<Self> {
        Ok(Self {
            client: GatewayClient::new(ChannelType::WhatsApp, settings)?,
        })
    }

    pub fn from_client(client: GatewayClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NotificationChannel for WhatsAppChannel {
    fn channel_type(&self) -> ChannelType {
        ChannelType::WhatsApp
    }

    fn name(&self) -> &str {
        "WhatsApp"
    }

    fn destination(&self, subscriber: &Subscriber) -> Option<String> {
        subscriber.phone_number().map(String::from)
    }

    async fn send(&self, destination: &str, content: &RenderedContent) -> ChannelResult {
        // 号码可能已带前缀，去掉后统一校验
        let number = destination
            .strip_prefix(WHATSAPP_PREFIX)
            .unwrap_or(destination);
        self.client
            .deliver(number, &content.short_text, WHATSAPP_PREFIX)
            .await
    }
}
