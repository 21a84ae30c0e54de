//! 通知模块
//!
//! 负责向订阅者发送多渠道通知。
//!
//! ## 模块结构
//!
//! - `types`: 通知相关的数据类型定义
//! - `template`: 通知模板引擎
//! - `channels`: 各通知渠道实现（Email、SMS、WhatsApp）
//! - `service`: 单订阅者多渠道发送

pub mod channels;
pub mod service;
pub mod template;
pub mod types;

pub use channels::{
    EmailChannel, GatewayClient, NotificationChannel, SmsChannel, WhatsAppChannel,
    normalize_phone,
};
pub use service::NotificationService;
pub use template::{MessageTemplate, TemplateContext, TemplateEngine};
pub use types::{
    ChannelResult, ChannelType, NO_VALID_CHANNEL, NotificationPayload, RenderedContent,
    SendStatus, SubscriberOutcome,
};
