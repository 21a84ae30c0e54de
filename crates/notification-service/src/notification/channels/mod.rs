//! 通知渠道实现
//!
//! 定义通知渠道 trait 并提供各种渠道的具体实现。
//!
//! ## 支持的渠道
//!
//! - **Email**: SMTP 邮件（lettre）
//! - **SMS**: 短信网关 HTTP 接口（reqwest）
//! - **WhatsApp**: 与短信共用消息网关，收件号码加 `whatsapp:` 前缀

mod email;
mod gateway;
mod sms;
mod whatsapp;

pub use email::{EmailChannel, EmailFailure};
pub use gateway::{GatewayClient, GatewayFailure, GatewayReceipt};
pub use sms::SmsChannel;
pub use whatsapp::{WHATSAPP_PREFIX, WhatsAppChannel};

use async_trait::async_trait;

use super::types::{ChannelResult, ChannelType, RenderedContent};
use crate::models::Subscriber;

/// 通知渠道 trait
///
/// 渠道实现应当是无状态的，便于并发调用。
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// 渠道类型标识
    fn channel_type(&self) -> ChannelType;

    /// 渠道名称（用于日志）
    fn name(&self) -> &str;

    /// 订阅者在该渠道上的收件地址，缺失时返回 None
    fn destination(&self, subscriber: &Subscriber) -> Option<String>;

    /// 发送通知
    ///
    /// 所有服务商错误都转换为 `ChannelResult::failed`，不向外抛出；
    /// 渠道被禁用时返回 `ChannelResult::skipped`。
    async fn send(&self, destination: &str, content: &RenderedContent) -> ChannelResult;
}

/// 规范化国际号码
///
/// 去除空格、短横线、括号与点号后，要求形如 `+` 加 8 到 15 位数字
pub fn normalize_phone(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
        .collect();

    let digits = cleaned.strip_prefix('+')?;
    let valid = (8..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit());

    valid.then_some(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_phone() {
        let cases = vec![
            ("+2348012345678", Some("+2348012345678")),
            ("+234 801 234 5678", Some("+2348012345678")),
            ("+1 (555) 010-9999", Some("+15550109999")),
            ("+44.20.7946.0958", Some("+442079460958")),
            ("08012345678", None),
            ("+1234567", None),
            ("+1234567890123456", None),
            ("+23480abc5678", None),
            ("", None),
            ("+", None),
        ];

        for (raw, expected) in cases {
            assert_eq!(
                normalize_phone(raw).as_deref(),
                expected,
                "号码 {:?} 的规范化结果不符",
                raw
            );
        }
    }
}
