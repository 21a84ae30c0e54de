//! 批量分发器
//!
//! 将订阅者按固定大小分批，批内并发发送、批间顺序执行并等待固定间隔，
//! 以此把第三方服务商的瞬时压力限制在一个批次的宽度之内。

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use outreach_shared::config::NotificationConfig;

use crate::models::{ChannelCounts, FailedRecipient, NotificationEvent, SourceType, Subscriber};
use crate::notification::{ChannelType, NotificationPayload, NotificationService, SubscriberOutcome};

/// 分发配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    /// 每批订阅者数量，至少为 1
    pub batch_size: usize,
    /// 批次间隔
    pub batch_delay: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            batch_delay: Duration::from_millis(1_000),
        }
    }
}

impl DispatchConfig {
    pub fn new(batch_size: usize, batch_delay: Duration) -> Self {
        Self {
            batch_size: batch_size.max(1),
            batch_delay,
        }
    }
}

impl From<&NotificationConfig> for DispatchConfig {
    fn from(config: &NotificationConfig) -> Self {
        Self::new(
            config.batch_size,
            Duration::from_millis(config.batch_delay_ms),
        )
    }
}

/// 一次分发的汇总结果
///
/// 每个订阅者恰好落在 `successful` 或 `failed` 之一
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResult {
    pub successful: Vec<SubscriberOutcome>,
    pub failed: Vec<SubscriberOutcome>,
    /// 各渠道成功送达的订阅者数
    pub channel_counts: ChannelCounts,
    /// 所有错误，格式为 `联系方式: 错误`
    pub errors: Vec<String>,
    pub batches: usize,
}

impl DispatchResult {
    pub fn attempted(&self) -> usize {
        self.successful.len() + self.failed.len()
    }

    pub fn succeeded(&self) -> usize {
        self.successful.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempted() == 0
    }

    pub fn successful_ids(&self) -> Vec<Uuid> {
        self.successful.iter().map(|o| o.subscriber_id).collect()
    }

    /// 失败收件人，多条错误以 `; ` 连接
    pub fn failed_recipients(&self) -> Vec<FailedRecipient> {
        self.failed
            .iter()
            .map(|o| FailedRecipient {
                email: o.contact.clone(),
                error: o.errors.join("; "),
            })
            .collect()
    }

    /// 生成审计记录
    pub fn to_event(&self, source_type: SourceType, source_id: impl Into<String>) -> NotificationEvent {
        NotificationEvent::new(
            source_type,
            source_id,
            self.attempted() as i32,
            self.succeeded() as i32,
            self.channel_counts,
            self.failed_recipients(),
            self.errors.clone(),
        )
    }

    fn absorb(&mut self, outcome: SubscriberOutcome) {
        for error in &outcome.errors {
            self.errors.push(format!("{}: {}", outcome.contact, error));
        }

        if outcome.channel_succeeded(ChannelType::Email) {
            self.channel_counts.email += 1;
        }
        if outcome.channel_succeeded(ChannelType::Sms) {
            self.channel_counts.sms += 1;
        }
        if outcome.channel_succeeded(ChannelType::WhatsApp) {
            self.channel_counts.whatsapp += 1;
        }

        if outcome.is_success() {
            self.successful.push(outcome);
        } else {
            self.failed.push(outcome);
        }
    }
}

/// 批量分发器
pub struct BatchDispatcher {
    service: Arc<NotificationService>,
    config: DispatchConfig,
}

impl BatchDispatcher {
    pub fn new(service: Arc<NotificationService>, config: DispatchConfig) -> Self {
        Self {
            service,
            config: DispatchConfig::new(config.batch_size, config.batch_delay),
        }
    }

    pub fn config(&self) -> DispatchConfig {
        self.config
    }

    /// 分批发送
    ///
    /// 批内全部 `notify` 结束后才进入下一批；最后一批之后不再等待。
    /// 订阅者列表为空时直接返回空结果，不调用任何渠道。
    #[instrument(
        skip(self, subscribers, payload),
        fields(
            total = subscribers.len(),
            batch_size = self.config.batch_size,
            source_type = %payload.source_type,
            source_id = %payload.source_id
        )
    )]
    pub async fn dispatch(
        &self,
        subscribers: &[Subscriber],
        payload: &NotificationPayload,
    ) -> DispatchResult {
        let mut result = DispatchResult::default();
        if subscribers.is_empty() {
            debug!("订阅者列表为空，跳过分发");
            return result;
        }

        let batch_count = subscribers.len().div_ceil(self.config.batch_size);

        for (batch_idx, batch) in subscribers.chunks(self.config.batch_size).enumerate() {
            let send_futures = batch
                .iter()
                .map(|subscriber| self.service.notify(subscriber, payload));
            let outcomes = join_all(send_futures).await;

            let before = result.succeeded();
            for outcome in outcomes {
                result.absorb(outcome);
            }
            result.batches += 1;

            debug!(
                batch = batch_idx + 1,
                batch_count,
                size = batch.len(),
                succeeded = result.succeeded() - before,
                "批次处理完成"
            );

            if batch_idx + 1 < batch_count && !self.config.batch_delay.is_zero() {
                tokio::time::sleep(self.config.batch_delay).await;
            }
        }

        info!(
            attempted = result.attempted(),
            succeeded = result.succeeded(),
            failed = result.failed_count(),
            batches = result.batches,
            "分发完成"
        );

        result
    }
}
