//! 通知流水线
//!
//! 触发方入口：加载订阅者 → 分批分发 → 写入审计记录 → 更新送达信息。
//!
//! ## 错误策略
//!
//! - 订阅者加载失败是致命的，不做任何分发
//! - 单个订阅者、单个渠道的失败只体现在汇总结果中
//! - 审计记录写入失败不影响本次结果，在 `record_error` 中注明

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use outreach_shared::observability::metrics;

use super::dispatcher::{BatchDispatcher, DispatchResult};
use super::recorder::NotificationRecorder;
use crate::error::{NotificationError, Result};
use crate::models::{EventStatus, FeedItem, Subscriber, SubscriberFilter};
use crate::notification::NotificationPayload;
use crate::store::SubscriberStore;

/// 没有可通知订阅者时的提示
pub const NO_ELIGIBLE_SUBSCRIBERS: &str = "no eligible subscribers";

/// 一次分发的触发参数
#[derive(Debug, Clone)]
pub struct DispatchTrigger {
    pub payload: NotificationPayload,
    pub filter: SubscriberFilter,
}

impl DispatchTrigger {
    /// 面向全部 active / pending 订阅者
    pub fn new(payload: NotificationPayload) -> Self {
        Self {
            payload,
            filter: SubscriberFilter::default(),
        }
    }

    pub fn with_filter(mut self, filter: SubscriberFilter) -> Self {
        self.filter = filter;
        self
    }
}

/// 返回给触发方的汇总
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub emails_sent: i32,
    pub sms_sent: i32,
    pub whatsapp_sent: i32,
    pub notification_id: Option<Uuid>,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<EventStatus>,
    #[serde(skip)]
    pub message: String,
}

impl DispatchSummary {
    fn empty() -> Self {
        Self {
            message: NO_ELIGIBLE_SUBSCRIBERS.to_string(),
            ..Default::default()
        }
    }

    fn from_result(result: &DispatchResult) -> Self {
        Self {
            total: result.attempted(),
            successful: result.succeeded(),
            failed: result.failed_count(),
            emails_sent: result.channel_counts.email,
            sms_sent: result.channel_counts.sms,
            whatsapp_sent: result.channel_counts.whatsapp,
            notification_id: None,
            errors: result.errors.clone(),
            record_error: None,
            status: None,
            message: format!(
                "notified {} of {} subscribers",
                result.succeeded(),
                result.attempted()
            ),
        }
    }
}

/// 通知流水线
pub struct NotificationPipeline {
    subscribers: Arc<dyn SubscriberStore>,
    dispatcher: BatchDispatcher,
    recorder: NotificationRecorder,
}

impl NotificationPipeline {
    pub fn new(
        subscribers: Arc<dyn SubscriberStore>,
        dispatcher: BatchDispatcher,
        recorder: NotificationRecorder,
    ) -> Self {
        Self {
            subscribers,
            dispatcher,
            recorder,
        }
    }

    /// 执行一次分发
    #[instrument(
        skip(self, trigger),
        fields(
            source_type = %trigger.payload.source_type,
            source_id = %trigger.payload.source_id
        )
    )]
    pub async fn run(&self, trigger: DispatchTrigger) -> Result<DispatchSummary> {
        let start = Instant::now();
        let DispatchTrigger { payload, filter } = trigger;
        payload.validate()?;

        let subscribers = match self.subscribers.find_active_subscribers(&filter).await {
            Ok(subscribers) => subscribers,
            Err(e) => {
                error!(error = %e, "订阅者加载失败，终止分发");
                metrics::record_dispatch(
                    payload.source_type.as_str(),
                    "failed",
                    start.elapsed().as_secs_f64(),
                );
                return Err(NotificationError::SubscriberStoreUnavailable(e.to_string()));
            }
        };

        info!(count = subscribers.len(), "订阅者加载完成，开始分发");
        Ok(self.dispatch_and_record(&subscribers, &payload, start).await)
    }

    /// 向单个订阅者发送（如状态变更通知）
    #[instrument(skip(self, payload), fields(source_type = %payload.source_type))]
    pub async fn notify_subscriber(
        &self,
        subscriber_id: Uuid,
        payload: NotificationPayload,
    ) -> Result<DispatchSummary> {
        let start = Instant::now();
        payload.validate()?;

        let subscriber = self
            .subscribers
            .get(subscriber_id)
            .await
            .map_err(|e| NotificationError::SubscriberStoreUnavailable(e.to_string()))?
            .ok_or(NotificationError::SubscriberNotFound(subscriber_id))?;

        Ok(self
            .dispatch_and_record(std::slice::from_ref(&subscriber), &payload, start)
            .await)
    }

    async fn dispatch_and_record(
        &self,
        subscribers: &[Subscriber],
        payload: &NotificationPayload,
        start: Instant,
    ) -> DispatchSummary {
        let source_type = payload.source_type.as_str();

        // 空集合不写审计记录
        if subscribers.is_empty() {
            metrics::record_dispatch(source_type, "empty", start.elapsed().as_secs_f64());
            info!("{}", NO_ELIGIBLE_SUBSCRIBERS);
            return DispatchSummary::empty();
        }

        let result = self.dispatcher.dispatch(subscribers, payload).await;
        let mut summary = DispatchSummary::from_result(&result);

        let event = result.to_event(payload.source_type, payload.source_id.clone());
        let feed_item = FeedItem::new(
            payload.source_type,
            payload.source_id.clone(),
            payload.title.clone(),
            payload
                .description
                .clone()
                .unwrap_or_else(|| payload.title.clone()),
        );
        summary.status = Some(event.status);

        match self.recorder.record(&event, &feed_item).await {
            Ok(()) => summary.notification_id = Some(event.id),
            Err(e) => {
                warn!(error = %e, "通知记录写入失败，分发结果不受影响");
                summary.record_error = Some(e.to_string());
            }
        }

        self.recorder
            .record_delivery(&result.successful_ids())
            .await;

        metrics::record_dispatch(
            source_type,
            event.status.as_str(),
            start.elapsed().as_secs_f64(),
        );
        metrics::record_recipients(result.succeeded() as u64, result.failed_count() as u64);

        summary
    }
}
