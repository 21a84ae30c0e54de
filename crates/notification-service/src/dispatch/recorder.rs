//! 通知记录写入
//!
//! 每次分发写入一条不可变的审计记录和一条通知动态，不做去重。
//! 送达信息（`last_notified_at` / `notification_count`）的更新是尽力而为的。

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{NotificationError, Result};
use crate::models::{FeedItem, NotificationEvent};
use crate::store::{NotificationEventStore, SubscriberStore};

/// 通知记录写入器
pub struct NotificationRecorder {
    events: Arc<dyn NotificationEventStore>,
    subscribers: Arc<dyn SubscriberStore>,
}

impl NotificationRecorder {
    pub fn new(events: Arc<dyn NotificationEventStore>, subscribers: Arc<dyn SubscriberStore>) -> Self {
        Self {
            events,
            subscribers,
        }
    }

    /// 写入审计记录与通知动态
    ///
    /// 审计记录写入失败返回 `RecordWrite`；动态写入失败只记录日志
    pub async fn record(&self, event: &NotificationEvent, feed_item: &FeedItem) -> Result<()> {
        self.events
            .insert_event(event)
            .await
            .map_err(|e| NotificationError::RecordWrite(e.to_string()))?;

        if let Err(e) = self.events.insert_feed_item(feed_item).await {
            warn!(event_id = %event.id, error = %e, "通知动态写入失败");
        }

        info!(
            event_id = %event.id,
            source_type = %event.source_type,
            source_id = %event.source_id,
            status = event.status.as_str(),
            "通知记录已写入"
        );
        Ok(())
    }

    /// 更新成功收件人的送达信息，失败时只记录日志
    pub async fn record_delivery(&self, subscriber_ids: &[Uuid]) {
        if subscriber_ids.is_empty() {
            return;
        }

        match self.subscribers.record_delivery(subscriber_ids, Utc::now()).await {
            Ok(updated) => {
                info!(updated, requested = subscriber_ids.len(), "送达信息已更新");
            }
            Err(e) => {
                warn!(error = %e, count = subscriber_ids.len(), "送达信息更新失败，忽略");
            }
        }
    }
}
