//! 内存存储实现
//!
//! 用于测试与 `storage.backend = "memory"` 的本地开发模式，进程退出即丢失

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use super::traits::{NotificationEventStore, SubscriberStore};
use crate::error::{NotificationError, Result};
use crate::models::{
    AdminAction, FeedItem, NewSubscriber, NotificationEvent, Page, PageWindow, Subscriber,
    SubscriberFilter, SubscriberQuery, SubscriberStatus,
};

/// 内存订阅者存储
#[derive(Default)]
pub struct InMemorySubscriberStore {
    subscribers: DashMap<Uuid, Subscriber>,
    actions: DashMap<Uuid, AdminAction>,
}

impl InMemorySubscriberStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 直接写入订阅者（测试用，不做重复校验）
    pub fn insert(&self, subscriber: Subscriber) {
        self.subscribers.insert(subscriber.id, subscriber);
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// 已写入的审计记录，按时间升序
    pub fn admin_actions(&self) -> Vec<AdminAction> {
        let mut actions: Vec<AdminAction> =
            self.actions.iter().map(|e| e.value().clone()).collect();
        actions.sort_by_key(|a| (a.created_at, a.id));
        actions
    }

    fn sorted<F>(&self, predicate: F) -> Vec<Subscriber>
    where
        F: Fn(&Subscriber) -> bool,
    {
        let mut subscribers: Vec<Subscriber> = self
            .subscribers
            .iter()
            .filter(|e| predicate(e.value()))
            .map(|e| e.value().clone())
            .collect();
        subscribers.sort_by_key(|s| (s.subscribed_at, s.id));
        subscribers
    }

    fn conflicts(&self, candidate: &Subscriber) -> bool {
        self.subscribers.iter().any(|e| {
            let existing = e.value();
            let same_email = candidate
                .email_address()
                .is_some_and(|email| existing.email_address() == Some(email));
            let same_phone = candidate
                .phone_number()
                .is_some_and(|phone| existing.phone_number() == Some(phone));
            same_email || same_phone
        })
    }
}

#[async_trait]
impl SubscriberStore for InMemorySubscriberStore {
    async fn find_active_subscribers(&self, filter: &SubscriberFilter) -> Result<Vec<Subscriber>> {
        Ok(self.sorted(|s| filter.matches(s)))
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: SubscriberStatus,
        reason: Option<String>,
    ) -> Result<()> {
        let mut subscriber = self
            .subscribers
            .get_mut(&id)
            .ok_or(NotificationError::SubscriberNotFound(id))?;
        subscriber.status = status;
        subscriber.status_reason = reason;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Subscriber>> {
        Ok(self.subscribers.get(&id).map(|e| e.value().clone()))
    }

    async fn create(&self, new_subscriber: NewSubscriber) -> Result<Subscriber> {
        let subscriber = Subscriber::from_new(new_subscriber);
        if self.conflicts(&subscriber) {
            return Err(NotificationError::SubscriberAlreadyExists(
                subscriber.contact(),
            ));
        }
        self.subscribers.insert(subscriber.id, subscriber.clone());
        Ok(subscriber)
    }

    async fn list(&self, query: &SubscriberQuery) -> Result<Page<Subscriber>> {
        let mut all = self.sorted(|s| query.status.is_none_or(|status| s.status == status));
        all.reverse();

        let window = query.window();
        let total = all.len() as i64;
        let items = all
            .into_iter()
            .skip(window.skip())
            .take(window.take())
            .collect();

        Ok(Page {
            items,
            total,
            page: window.page,
            page_size: window.limit,
        })
    }

    async fn delete(&self, id: Uuid, action: &AdminAction) -> Result<()> {
        self.subscribers
            .remove(&id)
            .ok_or(NotificationError::SubscriberNotFound(id))?;
        self.actions.insert(action.id, action.clone());
        Ok(())
    }

    async fn record_admin_action(&self, action: &AdminAction) -> Result<()> {
        self.actions.insert(action.id, action.clone());
        Ok(())
    }

    async fn record_delivery(&self, ids: &[Uuid], at: DateTime<Utc>) -> Result<u64> {
        let mut updated = 0;
        for id in ids {
            if let Some(mut subscriber) = self.subscribers.get_mut(id) {
                subscriber.last_notified_at = Some(at);
                subscriber.notification_count += 1;
                updated += 1;
            }
        }
        Ok(updated)
    }
}

/// 内存通知记录存储
#[derive(Default)]
pub struct InMemoryNotificationEventStore {
    events: DashMap<Uuid, NotificationEvent>,
    feed: DashMap<Uuid, FeedItem>,
}

impl InMemoryNotificationEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn feed_count(&self) -> usize {
        self.feed.len()
    }
}

#[async_trait]
impl NotificationEventStore for InMemoryNotificationEventStore {
    async fn insert_event(&self, event: &NotificationEvent) -> Result<()> {
        self.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn insert_feed_item(&self, item: &FeedItem) -> Result<()> {
        self.feed.insert(item.id, item.clone());
        Ok(())
    }

    async fn list_events(&self, page: i64, page_size: i64) -> Result<Page<NotificationEvent>> {
        let window = PageWindow::new(page, page_size);

        let mut events: Vec<NotificationEvent> =
            self.events.iter().map(|e| e.value().clone()).collect();
        events.sort_by_key(|e| std::cmp::Reverse((e.created_at, e.id)));

        let total = events.len() as i64;
        let items = events
            .into_iter()
            .skip(window.skip())
            .take(window.take())
            .collect();

        Ok(Page {
            items,
            total,
            page: window.page,
            page_size: window.limit,
        })
    }

    async fn get_event(&self, id: Uuid) -> Result<Option<NotificationEvent>> {
        Ok(self.events.get(&id).map(|e| e.value().clone()))
    }

    async fn list_feed(&self, limit: i64) -> Result<Vec<FeedItem>> {
        let mut items: Vec<FeedItem> = self.feed.iter().map(|e| e.value().clone()).collect();
        items.sort_by_key(|i| std::cmp::Reverse((i.created_at, i.id)));
        items.truncate(limit.clamp(1, 100) as usize);
        Ok(items)
    }
}
