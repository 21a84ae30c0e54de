//! 存储 Trait 定义
//!
//! 分发流程只依赖这些接口，便于在测试中替换为内存实现或 mock

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    AdminAction, FeedItem, NewSubscriber, NotificationEvent, Page, Subscriber, SubscriberFilter,
    SubscriberQuery, SubscriberStatus,
};

/// 订阅者存储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriberStore: Send + Sync {
    /// 按状态集合（及可选的 id 列表）查询订阅者，按报名时间升序
    async fn find_active_subscribers(&self, filter: &SubscriberFilter) -> Result<Vec<Subscriber>>;

    /// 变更订阅状态，订阅者不存在时返回 `SubscriberNotFound`
    async fn update_status(
        &self,
        id: Uuid,
        status: SubscriberStatus,
        reason: Option<String>,
    ) -> Result<()>;

    async fn get(&self, id: Uuid) -> Result<Option<Subscriber>>;

    /// 新增订阅者，邮箱（忽略大小写）或手机号重复时返回 `SubscriberAlreadyExists`
    async fn create(&self, new_subscriber: NewSubscriber) -> Result<Subscriber>;

    async fn list(&self, query: &SubscriberQuery) -> Result<Page<Subscriber>>;

    /// 物理删除订阅者并写入审计记录
    async fn delete(&self, id: Uuid, action: &AdminAction) -> Result<()>;

    /// 写入管理员操作审计记录
    async fn record_admin_action(&self, action: &AdminAction) -> Result<()>;

    /// 更新送达信息：`last_notified_at` 置为 `at`，`notification_count` 加一
    ///
    /// 返回实际更新的行数
    async fn record_delivery(&self, ids: &[Uuid], at: DateTime<Utc>) -> Result<u64>;
}

/// 通知记录存储接口
///
/// 只追加，不提供更新与删除
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationEventStore: Send + Sync {
    async fn insert_event(&self, event: &NotificationEvent) -> Result<()>;

    async fn insert_feed_item(&self, item: &FeedItem) -> Result<()>;

    /// 按创建时间倒序分页
    async fn list_events(&self, page: i64, page_size: i64) -> Result<Page<NotificationEvent>>;

    async fn get_event(&self, id: Uuid) -> Result<Option<NotificationEvent>>;

    /// 最近的通知动态
    async fn list_feed(&self, limit: i64) -> Result<Vec<FeedItem>>;
}
