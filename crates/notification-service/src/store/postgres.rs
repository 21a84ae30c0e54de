//! PostgreSQL 存储实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::debug;
use uuid::Uuid;

use super::traits::{NotificationEventStore, SubscriberStore};
use crate::error::{NotificationError, Result};
use crate::models::{
    AdminAction, ChannelCounts, EventStatus, FailedRecipient, FeedItem, NewSubscriber,
    NotificationEvent, Page, PageWindow, SourceType, Subscriber, SubscriberFilter,
    SubscriberQuery, SubscriberStatus,
};

const SUBSCRIBER_COLUMNS: &str = "id, email, phone, name, status, status_reason, subscribed_at, \
                                  preferences, last_notified_at, notification_count";

/// 订阅者存储
pub struct PgSubscriberStore {
    pool: PgPool,
}

impl PgSubscriberStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn status_strings(statuses: &[SubscriberStatus]) -> Vec<&'static str> {
    statuses.iter().map(SubscriberStatus::as_str).collect()
}

#[async_trait]
impl SubscriberStore for PgSubscriberStore {
    async fn find_active_subscribers(&self, filter: &SubscriberFilter) -> Result<Vec<Subscriber>> {
        let sql = format!(
            r#"
            SELECT {SUBSCRIBER_COLUMNS}
            FROM subscribers
            WHERE status = ANY($1)
              AND ($2::uuid[] IS NULL OR id = ANY($2))
            ORDER BY subscribed_at ASC, id ASC
            "#
        );

        let subscribers = sqlx::query_as::<_, Subscriber>(&sql)
            .bind(status_strings(&filter.statuses))
            .bind(filter.ids.as_deref())
            .fetch_all(&self.pool)
            .await?;

        debug!(count = subscribers.len(), "查询可通知订阅者");
        Ok(subscribers)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: SubscriberStatus,
        reason: Option<String>,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE subscribers
            SET status = $2, status_reason = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(reason)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(NotificationError::SubscriberNotFound(id));
        }
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Subscriber>> {
        let sql = format!("SELECT {SUBSCRIBER_COLUMNS} FROM subscribers WHERE id = $1");
        let subscriber = sqlx::query_as::<_, Subscriber>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(subscriber)
    }

    async fn create(&self, new_subscriber: NewSubscriber) -> Result<Subscriber> {
        let subscriber = Subscriber::from_new(new_subscriber);

        let inserted = sqlx::query(
            r#"
            INSERT INTO subscribers
                (id, email, phone, name, status, subscribed_at, preferences, notification_count)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 0)
            "#,
        )
        .bind(subscriber.id)
        .bind(&subscriber.email)
        .bind(&subscriber.phone)
        .bind(&subscriber.name)
        .bind(subscriber.status)
        .bind(subscriber.subscribed_at)
        .bind(Json(&subscriber.preferences))
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(_) => Ok(subscriber),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(
                NotificationError::SubscriberAlreadyExists(subscriber.contact()),
            ),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, query: &SubscriberQuery) -> Result<Page<Subscriber>> {
        let status = query.status.map(|s| s.as_str());
        let window = query.window();

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM subscribers WHERE ($1::varchar IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        let sql = format!(
            r#"
            SELECT {SUBSCRIBER_COLUMNS}
            FROM subscribers
            WHERE ($1::varchar IS NULL OR status = $1)
            ORDER BY subscribed_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        );
        let items = sqlx::query_as::<_, Subscriber>(&sql)
            .bind(status)
            .bind(window.limit)
            .bind(window.offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            items,
            total,
            page: window.page,
            page_size: window.limit,
        })
    }

    async fn delete(&self, id: Uuid, action: &AdminAction) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM subscribers WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(NotificationError::SubscriberNotFound(id));
        }

        insert_admin_action(&mut *tx, action).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn record_admin_action(&self, action: &AdminAction) -> Result<()> {
        insert_admin_action(&self.pool, action).await
    }

    async fn record_delivery(&self, ids: &[Uuid], at: DateTime<Utc>) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            r#"
            UPDATE subscribers
            SET last_notified_at = $2, notification_count = notification_count + 1
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

async fn insert_admin_action<'e, E>(executor: E, action: &AdminAction) -> Result<()>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO admin_actions
            (id, admin_id, admin_name, action, subscriber_id, detail, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(action.id)
    .bind(&action.admin_id)
    .bind(&action.admin_name)
    .bind(action.action)
    .bind(action.subscriber_id)
    .bind(&action.detail)
    .bind(action.created_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// 通知记录存储
pub struct PgNotificationEventStore {
    pool: PgPool,
}

impl PgNotificationEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// 渠道计数拆成独立列存储
#[derive(sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    source_type: SourceType,
    source_id: String,
    recipients_attempted: i32,
    recipients_succeeded: i32,
    email_sent: i32,
    sms_sent: i32,
    whatsapp_sent: i32,
    failed_recipients: Json<Vec<FailedRecipient>>,
    errors: Json<Vec<String>>,
    status: EventStatus,
    created_at: DateTime<Utc>,
}

impl From<EventRow> for NotificationEvent {
    fn from(row: EventRow) -> Self {
        Self {
            id: row.id,
            source_type: row.source_type,
            source_id: row.source_id,
            recipients_attempted: row.recipients_attempted,
            recipients_succeeded: row.recipients_succeeded,
            channel_counts: ChannelCounts {
                email: row.email_sent,
                sms: row.sms_sent,
                whatsapp: row.whatsapp_sent,
            },
            failed_recipients: row.failed_recipients.0,
            errors: row.errors.0,
            status: row.status,
            created_at: row.created_at,
        }
    }
}

const EVENT_COLUMNS: &str = "id, source_type, source_id, recipients_attempted, \
                             recipients_succeeded, email_sent, sms_sent, whatsapp_sent, \
                             failed_recipients, errors, status, created_at";

#[async_trait]
impl NotificationEventStore for PgNotificationEventStore {
    async fn insert_event(&self, event: &NotificationEvent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notification_events
                (id, source_type, source_id, recipients_attempted, recipients_succeeded,
                 email_sent, sms_sent, whatsapp_sent, failed_recipients, errors, status,
                 created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(event.id)
        .bind(event.source_type)
        .bind(&event.source_id)
        .bind(event.recipients_attempted)
        .bind(event.recipients_succeeded)
        .bind(event.channel_counts.email)
        .bind(event.channel_counts.sms)
        .bind(event.channel_counts.whatsapp)
        .bind(Json(&event.failed_recipients))
        .bind(Json(&event.errors))
        .bind(event.status)
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_feed_item(&self, item: &FeedItem) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (id, source_type, source_id, title, message, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(item.id)
        .bind(item.source_type)
        .bind(&item.source_id)
        .bind(&item.title)
        .bind(&item.message)
        .bind(item.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_events(&self, page: i64, page_size: i64) -> Result<Page<NotificationEvent>> {
        let window = PageWindow::new(page, page_size);

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notification_events")
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            r#"
            SELECT {EVENT_COLUMNS}
            FROM notification_events
            ORDER BY created_at DESC, id DESC
            LIMIT $1 OFFSET $2
            "#
        );
        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .bind(window.limit)
            .bind(window.offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            items: rows.into_iter().map(NotificationEvent::from).collect(),
            total,
            page: window.page,
            page_size: window.limit,
        })
    }

    async fn get_event(&self, id: Uuid) -> Result<Option<NotificationEvent>> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM notification_events WHERE id = $1");
        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(NotificationEvent::from))
    }

    async fn list_feed(&self, limit: i64) -> Result<Vec<FeedItem>> {
        let items = sqlx::query_as::<_, FeedItem>(
            r#"
            SELECT id, source_type, source_id, title, message, created_at
            FROM notifications
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit.clamp(1, 100))
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }
}
