//! 应用状态定义

use std::sync::Arc;

use outreach_notification::NotificationPipeline;
use outreach_notification::store::{NotificationEventStore, SubscriberStore};
use outreach_shared::database::Database;

use crate::auth::JwtManager;

/// Axum 应用共享状态
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<NotificationPipeline>,
    pub subscribers: Arc<dyn SubscriberStore>,
    pub events: Arc<dyn NotificationEventStore>,
    pub jwt: Arc<JwtManager>,
    /// 内存存储模式下为 None，就绪探针据此跳过数据库检查
    pub database: Option<Database>,
}

impl AppState {
    pub fn new(
        pipeline: Arc<NotificationPipeline>,
        subscribers: Arc<dyn SubscriberStore>,
        events: Arc<dyn NotificationEventStore>,
        jwt: JwtManager,
    ) -> Self {
        Self {
            pipeline,
            subscribers,
            events,
            jwt: Arc::new(jwt),
            database: None,
        }
    }

    pub fn with_database(mut self, database: Database) -> Self {
        self.database = Some(database);
        self
    }
}
