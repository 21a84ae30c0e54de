//! API 测试公共工具

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use outreach_admin_service::{AppState, JwtManager, routes};
use outreach_notification::models::{
    AdminAction, ChannelPreferences, NewSubscriber, Page, Subscriber, SubscriberFilter,
    SubscriberQuery, SubscriberStatus,
};
use outreach_notification::notification::{
    ChannelResult, ChannelType, NotificationChannel, RenderedContent,
};
use outreach_notification::store::{
    InMemoryNotificationEventStore, InMemorySubscriberStore, SubscriberStore,
};
use outreach_notification::{
    BatchDispatcher, DispatchConfig, NotificationError, NotificationPipeline,
    NotificationRecorder, NotificationService,
};
use outreach_shared::config::JwtSettings;
use outreach_shared::test_utils::TestDataGenerator;

/// 总是成功的计数渠道
pub struct CountingChannel {
    channel_type: ChannelType,
    calls: AtomicUsize,
}

impl CountingChannel {
    pub fn new(channel_type: ChannelType) -> Self {
        Self {
            channel_type,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationChannel for CountingChannel {
    fn channel_type(&self) -> ChannelType {
        self.channel_type
    }

    fn name(&self) -> &str {
        "counting"
    }

    fn destination(&self, subscriber: &Subscriber) -> Option<String> {
        match self.channel_type {
            ChannelType::Email => subscriber.email_address().map(String::from),
            _ => subscriber.phone_number().map(String::from),
        }
    }

    async fn send(&self, _destination: &str, _content: &RenderedContent) -> ChannelResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ChannelResult::success(self.channel_type, Some(Uuid::now_v7().to_string()), 1)
    }
}

/// 查询一律失败的订阅者存储，模拟数据库不可用
pub struct UnavailableStore;

fn unavailable() -> NotificationError {
    NotificationError::Database(sqlx::Error::PoolTimedOut)
}

#[async_trait]
impl SubscriberStore for UnavailableStore {
    async fn find_active_subscribers(
        &self,
        _filter: &SubscriberFilter,
    ) -> outreach_notification::Result<Vec<Subscriber>> {
        Err(unavailable())
    }

    async fn update_status(
        &self,
        _id: Uuid,
        _status: SubscriberStatus,
        _reason: Option<String>,
    ) -> outreach_notification::Result<()> {
        Err(unavailable())
    }

    async fn get(&self, _id: Uuid) -> outreach_notification::Result<Option<Subscriber>> {
        Err(unavailable())
    }

    async fn create(&self, _new: NewSubscriber) -> outreach_notification::Result<Subscriber> {
        Err(unavailable())
    }

    async fn list(&self, _query: &SubscriberQuery) -> outreach_notification::Result<Page<Subscriber>> {
        Err(unavailable())
    }

    async fn delete(&self, _id: Uuid, _action: &AdminAction) -> outreach_notification::Result<()> {
        Err(unavailable())
    }

    async fn record_admin_action(&self, _action: &AdminAction) -> outreach_notification::Result<()> {
        Err(unavailable())
    }

    async fn record_delivery(
        &self,
        _ids: &[Uuid],
        _at: DateTime<Utc>,
    ) -> outreach_notification::Result<u64> {
        Err(unavailable())
    }
}

pub struct TestApp {
    pub router: Router,
    pub subscribers: Arc<InMemorySubscriberStore>,
    pub events: Arc<InMemoryNotificationEventStore>,
    pub email: Arc<CountingChannel>,
    pub sms: Arc<CountingChannel>,
    jwt: JwtManager,
}

impl TestApp {
    pub fn new() -> Self {
        let subscribers = Arc::new(InMemorySubscriberStore::new());
        Self::with_store(subscribers.clone(), subscribers)
    }

    /// 分发流程使用 `pipeline_store`，其余接口仍走内存存储
    pub fn with_store(
        subscribers: Arc<InMemorySubscriberStore>,
        pipeline_store: Arc<dyn SubscriberStore>,
    ) -> Self {
        let events = Arc::new(InMemoryNotificationEventStore::new());
        let email = Arc::new(CountingChannel::new(ChannelType::Email));
        let sms = Arc::new(CountingChannel::new(ChannelType::Sms));

        let service = NotificationService::with_default_templates()
            .with_channel(email.clone())
            .with_channel(sms.clone());
        let dispatcher =
            BatchDispatcher::new(Arc::new(service), DispatchConfig::new(10, Duration::ZERO));
        let recorder = NotificationRecorder::new(events.clone(), pipeline_store.clone());
        let pipeline = Arc::new(NotificationPipeline::new(pipeline_store, dispatcher, recorder));

        let settings = JwtSettings::default();
        let state = AppState::new(
            pipeline,
            subscribers.clone(),
            events.clone(),
            JwtManager::new(&settings),
        );

        Self {
            router: routes::app(state),
            subscribers,
            events,
            email,
            sms,
            jwt: JwtManager::new(&settings),
        }
    }

    /// 写入 n 个 active 订阅者
    pub fn seed_active(&self, n: usize) -> Vec<Subscriber> {
        TestDataGenerator::contacts(n)
            .into_iter()
            .map(|contact| {
                let mut subscriber = Subscriber::from_new(NewSubscriber {
                    email: Some(contact.email),
                    phone: contact.phone,
                    name: contact.name,
                    preferences: Some(ChannelPreferences::default()),
                });
                subscriber.status = SubscriberStatus::Active;
                self.subscribers.insert(subscriber.clone());
                subscriber
            })
            .collect()
    }

    pub fn token(&self, role: &str) -> String {
        let (token, _) = self
            .jwt
            .generate_token("admin-1", "Office Admin", role)
            .unwrap();
        token
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}
