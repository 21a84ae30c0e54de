//! 集成测试公共工具

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use outreach_notification::models::{ChannelPreferences, NewSubscriber, Subscriber, SubscriberStatus};
use outreach_notification::notification::{
    ChannelResult, ChannelType, NotificationChannel, RenderedContent,
};
use outreach_shared::test_utils::{ContactTestData, TestDataGenerator};

/// 可编排结果的测试渠道
///
/// `failing` 中的收件地址返回失败，其余成功；记录每次调用的时间与并发峰值
pub struct ScriptedChannel {
    channel_type: ChannelType,
    failing: Mutex<HashSet<String>>,
    latency: Duration,
    calls: Mutex<Vec<(String, Instant)>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedChannel {
    pub fn new(channel_type: ChannelType) -> Self {
        Self {
            channel_type,
            failing: Mutex::new(HashSet::new()),
            latency: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn fail_for(&self, destinations: impl IntoIterator<Item = String>) {
        self.failing.lock().unwrap().extend(destinations);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<(String, Instant)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationChannel for ScriptedChannel {
    fn channel_type(&self) -> ChannelType {
        self.channel_type
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn destination(&self, subscriber: &Subscriber) -> Option<String> {
        match self.channel_type {
            ChannelType::Email => subscriber.email_address().map(String::from),
            ChannelType::Sms | ChannelType::WhatsApp => subscriber.phone_number().map(String::from),
        }
    }

    async fn send(&self, destination: &str, _content: &RenderedContent) -> ChannelResult {
        self.calls
            .lock()
            .unwrap()
            .push((destination.to_string(), Instant::now()));

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.lock().unwrap().contains(destination) {
            ChannelResult::failed(self.channel_type, "provider rejected", 1)
        } else {
            ChannelResult::success(self.channel_type, Some(format!("msg-{}", destination)), 1)
        }
    }
}

/// 由测试联系人构造 active 订阅者
pub fn subscriber_from(contact: ContactTestData, preferences: ChannelPreferences) -> Subscriber {
    let mut subscriber = Subscriber::from_new(NewSubscriber {
        email: Some(contact.email),
        phone: contact.phone,
        name: contact.name,
        preferences: Some(preferences),
    });
    subscriber.status = SubscriberStatus::Active;
    subscriber
}

/// 邮箱与手机号齐全、默认偏好（email + sms）的订阅者
pub fn full_subscribers(count: usize) -> Vec<Subscriber> {
    TestDataGenerator::contacts(count)
        .into_iter()
        .map(|c| subscriber_from(c, ChannelPreferences::default()))
        .collect()
}

pub fn phone_only_subscriber() -> Subscriber {
    subscriber_from(TestDataGenerator::phone_contact(), ChannelPreferences::default())
}

pub fn no_contact_subscriber() -> Subscriber {
    subscriber_from(
        ContactTestData {
            email: String::new(),
            phone: None,
            name: None,
        },
        ChannelPreferences::default(),
    )
}
