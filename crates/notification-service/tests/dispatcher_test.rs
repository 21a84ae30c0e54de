//! 批量分发器集成测试
//!
//! 计时相关的用例使用暂停的 tokio 时钟，批次间隔可以精确断言

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use common::{ScriptedChannel, full_subscribers, no_contact_subscriber, phone_only_subscriber};
use outreach_notification::models::{EventStatus, SourceType};
use outreach_notification::notification::{ChannelType, NO_VALID_CHANNEL};
use outreach_notification::{BatchDispatcher, DispatchConfig, NotificationPayload, NotificationService};

fn payload() -> NotificationPayload {
    NotificationPayload::new(SourceType::Achievement, "ach-2024-017", "Ward 3 borehole commissioned")
        .with_description("Clean water for 4,000 residents.")
}

struct Harness {
    email: Arc<ScriptedChannel>,
    sms: Arc<ScriptedChannel>,
    dispatcher: BatchDispatcher,
}

fn harness(batch_size: usize, delay: Duration, latency: Duration) -> Harness {
    let email = Arc::new(ScriptedChannel::new(ChannelType::Email).with_latency(latency));
    let sms = Arc::new(ScriptedChannel::new(ChannelType::Sms).with_latency(latency));
    let service = NotificationService::with_default_templates()
        .with_channel(email.clone())
        .with_channel(sms.clone());
    let dispatcher = BatchDispatcher::new(Arc::new(service), DispatchConfig::new(batch_size, delay));

    Harness {
        email,
        sms,
        dispatcher,
    }
}

#[tokio::test(start_paused = true)]
async fn test_batches_and_delays_follow_ceiling_rule() {
    for (n, b) in [(1usize, 10usize), (10, 10), (11, 10), (25, 10), (7, 3), (9, 1)] {
        let h = harness(b, Duration::from_secs(1), Duration::ZERO);
        let subscribers = full_subscribers(n);

        let start = Instant::now();
        let result = h.dispatcher.dispatch(&subscribers, &payload()).await;
        let elapsed = start.elapsed();

        let expected_batches = n.div_ceil(b);
        assert_eq!(result.batches, expected_batches, "n={} b={}", n, b);
        assert_eq!(
            elapsed,
            Duration::from_secs((expected_batches - 1) as u64),
            "批次间隔次数应为 batches - 1 (n={} b={})",
            n,
            b
        );
        assert_eq!(result.succeeded() + result.failed_count(), n);
    }
}

#[tokio::test(start_paused = true)]
async fn test_twenty_five_subscribers_with_email_outage_in_second_batch() {
    let h = harness(10, Duration::from_secs(1), Duration::ZERO);
    let subscribers = full_subscribers(25);

    // 第二批（下标 10..20）邮件全部失败，短信正常
    h.email.fail_for(
        subscribers[10..20]
            .iter()
            .map(|s| s.email.clone()),
    );

    let result = h.dispatcher.dispatch(&subscribers, &payload()).await;

    assert_eq!(result.batches, 3);
    assert_eq!(result.attempted(), 25);
    assert_eq!(result.succeeded(), 25, "包容性规则：短信成功即视为送达");
    assert_eq!(result.failed_count(), 0);
    assert_eq!(result.channel_counts.email, 15);
    assert_eq!(result.channel_counts.sms, 25);
    assert!((result.channel_counts.email as usize) < result.succeeded());
    assert_eq!(result.errors.len(), 10);
    assert!(
        result
            .errors
            .iter()
            .all(|e| e.contains(": email: provider rejected"))
    );

    // 批次大小 10、10、5，按一秒间隔依次开始
    let calls = h.sms.calls();
    let origin = calls[0].1;
    let offsets: Vec<u64> = calls
        .iter()
        .map(|(_, at)| at.duration_since(origin).as_secs())
        .collect();
    assert_eq!(offsets.iter().filter(|&&o| o == 0).count(), 10);
    assert_eq!(offsets.iter().filter(|&&o| o == 1).count(), 10);
    assert_eq!(offsets.iter().filter(|&&o| o == 2).count(), 5);

    let event = result.to_event(SourceType::Achievement, "ach-2024-017");
    assert_eq!(event.status, EventStatus::Sent);
}

#[tokio::test(start_paused = true)]
async fn test_calls_within_batch_run_concurrently() {
    let h = harness(10, Duration::from_secs(1), Duration::from_millis(200));
    let subscribers = full_subscribers(25);

    let start = Instant::now();
    h.dispatcher.dispatch(&subscribers, &payload()).await;

    assert_eq!(h.email.peak_in_flight(), 10);
    // 三批各 200ms，加两次 1s 间隔
    assert_eq!(start.elapsed(), Duration::from_millis(2_600));
}

#[tokio::test]
async fn test_empty_subscriber_list_makes_no_calls() {
    let h = harness(10, Duration::from_secs(1), Duration::ZERO);

    let result = h.dispatcher.dispatch(&[], &payload()).await;

    assert!(result.is_empty());
    assert_eq!(result.batches, 0);
    assert_eq!(h.email.call_count(), 0);
    assert_eq!(h.sms.call_count(), 0);
}

#[tokio::test]
async fn test_phone_only_and_no_contact_subscribers() {
    let h = harness(10, Duration::ZERO, Duration::ZERO);
    let phone_only = phone_only_subscriber();
    let nobody = no_contact_subscriber();
    let nobody_id = nobody.id;

    let result = h
        .dispatcher
        .dispatch(&[phone_only.clone(), nobody], &payload())
        .await;

    assert_eq!(result.succeeded(), 1);
    assert_eq!(result.successful[0].subscriber_id, phone_only.id);
    assert_eq!(h.email.call_count(), 0);

    assert_eq!(result.failed_count(), 1);
    let failed = &result.failed[0];
    assert_eq!(failed.subscriber_id, nobody_id);
    assert_eq!(failed.errors, vec![NO_VALID_CHANNEL.to_string()]);

    let recipients = result.failed_recipients();
    assert_eq!(recipients[0].error, NO_VALID_CHANNEL);
    // 没有任何联系方式时以 id 作为标识
    assert_eq!(recipients[0].email, nobody_id.to_string());
}

#[tokio::test]
async fn test_every_subscriber_classified_exactly_once() {
    let h = harness(4, Duration::ZERO, Duration::ZERO);
    let mut subscribers = full_subscribers(9);
    subscribers.push(no_contact_subscriber());
    subscribers.push(phone_only_subscriber());

    // 部分订阅者两个渠道都失败
    h.email
        .fail_for(subscribers[..3].iter().map(|s| s.email.clone()));
    h.sms.fail_for(
        subscribers[..2]
            .iter()
            .filter_map(|s| s.phone.clone()),
    );

    let result = h.dispatcher.dispatch(&subscribers, &payload()).await;

    assert_eq!(result.succeeded() + result.failed_count(), subscribers.len());
    assert_eq!(result.failed_count(), 3);

    let mut seen: Vec<_> = result
        .successful
        .iter()
        .chain(result.failed.iter())
        .map(|o| o.subscriber_id)
        .collect();
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), subscribers.len());

    let event = result.to_event(SourceType::Achievement, "ach-2024-017");
    assert_eq!(event.status, EventStatus::Partial);
    assert_eq!(event.failed_recipients.len(), 3);
}
