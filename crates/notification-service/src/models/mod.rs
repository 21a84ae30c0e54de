//! 领域模型定义

mod event;
mod subscriber;

pub use event::{
    AdminAction, AdminActionKind, ChannelCounts, EventStatus, FailedRecipient, FeedItem,
    NotificationEvent, SourceType,
};
pub use subscriber::{
    ChannelPreferences, NewSubscriber, Page, PageWindow, Subscriber, SubscriberFilter,
    SubscriberQuery, SubscriberStatus,
};
