//! 订阅者通知分发
//!
//! 将政绩发布、直播公告、订阅状态变更等事件通过 Email、SMS、WhatsApp
//! 分批推送给订阅者，并为每次分发写入不可变的审计记录。
//!
//! ## 模块结构
//!
//! - `models`: 订阅者、通知记录、审计记录
//! - `store`: 订阅者与通知记录存储（PostgreSQL / 内存）
//! - `notification`: 渠道适配、模板与单订阅者多渠道发送
//! - `dispatch`: 分批分发、记录写入与流水线编排

pub mod dispatch;
pub mod error;
pub mod models;
pub mod notification;
pub mod store;

pub use dispatch::{
    BatchDispatcher, DispatchConfig, DispatchResult, DispatchSummary, DispatchTrigger,
    NotificationPipeline, NotificationRecorder,
};
pub use error::{NotificationError, Result};
pub use notification::{NotificationPayload, NotificationService};
