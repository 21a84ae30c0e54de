//! 分发模块
//!
//! - `dispatcher`: 分批并发发送与结果汇总
//! - `recorder`: 审计记录与送达信息写入
//! - `pipeline`: 触发方入口，串联加载、分发与记录

mod dispatcher;
mod pipeline;
mod recorder;

pub use dispatcher::{BatchDispatcher, DispatchConfig, DispatchResult};
pub use pipeline::{DispatchSummary, DispatchTrigger, NO_ELIGIBLE_SUBSCRIBERS, NotificationPipeline};
pub use recorder::NotificationRecorder;
