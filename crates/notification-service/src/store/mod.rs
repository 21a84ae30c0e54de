//! 存储层
//!
//! ## 设计原则
//!
//! - 存储只负责数据持久化，不包含业务逻辑
//! - PostgreSQL 实现使用 SQLx，内存实现使用 DashMap（测试与本地开发）
//! - 定义 trait 接口以支持 mock 测试

mod memory;
mod postgres;
mod traits;

pub use memory::{InMemoryNotificationEventStore, InMemorySubscriberStore};
pub use postgres::{PgNotificationEventStore, PgSubscriberStore};
pub use traits::*;
