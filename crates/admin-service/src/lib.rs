//! 议员办公室管理后台服务
//!
//! 提供通知触发、订阅者管理、公开报名等 REST API。
//!
//! ## 核心功能
//!
//! - **通知触发**：新增政绩、直播公告触发向全部订阅者的多渠道分发
//! - **通知历史**：查询每次分发的审计记录
//! - **订阅者管理**：列表、状态变更（可选通知本人）、删除，变更均写入审计
//! - **公开接口**：报名订阅、最近通知动态
//!
//! ## 模块结构
//!
//! - `auth`: JWT 校验与管理员身份
//! - `dto`: 请求和响应的数据传输对象
//! - `error`: 错误类型定义
//! - `handlers`: HTTP 请求处理器
//! - `middleware`: 认证、角色检查、安全响应头
//! - `routes`: 路由配置
//! - `state`: 应用状态

pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use auth::{AdminIdentity, AdminRole, JwtManager};
pub use dto::{ApiResponse, PageResponse};
pub use error::{AdminError, Result};
pub use state::AppState;
