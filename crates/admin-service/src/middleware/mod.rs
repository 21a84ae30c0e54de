//! 中间件模块
//!
//! 提供认证、角色检查和安全响应头中间件

mod auth;
mod permission;
mod security;

pub use auth::auth_middleware;
pub use permission::{ADMIN_ONLY, PUBLISHERS, require_roles};
pub use security::security_headers;
