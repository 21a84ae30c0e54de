//! 认证模块
//!
//! 提供 JWT Token 验证与管理员身份

mod jwt;

pub use jwt::{AdminIdentity, AdminRole, Claims, JwtManager};
