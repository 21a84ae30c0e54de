//! HTTP 请求处理器

pub mod health;
pub mod notification;
pub mod public;
pub mod subscriber;
