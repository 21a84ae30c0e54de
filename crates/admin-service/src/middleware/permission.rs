//! 角色检查中间件
//!
//! 依赖 `auth_middleware` 先注入 `AdminIdentity`

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::auth::{AdminIdentity, AdminRole};
use crate::error::AdminError;

/// 可发布通知的角色
pub const PUBLISHERS: &[AdminRole] = &[AdminRole::Admin, AdminRole::Editor];

/// 订阅者状态变更与删除仅限管理员
pub const ADMIN_ONLY: &[AdminRole] = &[AdminRole::Admin];

/// 角色检查中间件
///
/// 允许的角色集合通过中间件状态传入
///
/// # 示例
/// ```ignore
/// .route("/subscribers/{id}", delete(delete_subscriber).layer(from_fn_with_state(ADMIN_ONLY, require_roles)))
/// ```
pub async fn require_roles(
    State(allowed): State<&'static [AdminRole]>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(identity) = request.extensions().get::<AdminIdentity>() else {
        return AdminError::Unauthorized("未认证".to_string()).into_response();
    };

    if identity.has_role(allowed) {
        return next.run(request).await;
    }

    warn!(
        admin_id = %identity.id,
        role = ?identity.role,
        path = %request.uri().path(),
        "角色无权执行该操作"
    );

    let required: Vec<&str> = allowed.iter().map(AdminRole::as_str).collect();
    AdminError::Forbidden(format!("需要角色: {}", required.join(" / "))).into_response()
}
