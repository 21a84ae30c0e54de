//! JWT 认证中间件
//!
//! 验证请求中的 Bearer Token 并将管理员身份注入请求扩展

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::error::AdminError;
use crate::state::AppState;

/// 认证中间件
///
/// 只挂在 `/api/admin` 下的路由上；公开接口不经过这里
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    let Some(token) = token else {
        return AdminError::Unauthorized("缺少认证 Token".to_string()).into_response();
    };

    match state.jwt.verify_token(token) {
        Ok(identity) => {
            debug!(admin_id = %identity.id, "管理员身份验证通过");
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}
