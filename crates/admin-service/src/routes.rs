//! 路由配置模块
//!
//! 定义所有 REST API 端点的路由映射

use axum::{
    Router, middleware,
    routing::{get, patch, post},
};
use outreach_shared::observability::middleware as obs_middleware;

use crate::{
    handlers,
    middleware::{ADMIN_ONLY, PUBLISHERS, auth_middleware, require_roles, security_headers},
    state::AppState,
};

/// 通知触发与历史查询路由
fn notification_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/notifications/achievements",
            post(handlers::notification::trigger_achievement),
        )
        .route(
            "/notifications/broadcasts",
            post(handlers::notification::trigger_broadcast),
        )
        .route(
            "/notifications/events",
            get(handlers::notification::list_events),
        )
        .route(
            "/notifications/events/{id}",
            get(handlers::notification::get_event),
        )
        .route_layer(middleware::from_fn_with_state(PUBLISHERS, require_roles))
}

/// 订阅者管理路由
///
/// 列表对发布者开放，变更与删除仅限管理员
fn subscriber_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/subscribers",
            get(handlers::subscriber::list_subscribers)
                .layer(middleware::from_fn_with_state(PUBLISHERS, require_roles)),
        )
        .route(
            "/subscribers/{id}/status",
            patch(handlers::subscriber::update_subscriber_status)
                .layer(middleware::from_fn_with_state(ADMIN_ONLY, require_roles)),
        )
        .route(
            "/subscribers/{id}",
            axum::routing::delete(handlers::subscriber::delete_subscriber)
                .layer(middleware::from_fn_with_state(ADMIN_ONLY, require_roles)),
        )
}

/// 需要认证的管理后台路由，挂载在 `/api/admin`
pub fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(notification_routes())
        .merge(subscriber_routes())
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// 公开路由，挂载在 `/api/public`
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/subscribe", post(handlers::public::subscribe))
        .route("/notifications", get(handlers::public::list_feed))
}

/// 组装完整应用
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api/admin", admin_routes(state.clone()))
        .nest("/api/public", public_routes())
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .layer(middleware::from_fn(security_headers))
        // 可观测性中间件：请求追踪和指标收集
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(state)
}
