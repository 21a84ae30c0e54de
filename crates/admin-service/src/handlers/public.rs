//! 公开接口处理器（无需认证）

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use outreach_notification::models::{FeedItem, Subscriber};
use outreach_notification::notification::normalize_phone;
use tracing::info;
use validator::{Validate, ValidateEmail};

use crate::{
    dto::{ApiResponse, FeedParams, SubscribeRequest},
    error::{AdminError, Result},
    state::AppState,
};

/// 公开报名
///
/// POST /api/public/subscribe
///
/// 邮箱与手机号至少填写一项，新订阅者为 pending 状态
pub async fn subscribe(
    State(state): State<AppState>,
    Json(req): Json<SubscribeRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Subscriber>>)> {
    req.validate()?;

    if req.email().is_none() && req.phone().is_none() {
        return Err(AdminError::Validation(
            "邮箱与手机号至少填写一项".to_string(),
        ));
    }

    if let Some(email) = req.email() {
        if !email.validate_email() {
            return Err(AdminError::Validation(format!("邮箱格式无效: {}", email)));
        }
    }

    let phone = match req.phone() {
        Some(raw) => Some(normalize_phone(raw).ok_or_else(|| {
            AdminError::Validation("手机号需为带国家码的国际格式，如 +2348012345678".to_string())
        })?),
        None => None,
    };

    let subscriber = state
        .subscribers
        .create(req.into_new_subscriber(phone))
        .await?;

    info!(subscriber_id = %subscriber.id, "新订阅者报名");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(subscriber, "报名成功，等待审核")),
    ))
}

/// 最近的通知动态
///
/// GET /api/public/notifications
pub async fn list_feed(
    State(state): State<AppState>,
    Query(params): Query<FeedParams>,
) -> Result<Json<ApiResponse<Vec<FeedItem>>>> {
    let items = state.events.list_feed(params.limit()).await?;
    Ok(Json(ApiResponse::success(items)))
}
