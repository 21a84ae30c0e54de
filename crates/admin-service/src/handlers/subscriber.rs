//! 订阅者管理处理器
//!
//! 状态变更与删除都会写入管理员操作审计

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use outreach_notification::NotificationPayload;
use outreach_notification::models::{AdminAction, AdminActionKind, SourceType, Subscriber};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AdminIdentity,
    dto::{
        ApiResponse, ErrorDetail, PageResponse, StatusChangeResponse, SubscriberListParams,
        UpdateStatusRequest,
    },
    error::{AdminError, Result},
    state::AppState,
};

/// 订阅者列表
///
/// GET /api/admin/subscribers
pub async fn list_subscribers(
    State(state): State<AppState>,
    Query(params): Query<SubscriberListParams>,
) -> Result<Json<ApiResponse<PageResponse<Subscriber>>>> {
    let page = state.subscribers.list(&params.into()).await?;
    Ok(Json(ApiResponse::success(page.into())))
}

/// 变更订阅状态
///
/// PATCH /api/admin/subscribers/{id}/status
pub async fn update_subscriber_status(
    State(state): State<AppState>,
    Extension(identity): Extension<AdminIdentity>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<StatusChangeResponse>>> {
    req.validate()?;

    let existing = load(&state, id).await?;
    let reason = req
        .reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());

    state
        .subscribers
        .update_status(id, req.status, reason.clone())
        .await?;

    info!(
        subscriber_id = %id,
        admin_id = %identity.id,
        from = %existing.status,
        to = %req.status,
        "订阅状态已变更"
    );

    let action = AdminAction::new(
        identity.id.clone(),
        identity.name.clone(),
        AdminActionKind::StatusChange,
        id,
        json!({
            "from": existing.status,
            "to": req.status,
            "reason": reason,
        }),
    );
    // 状态已落库，审计写入失败不回滚
    if let Err(e) = state.subscribers.record_admin_action(&action).await {
        warn!(subscriber_id = %id, error = %e, "管理员操作审计写入失败");
    }

    let mut notification = None;
    let mut notification_error = None;
    if req.notify {
        let mut payload = NotificationPayload::new(
            SourceType::SubscriberStatus,
            id.to_string(),
            format!("Your subscription status is now {}", req.status),
        );
        payload.description = reason;
        // 状态已变更，通知失败只在响应中报告
        match state.pipeline.notify_subscriber(id, payload).await {
            Ok(summary) => notification = Some(summary),
            Err(e) => {
                let err = AdminError::from(e);
                warn!(subscriber_id = %id, error = %err, "状态变更通知发送失败");
                notification_error = Some(ErrorDetail::from(&err));
            }
        }
    }

    let subscriber = load(&state, id).await?;
    Ok(Json(ApiResponse::success(StatusChangeResponse {
        subscriber,
        notification,
        notification_error,
    })))
}

/// 删除订阅者
///
/// DELETE /api/admin/subscribers/{id}
pub async fn delete_subscriber(
    State(state): State<AppState>,
    Extension(identity): Extension<AdminIdentity>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>> {
    let existing = load(&state, id).await?;

    // 记录删除前的联系方式快照
    let action = AdminAction::new(
        identity.id.clone(),
        identity.name.clone(),
        AdminActionKind::Delete,
        id,
        json!({
            "email": existing.email,
            "phone": existing.phone,
            "status": existing.status,
        }),
    );
    state.subscribers.delete(id, &action).await?;

    info!(subscriber_id = %id, admin_id = %identity.id, "订阅者已删除");
    Ok(Json(ApiResponse::success_empty()))
}

async fn load(state: &AppState, id: Uuid) -> Result<Subscriber> {
    state
        .subscribers
        .get(id)
        .await?
        .ok_or(AdminError::SubscriberNotFound(id))
}
