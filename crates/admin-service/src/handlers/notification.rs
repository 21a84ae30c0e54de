//! 通知触发与历史查询处理器
//!
//! 触发接口同步执行整个分发流程，返回本次分发的汇总

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use outreach_notification::models::{NotificationEvent, SourceType};
use outreach_notification::{DispatchSummary, DispatchTrigger};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AdminIdentity,
    dto::{ApiResponse, PageResponse, PaginationParams, TriggerNotificationRequest},
    error::{AdminError, Result},
    state::AppState,
};

/// 新增政绩通知
///
/// POST /api/admin/notifications/achievements
pub async fn trigger_achievement(
    State(state): State<AppState>,
    Extension(identity): Extension<AdminIdentity>,
    Json(req): Json<TriggerNotificationRequest>,
) -> Result<Json<ApiResponse<DispatchSummary>>> {
    trigger(state, identity, req, SourceType::Achievement).await
}

/// 直播 / 广播公告通知
///
/// POST /api/admin/notifications/broadcasts
pub async fn trigger_broadcast(
    State(state): State<AppState>,
    Extension(identity): Extension<AdminIdentity>,
    Json(req): Json<TriggerNotificationRequest>,
) -> Result<Json<ApiResponse<DispatchSummary>>> {
    trigger(state, identity, req, SourceType::Broadcast).await
}

async fn trigger(
    state: AppState,
    identity: AdminIdentity,
    req: TriggerNotificationRequest,
    source_type: SourceType,
) -> Result<Json<ApiResponse<DispatchSummary>>> {
    req.validate()?;
    let payload = req.into_payload(source_type);

    info!(
        admin_id = %identity.id,
        source_type = %source_type,
        source_id = %payload.source_id,
        "管理员触发通知分发"
    );

    let summary = state.pipeline.run(DispatchTrigger::new(payload)).await?;
    let message = summary.message.clone();

    Ok(Json(ApiResponse::success_with_message(summary, message)))
}

/// 通知记录列表
///
/// GET /api/admin/notifications/events
pub async fn list_events(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<ApiResponse<PageResponse<NotificationEvent>>>> {
    let page = state
        .events
        .list_events(pagination.page, pagination.page_size)
        .await?;

    Ok(Json(ApiResponse::success(page.into())))
}

/// 通知记录详情
///
/// GET /api/admin/notifications/events/{id}
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<NotificationEvent>>> {
    let event = state
        .events
        .get_event(id)
        .await?
        .ok_or(AdminError::EventNotFound(id))?;

    Ok(Json(ApiResponse::success(event)))
}
