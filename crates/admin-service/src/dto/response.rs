//! 响应 DTO 定义

use outreach_notification::DispatchSummary;
use outreach_notification::models::{Page, Subscriber};
use serde::Serialize;

use crate::error::AdminError;

/// 分页响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

impl<T> PageResponse<T> {
    pub fn new(items: Vec<T>, total: i64, page: i64, page_size: i64) -> Self {
        let total_pages = if page_size > 0 {
            (total + page_size - 1) / page_size
        } else {
            0
        };

        Self {
            items,
            total,
            page,
            page_size,
            total_pages,
        }
    }
}

impl<T> From<Page<T>> for PageResponse<T> {
    fn from(page: Page<T>) -> Self {
        Self::new(page.items, page.total, page.page, page.page_size)
    }
}

/// API 统一响应
///
/// 失败响应由 `AdminError` 生成，`data` 为 null
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub code: String,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self::success_with_message(data, "操作成功")
    }

    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn success_empty() -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: "操作成功".to_string(),
            data: None,
        }
    }
}

/// 订阅状态变更结果
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeResponse {
    pub subscriber: Subscriber,
    /// 请求 `notify = true` 时附带的通知汇总
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<DispatchSummary>,
    /// 通知发送失败时的原因，状态变更本身已生效
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_error: Option<ErrorDetail>,
}

/// 错误码与提示
#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

impl From<&AdminError> for ErrorDetail {
    fn from(err: &AdminError) -> Self {
        Self {
            code: err.error_code(),
            message: err.client_message(),
        }
    }
}
