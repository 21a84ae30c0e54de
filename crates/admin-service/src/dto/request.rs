//! 请求 DTO 定义
//!
//! 所有 REST API 的请求参数和请求体结构

use outreach_notification::NotificationPayload;
use outreach_notification::models::{
    ChannelPreferences, NewSubscriber, SourceType, SubscriberQuery, SubscriberStatus,
};
use serde::Deserialize;
use validator::Validate;

/// 通知触发请求（新增政绩 / 直播公告共用）
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TriggerNotificationRequest {
    #[validate(length(min = 1, max = 100, message = "sourceId 长度必须在1-100个字符之间"))]
    pub source_id: String,
    #[validate(length(min = 1, max = 200, message = "标题长度必须在1-200个字符之间"))]
    pub title: String,
    #[validate(length(max = 5000, message = "描述不能超过5000个字符"))]
    pub description: Option<String>,
    #[validate(length(max = 50, message = "分类不能超过50个字符"))]
    pub category: Option<String>,
    #[validate(url(message = "链接格式无效"))]
    pub url: Option<String>,
}

impl TriggerNotificationRequest {
    pub fn into_payload(self, source_type: SourceType) -> NotificationPayload {
        NotificationPayload {
            source_type,
            source_id: self.source_id,
            title: self.title,
            description: self.description,
            category: self.category,
            url: self.url,
        }
    }
}

/// 分页参数
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    20
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

/// 订阅者列表查询
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberListParams {
    pub status: Option<SubscriberStatus>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

impl From<SubscriberListParams> for SubscriberQuery {
    fn from(params: SubscriberListParams) -> Self {
        Self {
            status: params.status,
            page: params.page,
            page_size: params.page_size,
        }
    }
}

/// 订阅状态变更请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: SubscriberStatus,
    #[validate(length(max = 500, message = "原因不能超过500个字符"))]
    pub reason: Option<String>,
    /// 是否向该订阅者发送状态变更通知
    #[serde(default)]
    pub notify: bool,
}

/// 公开报名请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    /// 格式在去除首尾空白后校验，空串视为未填写
    pub email: Option<String>,
    pub phone: Option<String>,
    #[validate(length(max = 100, message = "姓名不能超过100个字符"))]
    pub name: Option<String>,
    pub preferences: Option<ChannelPreferences>,
}

impl SubscribeRequest {
    /// 空串视为未填写
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref().map(str::trim).filter(|e| !e.is_empty())
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref().map(str::trim).filter(|p| !p.is_empty())
    }

    /// 转为存储层的报名信息，手机号需已规范化
    pub fn into_new_subscriber(self, normalized_phone: Option<String>) -> NewSubscriber {
        let email = self.email().map(String::from);
        NewSubscriber {
            email,
            phone: normalized_phone,
            name: self
                .name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            preferences: self.preferences,
        }
    }
}

/// 通知动态查询
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedParams {
    pub limit: Option<i64>,
}

impl FeedParams {
    pub const DEFAULT_LIMIT: i64 = 20;
    pub const MAX_LIMIT: i64 = 50;

    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_request_validation() {
        let req: TriggerNotificationRequest = serde_json::from_value(serde_json::json!({
            "sourceId": "ach-1",
            "title": "",
            "url": "not a url"
        }))
        .unwrap();

        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("url"));
    }

    #[test]
    fn test_subscribe_blank_fields_treated_as_absent() {
        let req: SubscribeRequest = serde_json::from_value(serde_json::json!({
            "email": "  ",
            "phone": "+2348012345678",
            "name": " "
        }))
        .unwrap();

        assert_eq!(req.email(), None);
        let new = req.into_new_subscriber(Some("+2348012345678".to_string()));
        assert_eq!(new.email, None);
        assert_eq!(new.name, None);
    }

    #[test]
    fn test_feed_limit_clamped() {
        assert_eq!(FeedParams::default().limit(), 20);
        assert_eq!(FeedParams { limit: Some(500) }.limit(), 50);
        assert_eq!(FeedParams { limit: Some(0) }.limit(), 1);
    }
}
