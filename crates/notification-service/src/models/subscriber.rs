//! 订阅者实体定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::notification::types::ChannelType;

/// 订阅者状态
///
/// 只有 active 与 pending 状态的订阅者会收到通知
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum SubscriberStatus {
    /// 正常订阅
    Active,
    /// 已报名、待审核
    #[default]
    Pending,
    /// 暂停接收
    Inactive,
    /// 本人退订
    Unsubscribed,
    /// 被管理员终止
    Terminated,
}

impl SubscriberStatus {
    /// 是否可接收通知
    pub fn is_notifiable(&self) -> bool {
        matches!(self, Self::Active | Self::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Pending => "pending",
            Self::Inactive => "inactive",
            Self::Unsubscribed => "unsubscribed",
            Self::Terminated => "terminated",
        }
    }

    /// 可接收通知的状态集合
    pub fn notifiable() -> Vec<Self> {
        vec![Self::Active, Self::Pending]
    }
}

impl std::fmt::Display for SubscriberStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 渠道偏好
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelPreferences {
    pub email: bool,
    pub sms: bool,
    pub whatsapp: bool,
}

impl Default for ChannelPreferences {
    fn default() -> Self {
        Self {
            email: true,
            sms: true,
            whatsapp: false,
        }
    }
}

impl ChannelPreferences {
    pub fn allows(&self, channel: ChannelType) -> bool {
        match channel {
            ChannelType::Email => self.email,
            ChannelType::Sms => self.sms,
            ChannelType::WhatsApp => self.whatsapp,
        }
    }
}

/// 订阅者
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    pub id: Uuid,
    /// 报名时填写的邮箱，仅手机号报名时为空串
    pub email: String,
    #[sqlx(default)]
    pub phone: Option<String>,
    #[sqlx(default)]
    pub name: Option<String>,
    pub status: SubscriberStatus,
    /// 最近一次状态变更的原因
    #[sqlx(default)]
    pub status_reason: Option<String>,
    pub subscribed_at: DateTime<Utc>,
    #[sqlx(json)]
    pub preferences: ChannelPreferences,
    #[sqlx(default)]
    pub last_notified_at: Option<DateTime<Utc>>,
    pub notification_count: i64,
}

impl Subscriber {
    /// 邮箱，空串视为缺失
    pub fn email_address(&self) -> Option<&str> {
        let email = self.email.trim();
        (!email.is_empty()).then_some(email)
    }

    /// 手机号，空串视为缺失
    pub fn phone_number(&self) -> Option<&str> {
        self.phone
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    /// 用于错误信息前缀的联系方式：优先邮箱，其次手机号，都没有时用 id
    pub fn contact(&self) -> String {
        self.email_address()
            .or_else(|| self.phone_number())
            .map(String::from)
            .unwrap_or_else(|| self.id.to_string())
    }

    /// 称呼，未填写姓名时使用通用称呼
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or("Subscriber")
    }

    /// 由报名信息构造新订阅者
    pub fn from_new(new: NewSubscriber) -> Self {
        Self {
            id: Uuid::now_v7(),
            email: new.email.unwrap_or_default().trim().to_lowercase(),
            phone: new.phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()),
            name: new.name,
            status: SubscriberStatus::Pending,
            status_reason: None,
            subscribed_at: Utc::now(),
            preferences: new.preferences.unwrap_or_default(),
            last_notified_at: None,
            notification_count: 0,
        }
    }
}

/// 报名请求
#[derive(Debug, Clone, Default)]
pub struct NewSubscriber {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub name: Option<String>,
    pub preferences: Option<ChannelPreferences>,
}

/// 订阅者查询条件
///
/// 默认筛选 active 与 pending 状态；指定 ids 时只在这些订阅者中筛选
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberFilter {
    pub statuses: Vec<SubscriberStatus>,
    pub ids: Option<Vec<Uuid>>,
}

impl Default for SubscriberFilter {
    fn default() -> Self {
        Self {
            statuses: SubscriberStatus::notifiable(),
            ids: None,
        }
    }
}

impl SubscriberFilter {
    pub fn with_ids(mut self, ids: Vec<Uuid>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn matches(&self, subscriber: &Subscriber) -> bool {
        self.statuses.contains(&subscriber.status)
            && self
                .ids
                .as_ref()
                .is_none_or(|ids| ids.contains(&subscriber.id))
    }
}

/// 订阅者列表查询（管理后台）
#[derive(Debug, Clone, Default)]
pub struct SubscriberQuery {
    pub status: Option<SubscriberStatus>,
    pub page: i64,
    pub page_size: i64,
}

impl SubscriberQuery {
    pub fn window(&self) -> PageWindow {
        PageWindow::new(self.page, self.page_size)
    }

    pub fn offset(&self) -> i64 {
        self.window().offset
    }

    pub fn limit(&self) -> i64 {
        self.window().limit
    }
}

/// 归一化后的分页窗口
///
/// 页码来自查询参数，偏移量饱和计算，超大页码得到空页而不是溢出
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: i64,
    pub limit: i64,
    pub offset: i64,
}

impl PageWindow {
    pub const MAX_PAGE_SIZE: i64 = 100;

    pub fn new(page: i64, page_size: i64) -> Self {
        let page = page.max(1);
        let limit = page_size.clamp(1, Self::MAX_PAGE_SIZE);
        Self {
            page,
            limit,
            offset: (page - 1).saturating_mul(limit),
        }
    }

    /// 内存分页时跳过的条数
    pub fn skip(&self) -> usize {
        usize::try_from(self.offset).unwrap_or(usize::MAX)
    }

    pub fn take(&self) -> usize {
        usize::try_from(self.limit).unwrap_or(0)
    }
}

/// 分页结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}
