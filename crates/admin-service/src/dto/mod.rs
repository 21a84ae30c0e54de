//! 数据传输对象

mod request;
mod response;

pub use request::{
    FeedParams, PaginationParams, SubscribeRequest, SubscriberListParams,
    TriggerNotificationRequest, UpdateStatusRequest,
};
pub use response::{ApiResponse, ErrorDetail, PageResponse, StatusChangeResponse};
