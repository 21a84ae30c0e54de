//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use tokio::net::TcpListener;
use tracing::{error, info};

/// 全局 Prometheus handle，用于渲染指标
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics 资源守卫
pub struct MetricsHandle {
    server_handle: tokio::task::JoinHandle<()>,
}

impl Drop for MetricsHandle {
    fn drop(&mut self) {
        self.server_handle.abort();
    }
}

/// 初始化 Prometheus 指标导出
///
/// 启动一个独立的 HTTP 服务器在指定端口暴露 `/metrics` 端点。
pub async fn init(service_name: &str, port: u16) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    let _ = PROMETHEUS_HANDLE.set(handle.clone());

    register_common_metrics(service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle { server_handle })
}

/// 注册指标描述，出现在 /metrics 的 HELP 注释中
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!("http_requests_total", "Total number of HTTP requests");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    metrics::describe_counter!(
        "notification_dispatch_total",
        "Total number of notification dispatch runs"
    );
    metrics::describe_histogram!(
        "notification_dispatch_duration_seconds",
        "Notification dispatch run duration in seconds"
    );
    metrics::describe_counter!(
        "notification_channel_sends_total",
        "Total number of channel send attempts"
    );
    metrics::describe_counter!(
        "notification_recipients_total",
        "Total number of recipients processed by outcome"
    );

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "指标服务已启动");

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "指标服务异常退出");
        }
    });

    Ok(server_handle)
}

/// 获取全局 Prometheus handle
pub fn get_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

// ============================================================================
// 指标记录函数
// ============================================================================

/// 记录 HTTP 请求
#[inline]
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str.clone()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str
    )
    .record(duration_secs);
}

/// 记录一次分发运行
///
/// status 取值 sent / partial / empty / failed
#[inline]
pub fn record_dispatch(source_type: &str, status: &str, duration_secs: f64) {
    metrics::counter!(
        "notification_dispatch_total",
        "source_type" => source_type.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "notification_dispatch_duration_seconds",
        "source_type" => source_type.to_string()
    )
    .record(duration_secs);
}

/// 记录单个渠道发送结果
#[inline]
pub fn record_channel_send(channel: &str, status: &str) {
    metrics::counter!(
        "notification_channel_sends_total",
        "channel" => channel.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录收件人处理结果
#[inline]
pub fn record_recipients(succeeded: u64, failed: u64) {
    metrics::counter!("notification_recipients_total", "outcome" => "succeeded").increment(succeeded);
    metrics::counter!("notification_recipients_total", "outcome" => "failed").increment(failed);
}
