//! 议员办公室管理后台服务
//!
//! 提供通知触发、订阅者管理与公开报名 REST API。

use std::sync::Arc;

use anyhow::bail;
use axum::http::HeaderValue;
use outreach_admin_service::{auth::JwtManager, routes, state::AppState};
use outreach_notification::store::{
    InMemoryNotificationEventStore, InMemorySubscriberStore, NotificationEventStore,
    PgNotificationEventStore, PgSubscriberStore, SubscriberStore,
};
use outreach_notification::{
    BatchDispatcher, DispatchConfig, NotificationPipeline, NotificationRecorder,
    NotificationService,
};
use outreach_shared::{
    config::{AppConfig, DEFAULT_JWT_SECRET, StorageBackend},
    database::Database,
    observability,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

const SERVICE_NAME: &str = "outreach-admin-service";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 统一加载配置：default → {env} → {service} → OUTREACH_ 环境变量
    let config = AppConfig::load(SERVICE_NAME)?;
    let _guard = observability::init(&config.service_name, &config.observability).await?;

    info!(
        environment = %config.environment,
        "Starting {} on {}",
        SERVICE_NAME,
        config.server_addr()
    );

    // 生产环境必须通过 OUTREACH_JWT__SECRET 注入密钥
    if config.jwt.secret == DEFAULT_JWT_SECRET {
        if config.is_production() {
            bail!("生产环境必须设置 OUTREACH_JWT__SECRET");
        }
        warn!("Using default JWT secret - set OUTREACH_JWT__SECRET for production");
    }

    let (subscribers, events, database) = build_stores(&config).await?;

    let service = Arc::new(NotificationService::from_config(&config.notification)?);
    info!(
        channels = ?service.registered_channel_types(),
        batch_size = config.notification.batch_size,
        batch_delay_ms = config.notification.batch_delay_ms,
        "通知服务初始化完成"
    );

    let dispatcher = BatchDispatcher::new(service, DispatchConfig::from(&config.notification));
    let recorder = NotificationRecorder::new(events.clone(), subscribers.clone());
    let pipeline = Arc::new(NotificationPipeline::new(
        subscribers.clone(),
        dispatcher,
        recorder,
    ));

    let mut state = AppState::new(pipeline, subscribers, events, JwtManager::new(&config.jwt));
    if let Some(db) = database.clone() {
        state = state.with_database(db);
    }

    let app = routes::app(state).layer(cors_layer(config.is_production()));

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    // 优雅关闭：停止接收新连接并等待进行中的分发完成
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(db) = database {
        db.close().await;
    }
    info!("Server shutdown complete");

    Ok(())
}

type Stores = (
    Arc<dyn SubscriberStore>,
    Arc<dyn NotificationEventStore>,
    Option<Database>,
);

/// 按 `storage.backend` 构造存储
async fn build_stores(config: &AppConfig) -> anyhow::Result<Stores> {
    match config.storage.backend {
        StorageBackend::Postgres => {
            let db = Database::connect(&config.database).await?;
            db.run_migrations().await?;

            let subscribers: Arc<dyn SubscriberStore> =
                Arc::new(PgSubscriberStore::new(db.pool().clone()));
            let events: Arc<dyn NotificationEventStore> =
                Arc::new(PgNotificationEventStore::new(db.pool().clone()));
            Ok((subscribers, events, Some(db)))
        }
        StorageBackend::Memory => {
            if config.is_production() {
                bail!("生产环境不允许使用内存存储");
            }
            warn!("使用内存存储，进程退出后数据丢失");
            let subscribers: Arc<dyn SubscriberStore> = Arc::new(InMemorySubscriberStore::new());
            let events: Arc<dyn NotificationEventStore> =
                Arc::new(InMemoryNotificationEventStore::new());
            Ok((subscribers, events, None))
        }
    }
}

/// CORS 配置：通过 OUTREACH_CORS_ORIGINS 环境变量控制允许的来源
fn cors_layer(production: bool) -> CorsLayer {
    let allowed_origins = std::env::var("OUTREACH_CORS_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".to_string());

    if allowed_origins == "*" {
        if production {
            warn!("OUTREACH_CORS_ORIGINS=\"*\" 在生产环境中不安全，请设置为具体域名");
        }
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    info!("CORS allowed_origins: {}", allowed_origins);
    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// 监听关闭信号
///
/// 收到 SIGTERM 或 Ctrl+C 后返回，触发 axum 的优雅关闭流程
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "注册 Ctrl+C 处理器失败");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "注册 SIGTERM 处理器失败");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}
