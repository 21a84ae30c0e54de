//! 健康检查处理器

use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::state::AppState;

const SERVICE_NAME: &str = "outreach-admin-service";

/// 存活探针：服务进程正常即返回 ok
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME
    }))
}

/// 就绪探针：检查数据库连接是否可用
///
/// 内存存储模式下没有外部依赖，直接就绪
pub async fn readiness_check(State(state): State<AppState>) -> Json<Value> {
    let database = match &state.database {
        Some(db) => match db.health_check().await {
            Ok(()) => "ok",
            Err(e) => {
                tracing::warn!(code = e.code(), error = %e, "数据库就绪检查失败");
                "fail"
            }
        },
        None => "skipped",
    };
    let all_ok = database != "fail";

    Json(json!({
        "status": if all_ok { "ok" } else { "degraded" },
        "service": SERVICE_NAME,
        "checks": {
            "database": database
        }
    }))
}
