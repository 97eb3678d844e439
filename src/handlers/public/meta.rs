// handlers/public/meta.rs - service info, health and schema dump

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::DatabaseManager;
use crate::middleware::{ApiResponse, ApiResult};

pub async fn root() -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "message": "Citizen registry API",
    })))
}

/// 503 with `status: degraded` when the pool cannot answer
pub async fn health(State(state): State<AppState>) -> Response {
    let now = chrono::Utc::now();

    let Some(pool) = &state.database else {
        return ApiResponse::success(json!({
            "status": "ok",
            "timestamp": now,
            "database": "memory",
        }))
        .into_response();
    };

    match DatabaseManager::health_check(pool).await {
        Ok(()) => ApiResponse::success(json!({
            "status": "ok",
            "timestamp": now,
            "database": "ok",
        }))
        .into_response(),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": { "status": "degraded", "timestamp": now },
                })),
            )
                .into_response()
        }
    }
}

/// GET /schema - every table with its columns, as XML
pub async fn schema_xml(State(state): State<AppState>) -> Response {
    match state.describe.schema_xml().await {
        Ok(xml) => xml_response(StatusCode::OK, xml),
        Err(err) => {
            tracing::error!("Schema export failed: {}", err);
            xml_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_xml())
        }
    }
}

fn xml_response(status: StatusCode, body: String) -> Response {
    (status, [(header::CONTENT_TYPE, "application/xml")], body).into_response()
}
