// ==========================================
// 裁切贴合可投产量核算系统 - HTTP 接口
// ==========================================
// 路由:
// - GET /health
// - GET /api/workable/live     拉取（可选 week / customer 过滤）
// - GET /api/workable/stream   SSE 推送
// - GET /api/workable/status   推送通道状态
// ==========================================

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures::stream::{self, Stream};
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::api::{ApiError, ReportFilter};
use crate::app::state::AppState;
use crate::engine::WorkableReport;
use crate::live::{PublisherStatus, SharedReport};

/// SSE 事件名
pub const REPORT_EVENT: &str = "workable";

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/workable/live", get(live_report))
        .route("/api/workable/stream", get(report_stream))
        .route("/api/workable/status", get(publisher_status))
        .with_state(state)
}

// ==========================================
// 错误响应
// ==========================================
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            ApiError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "COMPUTE_TIMEOUT"),
            ApiError::DatabaseConnectionError(_) | ApiError::SourceDataUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SOURCE_UNAVAILABLE")
            }
            ApiError::DatabaseError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            ApiError::InternalError(_) | ApiError::Other(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };
        (status, Json(json!({ "code": code, "message": self.to_string() }))).into_response()
    }
}

// ==========================================
// 处理函数
// ==========================================

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": crate::VERSION }))
}

#[derive(Debug, Default, Deserialize)]
pub struct LiveQuery {
    pub week: Option<i32>,
    pub customer: Option<String>,
}

async fn live_report(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LiveQuery>,
) -> Result<Json<WorkableReport>, ApiError> {
    let filter = ReportFilter {
        week: query.week,
        customer: query.customer,
    };
    let api = Arc::clone(&state.workable_api);
    let now = (state.clock)();
    let budget = state.settings.compute_timeout;

    let outcome = tokio::time::timeout(
        budget,
        tokio::task::spawn_blocking(move || api.get_live_report(&filter, now)),
    )
    .await;

    match outcome {
        Err(_) => {
            tracing::warn!(budget_ms = budget.as_millis() as u64, "拉取核算超时");
            Err(ApiError::Timeout(format!(
                "核算超过 {}ms 未完成",
                budget.as_millis()
            )))
        }
        Ok(Err(join_err)) => Err(ApiError::InternalError(join_err.to_string())),
        Ok(Ok(result)) => result.map(Json),
    }
}

async fn report_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscriber_id = Uuid::new_v4();
    let receiver = state.publisher.subscribe();
    let initial = state.publisher.latest();
    tracing::info!(%subscriber_id, has_snapshot = initial.is_some(), "推送订阅者已连接");

    let events = stream::unfold((initial, receiver), move |(pending, mut receiver)| async move {
        if let Some(report) = pending {
            return Some((report_event(&report), (None, receiver)));
        }
        loop {
            match receiver.recv().await {
                Ok(report) => return Some((report_event(&report), (None, receiver))),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(%subscriber_id, skipped, "订阅者处理过慢，跳过旧报告");
                }
                Err(RecvError::Closed) => {
                    tracing::info!(%subscriber_id, "推送通道已关闭");
                    return None;
                }
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

fn report_event(report: &SharedReport) -> Result<Event, Infallible> {
    let event = Event::default()
        .event(REPORT_EVENT)
        .json_data(report.as_ref())
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "报告序列化失败");
            Event::default().event("error").data(e.to_string())
        });
    Ok(event)
}

async fn publisher_status(State(state): State<Arc<AppState>>) -> Json<PublisherStatus> {
    Json(state.publisher.status())
}
