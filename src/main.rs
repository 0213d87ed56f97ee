// ==========================================
// 裁切贴合可投产量核算系统 - 服务主入口
// ==========================================
// 启动顺序: 日志 → AppState → 实时推送 → HTTP 服务
// 退出: Ctrl-C 后先停 HTTP，再停实时推送
// ==========================================

use anyhow::Context;
use std::sync::Arc;

use workable_ledger::app::{build_router, get_default_db_path, AppState};
use workable_ledger::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", workable_ledger::APP_NAME);
    tracing::info!("系统版本: {}", workable_ledger::VERSION);
    tracing::info!("==================================================");

    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);

    let state = Arc::new(AppState::new(db_path).map_err(anyhow::Error::msg)?);

    state
        .publisher
        .start()
        .await
        .context("实时推送启动失败")?;

    let bind_addr = state.settings.http_bind_addr.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("无法监听 {}", bind_addr))?;
    tracing::info!(addr = %bind_addr, "HTTP 服务已启动");

    axum::serve(listener, build_router(Arc::clone(&state)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP 服务异常退出")?;

    if let Err(e) = state.publisher.stop().await {
        tracing::warn!(error = %e, "实时推送停止异常");
    }

    tracing::info!("服务已退出");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "无法监听退出信号");
        return;
    }
    tracing::info!("收到退出信号");
}
