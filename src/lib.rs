// ==========================================
// 裁切贴合可投产量核算系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite + axum
// 系统定位: 读侧核算（只读源数据，每次全量重算，不落库）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 只读投影
pub mod repository;

// 引擎层 - 核算流水线
pub mod engine;

// 配置层 - 运行参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// 性能观测
pub mod perf;

// API 层 - 业务接口
pub mod api;

// 实时推送
pub mod live;

// 应用层 - 状态组装与 HTTP
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{ReplacementStatus, WorkableStatus};

// 领域实体
pub use domain::{GroupKey, LayerKey, LedgerEntry, NetReject, WorkableGroup};

// 引擎
pub use engine::{ProductionSource, SourceSnapshot, WorkableEngine, WorkableReport};

// API
pub use api::{ReportFilter, WorkableApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "裁切贴合可投产量核算系统";

// 源数据表结构版本
pub const DB_VERSION: &str = "v0.1";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert_eq!(db::CURRENT_SCHEMA_VERSION, 1);
    }
}
