// ==========================================
// 裁切贴合可投产量核算系统 - 应用状态
// ==========================================
// 职责: 组装仓储、引擎、API 与实时推送，作为 HTTP 层共享状态
// ==========================================

use std::sync::Arc;

use crate::api::WorkableApi;
use crate::config::{ConfigManager, RuntimeSettings};
use crate::db::{open_sqlite_connection, warn_on_schema_mismatch};
use crate::engine::{ProductionSource, WorkableEngine};
use crate::live::{local_clock, Clock, LivePublisher, LivePublisherConfig};
use crate::repository::ProductionLedgerRepository;

/// 数据库路径环境变量
pub const ENV_DB_PATH: &str = "WORKABLE_LEDGER_DB_PATH";

/// 应用状态
pub struct AppState {
    /// 数据库路径（内存数据源时为空）
    pub db_path: String,

    /// 运行参数
    pub settings: RuntimeSettings,

    /// 可投产量 API
    pub workable_api: Arc<WorkableApi>,

    /// 实时推送
    pub publisher: Arc<LivePublisher>,

    /// 核算时刻来源
    pub clock: Clock,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 说明
    /// 1. 读取运行参数（config_kv + 环境变量）
    /// 2. 初始化只读仓储
    /// 3. 组装引擎、API、实时推送
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        {
            let conn = open_sqlite_connection(&db_path)
                .map_err(|e| format!("无法打开数据库: {}", e))?;
            warn_on_schema_mismatch(&conn);
        }

        let settings = ConfigManager::new(&db_path)
            .and_then(|m| m.load_runtime_settings())
            .map_err(|e| format!("无法加载运行参数: {}", e))?;

        let repository = Arc::new(
            ProductionLedgerRepository::new(&db_path)
                .map_err(|e| format!("无法创建ProductionLedgerRepository: {}", e))?,
        );

        let mut state = Self::with_source(repository, settings, local_clock());
        state.db_path = db_path;

        tracing::info!("AppState初始化完成");
        Ok(state)
    }

    /// 以任意数据源组装（内存快照/测试）
    pub fn with_source(
        source: Arc<dyn ProductionSource>,
        settings: RuntimeSettings,
        clock: Clock,
    ) -> Self {
        let engine = Arc::new(WorkableEngine::new());
        let workable_api = Arc::new(WorkableApi::new(source, engine));
        let publisher = Arc::new(LivePublisher::new(
            Arc::clone(&workable_api),
            LivePublisherConfig::from_settings(&settings),
            Arc::clone(&clock),
        ));

        Self {
            db_path: String::new(),
            settings,
            workable_api,
            publisher,
            clock,
        }
    }
}

/// 获取默认数据库路径
///
/// 优先级: 环境变量 WORKABLE_LEDGER_DB_PATH > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var(ENV_DB_PATH) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./workable_ledger.db");

    if let Some(data_dir) = dirs::data_dir() {
        // 开发环境使用独立目录，避免污染生产数据
        let dir = if cfg!(debug_assertions) {
            data_dir.join("workable-ledger-dev")
        } else {
            data_dir.join("workable-ledger")
        };

        match std::fs::create_dir_all(&dir) {
            Ok(()) => path = dir.join("workable_ledger.db"),
            Err(e) => tracing::warn!(dir = %dir.display(), error = %e, "数据目录创建失败，使用当前目录"),
        }
    }

    path.to_string_lossy().to_string()
}
