// ==========================================
// 裁切贴合可投产量核算系统 - 配置管理器
// ==========================================
// 职责: 运行参数加载、查询
// 存储: config_kv 表 (key-value + scope)
// 优先级: 环境变量 > config_kv(global) > 内置默认值
// ==========================================

use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::db::{open_sqlite_connection, table_exists};
use crate::domain::types::LAYER_DISPLAY_SLOTS;

pub type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// 配置作用域
pub const GLOBAL_SCOPE: &str = "global";

/// 监听地址环境变量
pub const ENV_BIND_ADDR: &str = "WORKABLE_LEDGER_BIND_ADDR";

// ==========================================
// RuntimeSettings - 运行参数
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeSettings {
    pub live_publish_interval: Duration,
    pub compute_timeout: Duration,
    /// 层位展示上限（固定为 4，仅作展示）
    pub layer_display_cap: usize,
    pub http_bind_addr: String,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            live_publish_interval: Duration::from_secs(defaults::LIVE_PUBLISH_INTERVAL_SECS),
            compute_timeout: Duration::from_millis(defaults::COMPUTE_TIMEOUT_MS),
            layer_display_cap: LAYER_DISPLAY_SLOTS,
            http_bind_addr: defaults::HTTP_BIND_ADDR.to_string(),
        }
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 读取 global scope 的配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在，或 config_kv 表不存在（源库由外部系统维护时）
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        if !table_exists(&conn, "config_kv")? {
            return Ok(None);
        }

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
            params![GLOBAL_SCOPE, key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 获取全部 global 配置（按键排序）
    pub fn get_config_snapshot(&self) -> ConfigResult<BTreeMap<String, String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut map = BTreeMap::new();
        if !table_exists(&conn, "config_kv")? {
            return Ok(map);
        }

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;
        let rows = stmt.query_map(params![GLOBAL_SCOPE], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (key, value) = row?;
            map.insert(key, value);
        }

        Ok(map)
    }

    /// 加载运行参数
    ///
    /// 非法值记录告警并回退默认值，不中断启动。
    pub fn load_runtime_settings(&self) -> ConfigResult<RuntimeSettings> {
        let mut settings = RuntimeSettings::default();

        if let Some(secs) = self.get_positive_u64(config_keys::LIVE_PUBLISH_INTERVAL_SECS)? {
            settings.live_publish_interval = Duration::from_secs(secs);
        }
        if let Some(ms) = self.get_positive_u64(config_keys::COMPUTE_TIMEOUT_MS)? {
            settings.compute_timeout = Duration::from_millis(ms);
        }
        if let Some(raw) = self.get_global_config_value(config_keys::LAYER_DISPLAY_CAP)? {
            if raw.trim() != LAYER_DISPLAY_SLOTS.to_string() {
                tracing::warn!(
                    key = config_keys::LAYER_DISPLAY_CAP,
                    value = %raw,
                    "层位展示上限固定为 {}，忽略配置值",
                    LAYER_DISPLAY_SLOTS
                );
            }
        }
        if let Some(addr) = self.get_global_config_value(config_keys::HTTP_BIND_ADDR)? {
            if !addr.trim().is_empty() {
                settings.http_bind_addr = addr.trim().to_string();
            }
        }

        if let Ok(addr) = std::env::var(ENV_BIND_ADDR) {
            if !addr.trim().is_empty() {
                settings.http_bind_addr = addr.trim().to_string();
            }
        }

        tracing::info!(
            interval_secs = settings.live_publish_interval.as_secs(),
            compute_timeout_ms = settings.compute_timeout.as_millis() as u64,
            bind_addr = %settings.http_bind_addr,
            "运行参数已加载"
        );

        Ok(settings)
    }

    fn get_positive_u64(&self, key: &str) -> ConfigResult<Option<u64>> {
        let Some(raw) = self.get_global_config_value(key)? else {
            return Ok(None);
        };
        match raw.trim().parse::<u64>() {
            Ok(v) if v > 0 => Ok(Some(v)),
            _ => {
                tracing::warn!(key, value = %raw, "配置值非法，使用默认值");
                Ok(None)
            }
        }
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 推送周期
    pub const LIVE_PUBLISH_INTERVAL_SECS: &str = "live_publish_interval_secs";
    // 单次核算时间预算
    pub const COMPUTE_TIMEOUT_MS: &str = "compute_timeout_ms";
    // 层位展示上限
    pub const LAYER_DISPLAY_CAP: &str = "layer_display_cap";
    // HTTP 监听地址
    pub const HTTP_BIND_ADDR: &str = "http_bind_addr";
}

pub mod defaults {
    pub const LIVE_PUBLISH_INTERVAL_SECS: u64 = 30;
    pub const COMPUTE_TIMEOUT_MS: u64 = 10_000;
    pub const HTTP_BIND_ADDR: &str = "127.0.0.1:8787";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::apply_source_schema;

    fn manager_with(rows: &[(&str, &str)]) -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        apply_source_schema(&conn).unwrap();
        for (key, value) in rows {
            conn.execute(
                "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)",
                params![key, value],
            )
            .unwrap();
        }
        ConfigManager::from_connection(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_defaults_without_config_table() {
        let conn = Connection::open_in_memory().unwrap();
        let manager = ConfigManager::from_connection(Arc::new(Mutex::new(conn)));

        let settings = manager.load_runtime_settings().unwrap();
        assert_eq!(settings.live_publish_interval, Duration::from_secs(30));
        assert_eq!(settings.compute_timeout, Duration::from_millis(10_000));
        assert_eq!(settings.layer_display_cap, 4);
        assert!(manager.get_config_snapshot().unwrap().is_empty());
    }

    #[test]
    fn test_values_read_from_config_kv() {
        let manager = manager_with(&[
            (config_keys::LIVE_PUBLISH_INTERVAL_SECS, "5"),
            (config_keys::COMPUTE_TIMEOUT_MS, "750"),
            (config_keys::LAYER_DISPLAY_CAP, "6"),
        ]);

        let settings = manager.load_runtime_settings().unwrap();
        assert_eq!(settings.live_publish_interval, Duration::from_secs(5));
        assert_eq!(settings.compute_timeout, Duration::from_millis(750));
        assert_eq!(settings.layer_display_cap, 4);
        assert_eq!(manager.get_config_snapshot().unwrap().len(), 3);
    }

    #[test]
    fn test_invalid_values_fall_back_to_defaults() {
        let manager = manager_with(&[
            (config_keys::LIVE_PUBLISH_INTERVAL_SECS, "0"),
            (config_keys::COMPUTE_TIMEOUT_MS, "soon"),
        ]);

        let settings = manager.load_runtime_settings().unwrap();
        assert_eq!(settings.live_publish_interval, Duration::from_secs(30));
        assert_eq!(settings.compute_timeout, Duration::from_millis(10_000));
    }
}
