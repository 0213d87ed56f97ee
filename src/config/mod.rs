// ==========================================
// 裁切贴合可投产量核算系统 - 配置层
// ==========================================
// 职责: 运行参数管理，支持环境变量覆写
// 存储: config_kv 表
// ==========================================

pub mod config_manager;

// 重导出核心配置管理器
pub use config_manager::{config_keys, defaults, ConfigManager, ConfigResult, RuntimeSettings};
