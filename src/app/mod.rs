// ==========================================
// 裁切贴合可投产量核算系统 - 应用层
// ==========================================
// 职责: 状态组装 + HTTP 接口
// ==========================================

pub mod http;
pub mod state;

// 重导出
pub use http::build_router;
pub use state::{get_default_db_path, AppState};
