// ==========================================
// 裁切贴合可投产量核算系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口，供 HTTP 路由与推送通道调用
// ==========================================

pub mod error;
pub mod workable_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use workable_api::{ReportFilter, WorkableApi};
