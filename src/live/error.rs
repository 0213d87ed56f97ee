// ==========================================
// 裁切贴合可投产量核算系统 - 推送层错误类型
// ==========================================

use thiserror::Error;

use crate::api::error::ApiError;

#[derive(Debug, Error)]
pub enum PublisherError {
    #[error("实时推送已在运行")]
    AlreadyRunning,

    #[error("实时推送未运行")]
    NotRunning,

    #[error("操作超时: 超过 {millis}ms")]
    Timeout { millis: u64 },

    #[error("后台任务等待失败: {0}")]
    TaskJoinFailed(String),

    #[error("核算失败: {0}")]
    Compute(#[from] ApiError),
}

pub type PublisherResult<T> = Result<T, PublisherError>;
