// ==========================================
// 裁切贴合可投产量核算系统 - 引擎层错误类型
// ==========================================

use thiserror::Error;

use crate::repository::error::RepositoryError;

#[derive(Error, Debug)]
pub enum EngineError {
    /// 源数据读取失败（上游不可用）
    #[error("源数据读取失败: {0}")]
    Repository(#[from] RepositoryError),
}

pub type EngineResult<T> = Result<T, EngineError>;
