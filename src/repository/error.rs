// ==========================================
// 裁切贴合可投产量核算系统 - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 仓储层只读，不存在写冲突类错误
// ==========================================

use thiserror::Error;

/// 仓储层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== 数据库错误 =====
    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    #[error("源数据表缺失: {table}")]
    MissingSourceTable { table: String },

    // ===== 数据质量错误 =====
    #[error("字段值错误 (field={field}): {message}")]
    FieldValueError { field: String, message: String },

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        let message = err.to_string();
        if message.contains("no such table") {
            let table = message
                .rsplit(':')
                .next()
                .map(|s| s.trim().to_string())
                .unwrap_or_default();
            return RepositoryError::MissingSourceTable { table };
        }

        match err {
            rusqlite::Error::SqliteFailure(code, _)
                if matches!(
                    code.code,
                    rusqlite::ErrorCode::CannotOpen | rusqlite::ErrorCode::NotADatabase
                ) =>
            {
                RepositoryError::DatabaseConnectionError(message)
            }
            rusqlite::Error::FromSqlConversionFailure(idx, _, source) => {
                RepositoryError::FieldValueError {
                    field: format!("column#{}", idx),
                    message: source.to_string(),
                }
            }
            _ => RepositoryError::DatabaseQueryError(message),
        }
    }
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_missing_table_maps_to_missing_source_table() {
        let conn = Connection::open_in_memory().unwrap();
        let err = conn
            .query_row("SELECT COUNT(*) FROM cutting_entry", [], |row| row.get::<_, i64>(0))
            .unwrap_err();

        match RepositoryError::from(err) {
            RepositoryError::MissingSourceTable { table } => assert_eq!(table, "cutting_entry"),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
