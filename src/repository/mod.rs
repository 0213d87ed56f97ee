// ==========================================
// 裁切贴合可投产量核算系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: 提供源数据只读投影，屏蔽数据库细节
// 约束: 所有查询使用参数化
// ==========================================

pub mod error;
pub mod production_repo;

pub use error::{RepositoryError, RepositoryResult};
pub use production_repo::ProductionLedgerRepository;
