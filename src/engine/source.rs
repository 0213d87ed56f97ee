// ==========================================
// 裁切贴合可投产量核算系统 - 引擎层数据源
// ==========================================
// 职责: 定义核算所需源数据快照与读取 trait
// 说明: Engine 层定义 trait，Repository 层实现（依赖倒置）
// ==========================================

use serde::{Deserialize, Serialize};

use crate::domain::{
    BondingConsumption, CuttingEntry, LayerDefinition, PlannedDemand, RejectRecord,
    ReplacementRecord,
};
use crate::repository::error::RepositoryResult;

/// 源数据快照
///
/// 一次核算读取的全部只读投影。引擎只消费快照，不直接访问数据库。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceSnapshot {
    pub planned_demand: Vec<PlannedDemand>,
    pub cutting_entries: Vec<CuttingEntry>,
    pub layer_definitions: Vec<LayerDefinition>,
    pub bonding_consumption: Vec<BondingConsumption>,
    pub rejects: Vec<RejectRecord>,
    pub replacements: Vec<ReplacementRecord>,
}

/// 生产源数据读取 trait
///
/// # 实现说明
/// - `ProductionLedgerRepository` 从 SQLite 读取
/// - `SourceSnapshot` 自身也实现此 trait（测试/回放）
pub trait ProductionSource: Send + Sync {
    /// 读取一份一致的源数据快照
    fn load_snapshot(&self) -> RepositoryResult<SourceSnapshot>;
}

impl ProductionSource for SourceSnapshot {
    fn load_snapshot(&self) -> RepositoryResult<SourceSnapshot> {
        Ok(self.clone())
    }
}
