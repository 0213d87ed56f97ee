// ==========================================
// 裁切贴合可投产量核算系统 - 计划需求加载
// ==========================================
// 输入: 订单明细投影
// 输出: GroupKey → 计划数量（同键求和）
// ==========================================

use std::collections::BTreeMap;

use crate::domain::{GroupKey, PlannedDemand};

/// 计划需求映射，按 GroupKey 有序
pub type DemandMap = BTreeMap<GroupKey, i64>;

pub struct DemandLoader {
    // 无状态引擎
}

impl DemandLoader {
    pub fn new() -> Self {
        Self {}
    }

    /// 按 (customer, sku, week) 汇总计划数量
    pub fn load(&self, demands: &[PlannedDemand]) -> DemandMap {
        let mut map = DemandMap::new();
        for demand in demands {
            *map.entry(demand.key()).or_insert(0) += demand.planned_qty;
        }
        map
    }
}

impl Default for DemandLoader {
    fn default() -> Self {
        Self::new()
    }
}
