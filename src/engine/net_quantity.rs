// ==========================================
// 裁切贴合可投产量核算系统 - 净量计算
// ==========================================
// 职责:
// 1) 不良按 (sku, layer) 预聚合，补料冲抵
// 2) 层净量 = 裁切量 - 不良净额（有符号）
// 约束: 同一 (sku, layer) 只扣一次，不随台账重复行重复扣减
// ==========================================

use std::collections::{BTreeMap, HashMap};

use crate::domain::{LayerKey, NetReject, RejectRecord, ReplacementRecord};
use crate::engine::quantity::clamp_non_negative;

/// 不良净额映射
pub type NetRejectMap = BTreeMap<LayerKey, NetReject>;

pub struct NetQuantityCalculator {
    // 无状态引擎
}

impl NetQuantityCalculator {
    pub fn new() -> Self {
        Self {}
    }

    /// 聚合不良净额
    ///
    /// - 已取消的不良不计
    /// - 补料通过 bonding_reject_id 归属到不良；所属不良已取消或不存在时忽略
    /// - 仅 IN_PROGRESS / COMPLETED 的补料冲抵不良
    /// - PENDING / IN_PROGRESS 计为未结补料单
    pub fn aggregate_rejects(
        &self,
        rejects: &[RejectRecord],
        replacements: &[ReplacementRecord],
    ) -> NetRejectMap {
        let mut map = NetRejectMap::new();
        let mut owner: HashMap<i64, LayerKey> = HashMap::new();

        for reject in rejects.iter().filter(|r| !r.is_cancelled()) {
            let key = reject.layer_key();
            let entry = map.entry(key.clone()).or_default();
            entry.ng_total += reject.ng_quantity.unwrap_or(0);
            owner.insert(reject.reject_id, key);
        }

        for replacement in replacements {
            let Some(key) = owner.get(&replacement.bonding_reject_id) else {
                continue;
            };
            let Some(entry) = map.get_mut(key) else {
                continue;
            };
            if replacement.status.offsets_reject() {
                entry.processed_total += replacement.processed_qty.unwrap_or(0);
            }
            if replacement.status.is_open() {
                entry.open_replacements += 1;
            }
        }

        for entry in map.values_mut() {
            entry.net_qty = clamp_non_negative(entry.ng_total - entry.processed_total);
        }

        map
    }

    /// 层净量（有符号，下游在闸门分类后才可假定非负）
    pub fn net_qty(&self, cutting_qty: i64, net_reject_qty: i64) -> i64 {
        cutting_qty - net_reject_qty
    }
}

impl Default for NetQuantityCalculator {
    fn default() -> Self {
        Self::new()
    }
}
