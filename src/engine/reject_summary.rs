// ==========================================
// 裁切贴合可投产量核算系统 - 不良汇总
// ==========================================
// 职责: 按层汇总未结不良的 NG 数量与补料已处理数量
// 输入: 不良净额 + 层序号 + 可投产分组
// 输出: 每个在制分组一行；无在制分组的未结不良 SKU 另出一行
// 说明: 与可投产量计算相互独立，只借用分组状态用于对照
// ==========================================

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{
    RejectLayerFigures, RejectSummaryRow, WorkableGroup, LAYER_DISPLAY_SLOTS,
};
use crate::engine::ledger::{LayerIndexMap, DEFAULT_LAYER_INDEX};
use crate::engine::net_quantity::NetRejectMap;
use crate::engine::quantity::clamp_non_negative;

type LayerFigures = [Option<RejectLayerFigures>; LAYER_DISPLAY_SLOTS];

pub struct RejectSummaryBuilder {
    // 无状态引擎
}

impl RejectSummaryBuilder {
    pub fn new() -> Self {
        Self {}
    }

    pub fn build(
        &self,
        net_rejects: &NetRejectMap,
        layer_index: &LayerIndexMap,
        groups: &[WorkableGroup],
    ) -> Vec<RejectSummaryRow> {
        let figures = Self::figures_by_sku(net_rejects, layer_index);

        let mut rows = Vec::new();
        let mut covered: BTreeSet<&str> = BTreeSet::new();

        for group in groups.iter().filter(|g| g.is_active()) {
            covered.insert(group.key.sku.as_str());
            rows.push(RejectSummaryRow {
                customer_name: Some(group.key.customer_name.clone()),
                sku: group.key.sku.clone(),
                week: Some(group.key.week),
                layers: figures
                    .get(&group.key.sku)
                    .copied()
                    .unwrap_or([None; LAYER_DISPLAY_SLOTS]),
                status: Some(group.status),
            });
        }

        // 未结不良但无在制分组
        for (sku, layers) in &figures {
            if covered.contains(sku.as_str()) {
                continue;
            }
            rows.push(RejectSummaryRow {
                customer_name: None,
                sku: sku.clone(),
                week: None,
                layers: *layers,
                status: None,
            });
        }

        rows
    }

    fn figures_by_sku(
        net_rejects: &NetRejectMap,
        layer_index: &LayerIndexMap,
    ) -> BTreeMap<String, LayerFigures> {
        let mut by_sku: BTreeMap<String, LayerFigures> = BTreeMap::new();

        for (key, net) in net_rejects.iter().filter(|(_, n)| n.is_outstanding()) {
            let index = layer_index
                .get(key)
                .copied()
                .unwrap_or(DEFAULT_LAYER_INDEX)
                .clamp(1, LAYER_DISPLAY_SLOTS as i32);
            let slot = (index - 1) as usize;

            let layers = by_sku
                .entry(key.sku.clone())
                .or_insert([None; LAYER_DISPLAY_SLOTS]);
            let cell = layers[slot].get_or_insert_with(RejectLayerFigures::default);
            cell.ng_qty += clamp_non_negative(net.ng_total);
            cell.replaced_qty += clamp_non_negative(net.processed_total);
        }

        by_sku
    }
}

impl Default for RejectSummaryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GroupKey, LayerBreakdown, LayerKey, NetReject, WorkableStatus};

    fn group(customer: &str, sku: &str, status: WorkableStatus) -> WorkableGroup {
        WorkableGroup {
            key: GroupKey::new(customer, sku, 7),
            quantity_order: 100,
            total_bonding: 0,
            remaining_to_produce: 100,
            workable_qty: Some(0),
            status,
            remarks: Vec::new(),
            layers: LayerBreakdown::default(),
        }
    }

    fn net(ng: i64, processed: i64, open: u32) -> NetReject {
        NetReject {
            ng_total: ng,
            processed_total: processed,
            open_replacements: open,
            net_qty: (ng - processed).max(0),
        }
    }

    #[test]
    fn test_rows_follow_active_groups_and_orphans() {
        let mut net_rejects = NetRejectMap::new();
        net_rejects.insert(LayerKey::new("SKU-1", "MAIN"), net(20, 5, 1));
        net_rejects.insert(LayerKey::new("SKU-1", "FOAM"), net(6, 0, 0));
        net_rejects.insert(LayerKey::new("SKU-9", "MAIN"), net(3, 0, 0));
        net_rejects.insert(LayerKey::new("SKU-2", "MAIN"), net(10, 10, 0));

        let mut layer_index = LayerIndexMap::new();
        layer_index.insert(LayerKey::new("SKU-1", "FOAM"), 6);

        let groups = vec![
            group("Acme", "SKU-1", WorkableStatus::Running),
            group("Acme", "SKU-2", WorkableStatus::Halted),
            group("Beta", "SKU-3", WorkableStatus::Completed),
        ];

        let rows = RejectSummaryBuilder::new().build(&net_rejects, &layer_index, &groups);

        assert_eq!(rows.len(), 3);

        assert_eq!(rows[0].sku, "SKU-1");
        assert_eq!(
            rows[0].layers[0],
            Some(RejectLayerFigures {
                ng_qty: 20,
                replaced_qty: 5
            })
        );
        assert_eq!(
            rows[0].layers[3],
            Some(RejectLayerFigures {
                ng_qty: 6,
                replaced_qty: 0
            })
        );
        assert_eq!(rows[0].status, Some(WorkableStatus::Running));

        // 已结清不良的分组仍然出行，但为空占位
        assert_eq!(rows[1].sku, "SKU-2");
        assert_eq!(rows[1].layers, [None; LAYER_DISPLAY_SLOTS]);

        assert_eq!(rows[2].sku, "SKU-9");
        assert_eq!(rows[2].customer_name, None);
        assert_eq!(rows[2].status, None);
    }
}
