// ==========================================
// 裁切贴合可投产量核算系统 - 台账合并
// ==========================================
// 职责: 计划需求 × 裁切 × 组件层 × 不良净额 × 贴合 → 台账行
// 输出: GroupKey → 台账行列表（每个 layer_code 唯一一行）
// 规则:
// - 无裁切记录的分组不进入核算
// - 同层重复裁切记录合并：数量求和；固化取最早到期；返工按活跃记录求和
// - 贴合按层代码落行；未指定层或层不存在时落到锚定行
// ==========================================

use chrono::NaiveDateTime;
use std::collections::BTreeMap;

use crate::domain::{
    normalize_layer_code, BondingConsumption, CuringGate, CuttingEntry, GroupKey, LayerDefinition,
    LayerKey, LedgerEntry, ReworkGate, DEFAULT_LAYER_CODE,
};
use crate::engine::demand::DemandMap;
use crate::engine::net_quantity::{NetQuantityCalculator, NetRejectMap};

/// 层序号映射 (sku, layer_code) → layer_index
pub type LayerIndexMap = BTreeMap<LayerKey, i32>;

/// 分组台账
pub type GroupLedger = BTreeMap<GroupKey, Vec<LedgerEntry>>;

/// 未定义层序号时的缺省值
pub const DEFAULT_LAYER_INDEX: i32 = 1;

/// 构建层序号映射；同一层重复定义取最小序号，序号为空的定义忽略
pub fn build_layer_index(definitions: &[LayerDefinition]) -> LayerIndexMap {
    let mut map = LayerIndexMap::new();
    for def in definitions {
        let Some(index) = def.layer_index else {
            continue;
        };
        let key = LayerKey::new(
            def.sku.clone(),
            normalize_layer_code(Some(def.layer_code.as_str())),
        );
        map.entry(key)
            .and_modify(|existing: &mut i32| *existing = (*existing).min(index))
            .or_insert(index);
    }
    map
}

// 单层裁切合并结果
#[derive(Debug, Default)]
struct CuttingRollup {
    quantity: i64,
    curing_pending: bool,
    curing_due: Option<NaiveDateTime>,
    rework_active: bool,
    rework_total: i64,
    rework_remaining: i64,
}

impl CuttingRollup {
    fn absorb(&mut self, entry: &CuttingEntry) {
        self.quantity += entry.quantity.unwrap_or(0);

        if let Some(curing) = entry.curing.as_ref().filter(|c| c.is_pending) {
            self.curing_pending = true;
            self.curing_due = match (self.curing_due, curing.due_at) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
        }

        if let Some(rework) = entry.rework.as_ref().filter(|r| r.is_active) {
            self.rework_active = true;
            self.rework_total += rework.total_units;
            self.rework_remaining += rework.remaining_units;
        }
    }
}

type SkuWeek = (String, i32);

pub struct LedgerJoiner {
    net_calculator: NetQuantityCalculator,
}

impl LedgerJoiner {
    pub fn new() -> Self {
        Self {
            net_calculator: NetQuantityCalculator::new(),
        }
    }

    /// 合并生成分组台账
    pub fn join(
        &self,
        demand: &DemandMap,
        cutting_entries: &[CuttingEntry],
        layer_index: &LayerIndexMap,
        net_rejects: &NetRejectMap,
        bonding: &[BondingConsumption],
    ) -> GroupLedger {
        let cutting = Self::rollup_cutting(cutting_entries);
        let bonding_by_week = Self::index_bonding(bonding);

        let mut ledger = GroupLedger::new();
        for key in demand.keys() {
            let sku_week = (key.sku.clone(), key.week);
            let Some(layers) = cutting.get(&sku_week) else {
                continue;
            };

            let mut rows: Vec<LedgerEntry> = layers
                .iter()
                .map(|(layer_code, rollup)| {
                    self.build_row(key, layer_code, rollup, layer_index, net_rejects)
                })
                .collect();
            rows.sort_by(|a, b| {
                a.layer_index
                    .cmp(&b.layer_index)
                    .then_with(|| a.layer_code.cmp(&b.layer_code))
            });

            if let Some(consumptions) = bonding_by_week.get(&sku_week) {
                Self::assign_bonding(&mut rows, consumptions);
            }

            ledger.insert(key.clone(), rows);
        }

        ledger
    }

    fn build_row(
        &self,
        key: &GroupKey,
        layer_code: &str,
        rollup: &CuttingRollup,
        layer_index: &LayerIndexMap,
        net_rejects: &NetRejectMap,
    ) -> LedgerEntry {
        let layer_key = LayerKey::new(key.sku.clone(), layer_code);
        let net_reject_qty = net_rejects
            .get(&layer_key)
            .map(|n| n.net_qty)
            .unwrap_or(0);

        LedgerEntry {
            key: key.clone(),
            layer_code: layer_code.to_string(),
            layer_index: layer_index
                .get(&layer_key)
                .copied()
                .unwrap_or(DEFAULT_LAYER_INDEX),
            cutting_qty: rollup.quantity,
            net_reject_qty,
            net_qty: self.net_calculator.net_qty(rollup.quantity, net_reject_qty),
            curing_gate: rollup.curing_pending.then(|| CuringGate {
                due_at: rollup.curing_due,
            }),
            rework_gate: rollup.rework_active.then(|| ReworkGate {
                total_units: rollup.rework_total,
                remaining_units: rollup.rework_remaining,
            }),
            bonding_qty: 0,
        }
    }

    fn rollup_cutting(entries: &[CuttingEntry]) -> BTreeMap<SkuWeek, BTreeMap<String, CuttingRollup>> {
        let mut map: BTreeMap<SkuWeek, BTreeMap<String, CuttingRollup>> = BTreeMap::new();
        for entry in entries {
            map.entry((entry.sku.clone(), entry.week))
                .or_default()
                .entry(entry.layer_code())
                .or_default()
                .absorb(entry);
        }
        map
    }

    fn index_bonding(bonding: &[BondingConsumption]) -> BTreeMap<SkuWeek, Vec<&BondingConsumption>> {
        let mut map: BTreeMap<SkuWeek, Vec<&BondingConsumption>> = BTreeMap::new();
        for b in bonding {
            map.entry((b.sku.clone(), b.week)).or_default().push(b);
        }
        map
    }

    /// 贴合落行
    ///
    /// 锚定行: 存在 MAIN 层取 MAIN，否则取序号最小的层（rows 已按序号排序）
    fn assign_bonding(rows: &mut [LedgerEntry], consumptions: &[&BondingConsumption]) {
        if rows.is_empty() {
            return;
        }
        let anchor = rows
            .iter()
            .position(|r| r.layer_code == DEFAULT_LAYER_CODE)
            .unwrap_or(0);

        for consumption in consumptions {
            let target = consumption
                .layer_code
                .as_deref()
                .map(|code| normalize_layer_code(Some(code)))
                .and_then(|code| rows.iter().position(|r| r.layer_code == code))
                .unwrap_or(anchor);
            rows[target].bonding_qty += consumption.quantity;
        }
    }
}

impl Default for LedgerJoiner {
    fn default() -> Self {
        Self::new()
    }
}
