// ==========================================
// 裁切贴合可投产量核算系统 - 可投产量聚合
// ==========================================
// 职责: 将分组的多层台账行折叠为 一个可投产量 + 剩余待产 + 状态 + 备注
// 规则: 瓶颈取最小（可贴合数量受最稀缺组件层限制）
// ==========================================

use chrono::NaiveDateTime;

use crate::domain::{
    GroupKey, LayerBreakdown, LedgerEntry, WorkableGroup, WorkableStatus, LAYER_DISPLAY_SLOTS,
};
use crate::engine::gate::{GateClassification, GateClassifier};
use crate::engine::quantity::clamp_non_negative;

pub const REMARK_CUTTING_IN_PROGRESS: &str = "Cutting in progress";
pub const REMARK_WAITING_FOR_CUTTING: &str = "Waiting for cutting";

pub struct WorkableAggregator {
    classifier: GateClassifier,
}

impl WorkableAggregator {
    pub fn new() -> Self {
        Self {
            classifier: GateClassifier::new(),
        }
    }

    /// 聚合一个 (customer, sku, week) 分组
    ///
    /// # 参数
    /// - `planned_qty`: 计划数量
    /// - `rows`: 该分组的台账行
    /// - `now`: 仅用于固化备注的剩余时间
    pub fn aggregate(
        &self,
        key: &GroupKey,
        planned_qty: i64,
        rows: &[LedgerEntry],
        now: NaiveDateTime,
    ) -> WorkableGroup {
        // 1. 贴合消耗不受闸门影响，全部计入
        let total_bonding: i64 = rows.iter().map(|r| r.bonding_qty).sum();

        // 2. 剩余待产
        let remaining_to_produce = planned_qty - total_bonding;
        if remaining_to_produce <= 0 {
            return WorkableGroup {
                key: key.clone(),
                quantity_order: planned_qty,
                total_bonding,
                remaining_to_produce,
                workable_qty: None,
                status: WorkableStatus::Completed,
                remarks: Vec::new(),
                layers: LayerBreakdown::default(),
            };
        }

        let gates = self.classifier.classify(rows);

        // 3-4. 正常行中正净量取最小，再扣贴合
        let min_net = gates
            .normal
            .iter()
            .map(|r| r.net_qty)
            .filter(|&q| q > 0)
            .min()
            .unwrap_or(0);
        let workable = clamp_non_negative(min_net - total_bonding);

        // 5. 状态
        let status = if gates.is_halted() {
            WorkableStatus::Halted
        } else if gates.has_normal_cutting() {
            WorkableStatus::Running
        } else {
            WorkableStatus::NotStarted
        };

        WorkableGroup {
            key: key.clone(),
            quantity_order: planned_qty,
            total_bonding,
            remaining_to_produce,
            workable_qty: Some(workable),
            status,
            remarks: build_remarks(&gates, status, now),
            layers: self.layer_breakdown(key, rows, &gates, total_bonding),
        }
    }

    /// 层位明细：正常行 = max(净量 - 总贴合, 0)，阻断行为空
    ///
    /// 序号 < 1 按 1；序号 > 4 并入第 4 层并标记溢出。同槽多行取最小。
    fn layer_breakdown(
        &self,
        key: &GroupKey,
        rows: &[LedgerEntry],
        gates: &GateClassification<'_>,
        total_bonding: i64,
    ) -> LayerBreakdown {
        let mut breakdown = LayerBreakdown::default();

        for row in rows {
            let slot = if row.layer_index > LAYER_DISPLAY_SLOTS as i32 {
                breakdown.overflow = true;
                tracing::debug!(
                    customer = %key.customer_name,
                    sku = %key.sku,
                    week = key.week,
                    layer_code = %row.layer_code,
                    layer_index = row.layer_index,
                    "层序号超过展示上限，已并入第 {} 层",
                    LAYER_DISPLAY_SLOTS
                );
                LAYER_DISPLAY_SLOTS - 1
            } else {
                (row.layer_index.max(1) - 1) as usize
            };

            let is_normal = gates.normal.iter().any(|n| std::ptr::eq(*n, row));
            if !is_normal {
                continue;
            }

            let value = clamp_non_negative(row.net_qty - total_bonding);
            breakdown.slots[slot] = Some(match breakdown.slots[slot] {
                Some(existing) => existing.min(value),
                None => value,
            });
        }

        breakdown
    }
}

impl Default for WorkableAggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// 备注拼接顺序: 固化 → 返工 → 裁切中 → 等待裁切（兜底）
fn build_remarks(
    gates: &GateClassification<'_>,
    status: WorkableStatus,
    now: NaiveDateTime,
) -> Vec<String> {
    let mut remarks = Vec::new();

    if !gates.curing.is_empty() {
        remarks.push(curing_remark(
            gates.curing_cutting_qty(),
            gates.earliest_curing_due(),
            now,
        ));
    }

    if gates.has_rework() {
        remarks.push(format!(
            "Rework {} of {} done",
            gates.rework_done(),
            gates.rework_total()
        ));
    }

    if remarks.is_empty() {
        remarks.push(if status == WorkableStatus::Running {
            REMARK_CUTTING_IN_PROGRESS.to_string()
        } else {
            REMARK_WAITING_FOR_CUTTING.to_string()
        });
    }

    remarks
}

fn curing_remark(qty: i64, due: Option<NaiveDateTime>, now: NaiveDateTime) -> String {
    let Some(due) = due else {
        return format!("Curing {} pcs (due time not set)", qty);
    };

    let when = due.format("%d/%m %H:%M");
    let minutes_left = (due - now).num_minutes();
    if minutes_left > 0 {
        let hours_left = (minutes_left + 59) / 60;
        format!("Curing {} pcs until {} ({}h left)", qty, when, hours_left)
    } else {
        format!("Curing {} pcs until {} (awaiting confirmation)", qty, when)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CuringGate, ReworkGate};
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 16)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn key() -> GroupKey {
        GroupKey::new("Acme", "SKU-1", 42)
    }

    fn row(code: &str, index: i32, cutting: i64, net: i64, bonding: i64) -> LedgerEntry {
        LedgerEntry {
            key: key(),
            layer_code: code.to_string(),
            layer_index: index,
            cutting_qty: cutting,
            net_reject_qty: cutting - net,
            net_qty: net,
            curing_gate: None,
            rework_gate: None,
            bonding_qty: bonding,
        }
    }

    #[test]
    fn test_bottleneck_layer_caps_workable() {
        let rows = vec![row("A", 1, 80, 80, 0), row("B", 2, 50, 50, 0)];
        let group = WorkableAggregator::new().aggregate(&key(), 100, &rows, now());

        assert_eq!(group.workable_qty, Some(50));
        assert_eq!(group.status, WorkableStatus::Running);
        assert_eq!(group.remarks, vec![REMARK_CUTTING_IN_PROGRESS.to_string()]);
        assert_eq!(group.layers.slots, [Some(80), Some(50), None, None]);
    }

    #[test]
    fn test_completed_suppresses_workable() {
        let rows = vec![row("MAIN", 1, 100, 100, 100)];
        let group = WorkableAggregator::new().aggregate(&key(), 100, &rows, now());

        assert_eq!(group.status, WorkableStatus::Completed);
        assert_eq!(group.workable_qty, None);
        assert_eq!(group.remaining_to_produce, 0);
        assert!(group.remarks.is_empty());
    }

    #[test]
    fn test_curing_halts_and_is_excluded_from_minimum() {
        let mut curing = row("FOAM", 2, 60, 60, 0);
        curing.curing_gate = Some(CuringGate {
            due_at: Some(now() + chrono::Duration::minutes(150)),
        });
        let rows = vec![row("BASE", 1, 90, 90, 0), curing];

        let group = WorkableAggregator::new().aggregate(&key(), 100, &rows, now());

        assert_eq!(group.status, WorkableStatus::Halted);
        assert_eq!(group.workable_qty, Some(90));
        assert_eq!(group.remarks, vec!["Curing 60 pcs until 16/10 10:30 (3h left)".to_string()]);
        assert_eq!(group.layers.slots, [Some(90), None, None, None]);
    }

    #[test]
    fn test_past_due_curing_awaits_confirmation() {
        let remark = curing_remark(12, Some(now() - chrono::Duration::hours(1)), now());
        assert_eq!(remark, "Curing 12 pcs until 16/10 07:00 (awaiting confirmation)");
    }

    #[test]
    fn test_rework_remark_and_halt() {
        let mut rework = row("MAIN", 1, 40, 40, 0);
        rework.rework_gate = Some(ReworkGate {
            total_units: 10,
            remaining_units: 4,
        });
        let group = WorkableAggregator::new().aggregate(&key(), 100, &[rework], now());

        assert_eq!(group.status, WorkableStatus::Halted);
        assert_eq!(group.workable_qty, Some(0));
        assert_eq!(group.remarks, vec!["Rework 6 of 10 done".to_string()]);
    }

    #[test]
    fn test_not_started_when_nothing_cut() {
        let rows = vec![row("MAIN", 1, 0, 0, 0)];
        let group = WorkableAggregator::new().aggregate(&key(), 100, &rows, now());

        assert_eq!(group.status, WorkableStatus::NotStarted);
        assert_eq!(group.workable_qty, Some(0));
        assert_eq!(group.remarks, vec![REMARK_WAITING_FOR_CUTTING.to_string()]);
    }

    #[test]
    fn test_negative_net_never_yields_negative_workable() {
        let rows = vec![row("MAIN", 1, 10, -20, 5)];
        let group = WorkableAggregator::new().aggregate(&key(), 100, &rows, now());

        assert_eq!(group.workable_qty, Some(0));
        assert_eq!(group.layers.slots[0], Some(0));
    }

    #[test]
    fn test_layer_overflow_merges_into_last_slot() {
        let rows = vec![
            row("L4", 4, 70, 70, 0),
            row("L5", 5, 30, 30, 0),
            row("L0", 0, 20, 20, 0),
        ];
        let group = WorkableAggregator::new().aggregate(&key(), 100, &rows, now());

        assert!(group.layers.overflow);
        assert_eq!(group.layers.slots, [Some(20), None, None, Some(30)]);
    }
}
