// ==========================================
// 裁切贴合可投产量核算系统 - 展示排序
// ==========================================
// 职责: 状态优先级排序 + 展示行转换
// 红线: 状态优先级只在 status_priority 一处定义，三个视图共用
// 展示约定: 数值为 0 或缺失时显示 "-"
// ==========================================

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::domain::{RejectSummaryRow, WorkableGroup, WorkableStatus, LAYER_DISPLAY_SLOTS};

pub const PLACEHOLDER: &str = "-";

/// 状态优先级: Running(1) < Halted(2) < Completed(3) < Not Started(4) < 未知(5)
pub fn status_priority(status: Option<WorkableStatus>) -> u8 {
    match status {
        Some(WorkableStatus::Running) => 1,
        Some(WorkableStatus::Halted) => 2,
        Some(WorkableStatus::Completed) => 3,
        Some(WorkableStatus::NotStarted) => 4,
        None => 5,
    }
}

/// 数值展示: 缺失或 ≤ 0 显示占位符
pub fn display_qty(qty: Option<i64>) -> String {
    match qty {
        Some(q) if q > 0 => q.to_string(),
        _ => PLACEHOLDER.to_string(),
    }
}

fn compare_rows(
    a_status: Option<WorkableStatus>,
    a_customer: &str,
    a_sku: &str,
    b_status: Option<WorkableStatus>,
    b_customer: &str,
    b_sku: &str,
) -> Ordering {
    status_priority(a_status)
        .cmp(&status_priority(b_status))
        .then_with(|| a_customer.to_lowercase().cmp(&b_customer.to_lowercase()))
        .then_with(|| a_sku.to_lowercase().cmp(&b_sku.to_lowercase()))
}

// ==========================================
// 展示行
// ==========================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub week: i32,
    pub customer: String,
    pub sku: String,
    pub quantity_order: String,
    pub workable: String,
    pub bonding: String,
    pub remaining_to_produce: String,
    pub status: String,
    pub remarks: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailRow {
    #[serde(flatten)]
    pub summary: SummaryRow,
    pub layer_1: String,
    pub layer_2: String,
    pub layer_3: String,
    pub layer_4: String,
    pub layer_overflow: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectRow {
    pub week: String,
    pub customer: String,
    pub sku: String,
    pub layer_1_ng: String,
    pub layer_1_replacement: String,
    pub layer_2_ng: String,
    pub layer_2_replacement: String,
    pub layer_3_ng: String,
    pub layer_3_replacement: String,
    pub layer_4_ng: String,
    pub layer_4_replacement: String,
    /// 孔位修补列，暂无数据来源
    pub hole: String,
    pub status: String,
}

/// 一次核算的完整输出
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkableReport {
    pub timestamp: String,
    pub summary: Vec<SummaryRow>,
    pub detail: Vec<DetailRow>,
    pub reject: Vec<RejectRow>,
}

pub struct ReportPresenter {
    // 无状态引擎
}

impl ReportPresenter {
    pub fn new() -> Self {
        Self {}
    }

    /// 可投产分组稳定排序
    pub fn sort_groups(&self, groups: &mut [WorkableGroup]) {
        groups.sort_by(|a, b| {
            compare_rows(
                Some(a.status),
                &a.key.customer_name,
                &a.key.sku,
                Some(b.status),
                &b.key.customer_name,
                &b.key.sku,
            )
        });
    }

    /// 不良汇总稳定排序；无对应分组时按 Not Started 排
    pub fn sort_rejects(&self, rows: &mut [RejectSummaryRow]) {
        rows.sort_by(|a, b| {
            compare_rows(
                a.status.or(Some(WorkableStatus::NotStarted)),
                a.customer_name.as_deref().unwrap_or(""),
                &a.sku,
                b.status.or(Some(WorkableStatus::NotStarted)),
                b.customer_name.as_deref().unwrap_or(""),
                &b.sku,
            )
        });
    }

    pub fn summary_row(&self, group: &WorkableGroup) -> SummaryRow {
        let remarks = if group.remarks.is_empty() {
            PLACEHOLDER.to_string()
        } else {
            group.remarks.join("; ")
        };

        SummaryRow {
            week: group.key.week,
            customer: group.key.customer_name.clone(),
            sku: group.key.sku.clone(),
            quantity_order: display_qty(Some(group.quantity_order)),
            workable: display_qty(group.workable_qty),
            bonding: display_qty(Some(group.total_bonding)),
            remaining_to_produce: display_qty(Some(group.remaining_to_produce)),
            status: group.status.label().to_string(),
            remarks,
        }
    }

    pub fn detail_row(&self, group: &WorkableGroup) -> DetailRow {
        let [l1, l2, l3, l4] = group.layers.slots.map(display_qty);
        DetailRow {
            summary: self.summary_row(group),
            layer_1: l1,
            layer_2: l2,
            layer_3: l3,
            layer_4: l4,
            layer_overflow: group.layers.overflow,
        }
    }

    pub fn reject_row(&self, row: &RejectSummaryRow) -> RejectRow {
        let figures: [(String, String); LAYER_DISPLAY_SLOTS] = row.layers.map(|cell| match cell {
            Some(f) => (display_qty(Some(f.ng_qty)), display_qty(Some(f.replaced_qty))),
            None => (PLACEHOLDER.to_string(), PLACEHOLDER.to_string()),
        });
        let [(l1_ng, l1_rep), (l2_ng, l2_rep), (l3_ng, l3_rep), (l4_ng, l4_rep)] = figures;

        RejectRow {
            week: row
                .week
                .map(|w| w.to_string())
                .unwrap_or_else(|| PLACEHOLDER.to_string()),
            customer: row
                .customer_name
                .clone()
                .unwrap_or_else(|| PLACEHOLDER.to_string()),
            sku: row.sku.clone(),
            layer_1_ng: l1_ng,
            layer_1_replacement: l1_rep,
            layer_2_ng: l2_ng,
            layer_2_replacement: l2_rep,
            layer_3_ng: l3_ng,
            layer_3_replacement: l3_rep,
            layer_4_ng: l4_ng,
            layer_4_replacement: l4_rep,
            hole: PLACEHOLDER.to_string(),
            status: row
                .status
                .map(|s| s.label().to_string())
                .unwrap_or_else(|| PLACEHOLDER.to_string()),
        }
    }

    /// 组装报告（输入须已排序）
    pub fn present(
        &self,
        timestamp: String,
        groups: &[WorkableGroup],
        rejects: &[RejectSummaryRow],
    ) -> WorkableReport {
        WorkableReport {
            timestamp,
            summary: groups.iter().map(|g| self.summary_row(g)).collect(),
            detail: groups.iter().map(|g| self.detail_row(g)).collect(),
            reject: rejects.iter().map(|r| self.reject_row(r)).collect(),
        }
    }
}

impl Default for ReportPresenter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GroupKey, LayerBreakdown, RejectLayerFigures};

    fn group(customer: &str, sku: &str, status: WorkableStatus) -> WorkableGroup {
        WorkableGroup {
            key: GroupKey::new(customer, sku, 3),
            quantity_order: 100,
            total_bonding: 0,
            remaining_to_produce: 100,
            workable_qty: Some(40),
            status,
            remarks: vec!["Cutting in progress".to_string()],
            layers: LayerBreakdown {
                slots: [Some(40), Some(0), None, None],
                overflow: false,
            },
        }
    }

    #[test]
    fn test_status_priority_table() {
        assert!(status_priority(Some(WorkableStatus::Running)) < status_priority(Some(WorkableStatus::Halted)));
        assert!(status_priority(Some(WorkableStatus::Halted)) < status_priority(Some(WorkableStatus::Completed)));
        assert!(status_priority(Some(WorkableStatus::Completed)) < status_priority(Some(WorkableStatus::NotStarted)));
        assert!(status_priority(Some(WorkableStatus::NotStarted)) < status_priority(None));
    }

    #[test]
    fn test_sort_groups_by_priority_then_case_insensitive_name() {
        let mut groups = vec![
            group("beta", "SKU-1", WorkableStatus::Running),
            group("Zeta", "SKU-1", WorkableStatus::NotStarted),
            group("Alpha", "sku-2", WorkableStatus::Running),
            group("alpha", "SKU-1", WorkableStatus::Running),
            group("Gamma", "SKU-1", WorkableStatus::Halted),
        ];

        ReportPresenter::new().sort_groups(&mut groups);

        let order: Vec<(&str, &str)> = groups
            .iter()
            .map(|g| (g.key.customer_name.as_str(), g.key.sku.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("alpha", "SKU-1"),
                ("Alpha", "sku-2"),
                ("beta", "SKU-1"),
                ("Gamma", "SKU-1"),
                ("Zeta", "SKU-1"),
            ]
        );
    }

    #[test]
    fn test_unmatched_reject_rows_sort_as_not_started() {
        let row = |customer: Option<&str>, sku: &str, status: Option<WorkableStatus>| RejectSummaryRow {
            customer_name: customer.map(str::to_string),
            sku: sku.to_string(),
            week: None,
            layers: [None; LAYER_DISPLAY_SLOTS],
            status,
        };
        let mut rows = vec![
            row(None, "SKU-0", None),
            row(Some("Acme"), "SKU-9", Some(WorkableStatus::NotStarted)),
            row(Some("Acme"), "SKU-1", Some(WorkableStatus::Halted)),
        ];

        ReportPresenter::new().sort_rejects(&mut rows);

        assert_eq!(rows[0].sku, "SKU-1");
        assert_eq!(rows[1].sku, "SKU-0");
        assert_eq!(rows[2].sku, "SKU-9");
    }

    #[test]
    fn test_display_placeholders() {
        let presenter = ReportPresenter::new();
        let mut completed = group("Acme", "SKU-1", WorkableStatus::Completed);
        completed.workable_qty = None;
        completed.remaining_to_produce = -5;
        completed.remarks.clear();

        let detail = presenter.detail_row(&completed);
        assert_eq!(detail.summary.workable, "-");
        assert_eq!(detail.summary.remaining_to_produce, "-");
        assert_eq!(detail.summary.bonding, "-");
        assert_eq!(detail.summary.remarks, "-");
        assert_eq!(detail.summary.status, "Completed");
        assert_eq!(detail.layer_1, "40");
        assert_eq!(detail.layer_2, "-");

        let reject = presenter.reject_row(&RejectSummaryRow {
            customer_name: None,
            sku: "SKU-1".to_string(),
            week: None,
            layers: [
                Some(RejectLayerFigures {
                    ng_qty: 12,
                    replaced_qty: 0,
                }),
                None,
                None,
                None,
            ],
            status: None,
        });
        assert_eq!(reject.layer_1_ng, "12");
        assert_eq!(reject.layer_1_replacement, "-");
        assert_eq!(reject.hole, "-");
        assert_eq!(reject.customer, "-");
        assert_eq!(reject.status, "-");
    }

    #[test]
    fn test_detail_serializes_flat() {
        let detail = ReportPresenter::new().detail_row(&group("Acme", "SKU-1", WorkableStatus::Running));
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["customer"], "Acme");
        assert_eq!(json["layer_1"], "40");
        assert_eq!(json["layer_overflow"], false);
    }
}
