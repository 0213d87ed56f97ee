// ==========================================
// 裁切贴合可投产量核算系统 - 闸门分类
// ==========================================
// 职责: 将分组台账行拆分为 固化阻断 / 返工阻断 / 正常 三个互斥集合
// 规则:
// - 固化未完成的行归入固化集合（优先于返工）
// - 返工活跃的行归入返工集合（剩余为 0 时仍不参与最小净量）
// - 其余为正常行，只有正常行参与最小净量计算
// 说明: 分类按行进行，同一分组可部分层阻断
// ==========================================

use chrono::NaiveDateTime;

use crate::domain::{LedgerEntry, ReworkGate};

/// 分类结果（借用台账行）
#[derive(Debug, Default)]
pub struct GateClassification<'a> {
    pub curing: Vec<&'a LedgerEntry>,
    pub rework: Vec<&'a LedgerEntry>,
    pub normal: Vec<&'a LedgerEntry>,
}

impl<'a> GateClassification<'a> {
    /// 是否存在阻断
    pub fn is_halted(&self) -> bool {
        !self.curing.is_empty() || self.rework_remaining() > 0
    }

    /// 固化集合中最早到期时间
    pub fn earliest_curing_due(&self) -> Option<NaiveDateTime> {
        self.curing
            .iter()
            .filter_map(|row| row.curing_gate.as_ref().and_then(|g| g.due_at))
            .min()
    }

    /// 固化中的裁切原始数量
    pub fn curing_cutting_qty(&self) -> i64 {
        self.curing.iter().map(|row| row.cutting_qty).sum()
    }

    /// 所有携带返工标记的行（含固化集合中同时返工的行）
    fn rework_gates(&self) -> impl Iterator<Item = &ReworkGate> + '_ {
        self.rework
            .iter()
            .chain(self.curing.iter())
            .filter_map(|row| row.rework_gate.as_ref())
    }

    /// 是否存在返工进度需要备注
    pub fn has_rework(&self) -> bool {
        self.rework_gates().next().is_some()
    }

    /// 返工剩余合计（阻断量）
    pub fn rework_remaining(&self) -> i64 {
        self.rework_gates().map(|g| g.remaining_units).sum()
    }

    /// 返工总数合计
    pub fn rework_total(&self) -> i64 {
        self.rework_gates().map(|g| g.total_units).sum()
    }

    /// 已返工合计（仅用于备注，不计入可用）
    pub fn rework_done(&self) -> i64 {
        self.rework_gates().map(|g| g.reworked_units()).sum()
    }

    /// 正常行中是否有裁切产出
    pub fn has_normal_cutting(&self) -> bool {
        self.normal.iter().any(|row| row.cutting_qty > 0)
    }
}

pub struct GateClassifier {
    // 无状态引擎
}

impl GateClassifier {
    pub fn new() -> Self {
        Self {}
    }

    pub fn classify<'a>(&self, rows: &'a [LedgerEntry]) -> GateClassification<'a> {
        let mut out = GateClassification::default();
        for row in rows {
            if row.curing_gate.is_some() {
                out.curing.push(row);
            } else if row.rework_gate.is_some() {
                out.rework.push(row);
            } else {
                out.normal.push(row);
            }
        }
        out
    }
}

impl Default for GateClassifier {
    fn default() -> Self {
        Self::new()
    }
}
