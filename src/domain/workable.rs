// ==========================================
// 裁切贴合可投产量核算系统 - 核算结果领域模型
// ==========================================
// 职责: 台账行、不良净额、可投产分组、层位明细
// 生命周期: 每次核算重新生成，不落库
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::production::GroupKey;
use super::types::{WorkableStatus, LAYER_DISPLAY_SLOTS};

// ==========================================
// LedgerEntry - 台账行
// ==========================================
// 每个 (customer, sku, week, layer_code) 唯一一行

/// 固化闸门（未完成）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CuringGate {
    pub due_at: Option<NaiveDateTime>,
}

/// 返工闸门
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReworkGate {
    pub total_units: i64,
    pub remaining_units: i64,
}

impl ReworkGate {
    /// 已返工数量 = 总数 - 剩余
    pub fn reworked_units(&self) -> i64 {
        (self.total_units - self.remaining_units).max(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub key: GroupKey,
    pub layer_code: String,
    pub layer_index: i32,       // 缺省 1
    pub cutting_qty: i64,       // 裁切原始数量
    pub net_reject_qty: i64,    // 不良净额（≥ 0）
    pub net_qty: i64,           // cutting_qty - net_reject_qty，有符号
    pub curing_gate: Option<CuringGate>,
    pub rework_gate: Option<ReworkGate>,
    pub bonding_qty: i64,       // 已被贴合消耗
}

// ==========================================
// NetReject - 不良净额
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetReject {
    pub ng_total: i64,          // 未取消不良合计
    pub processed_total: i64,   // IN_PROGRESS / COMPLETED 补料合计
    pub open_replacements: u32, // PENDING / IN_PROGRESS 补料单数
    pub net_qty: i64,           // max(ng - processed, 0)
}

impl NetReject {
    /// 是否仍有未结不良
    pub fn is_outstanding(&self) -> bool {
        self.net_qty > 0 || self.open_replacements > 0
    }
}

// ==========================================
// LayerBreakdown - 层位明细 (1..4)
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerBreakdown {
    /// 层位 1..4 的可投产量；None 表示无数据或被闸门阻断
    pub slots: [Option<i64>; LAYER_DISPLAY_SLOTS],
    /// 存在层序号 > 4 被并入第 4 层
    pub overflow: bool,
}

// ==========================================
// WorkableGroup - 可投产分组
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkableGroup {
    pub key: GroupKey,
    pub quantity_order: i64,
    pub total_bonding: i64,
    pub remaining_to_produce: i64,
    /// Completed 时为 None（展示占位符，而不是 0）
    pub workable_qty: Option<i64>,
    pub status: WorkableStatus,
    pub remarks: Vec<String>,
    pub layers: LayerBreakdown,
}

impl WorkableGroup {
    pub fn is_active(&self) -> bool {
        self.status != WorkableStatus::Completed
    }
}

// ==========================================
// RejectSummaryRow - 不良汇总行
// ==========================================

/// 单层不良/补料数字
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectLayerFigures {
    pub ng_qty: i64,
    pub replaced_qty: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectSummaryRow {
    /// 无在制分组时为 None
    pub customer_name: Option<String>,
    pub sku: String,
    pub week: Option<i32>,
    pub layers: [Option<RejectLayerFigures>; LAYER_DISPLAY_SLOTS],
    /// 借用对应可投产分组的状态
    pub status: Option<WorkableStatus>,
}
