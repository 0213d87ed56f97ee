// ==========================================
// 裁切贴合可投产量核算系统 - 源数据领域模型
// ==========================================
// 职责: 订单/裁切/贴合/不良/补料的只读投影
// 红线: 引擎只读这些记录，不负责其生命周期
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::types::{ReplacementStatus, DEFAULT_LAYER_CODE};

// ==========================================
// 复合键
// ==========================================

/// 核算分组键 (customer, sku, week)
///
/// 替代字符串拼接键，客户名中出现分隔符也不会冲突。
/// 字段顺序即排序顺序（BTreeMap 遍历确定性依赖于此）。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKey {
    pub customer_name: String,
    pub sku: String,
    pub week: i32,
}

impl GroupKey {
    pub fn new(customer_name: impl Into<String>, sku: impl Into<String>, week: i32) -> Self {
        Self {
            customer_name: customer_name.into(),
            sku: sku.into(),
            week,
        }
    }
}

/// 组件层键 (sku, layer_code)，不良净额按此聚合
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayerKey {
    pub sku: String,
    pub layer_code: String,
}

impl LayerKey {
    pub fn new(sku: impl Into<String>, layer_code: impl Into<String>) -> Self {
        Self {
            sku: sku.into(),
            layer_code: layer_code.into(),
        }
    }
}

/// 空白层代码归一为 MAIN
pub fn normalize_layer_code(layer_code: Option<&str>) -> String {
    match layer_code.map(str::trim) {
        Some(code) if !code.is_empty() => code.to_string(),
        _ => DEFAULT_LAYER_CODE.to_string(),
    }
}

// ==========================================
// PlannedDemand - 计划需求
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedDemand {
    pub customer_name: String,
    pub sku: String,
    pub week: i32,
    pub planned_qty: i64,
}

impl PlannedDemand {
    pub fn key(&self) -> GroupKey {
        GroupKey::new(self.customer_name.clone(), self.sku.clone(), self.week)
    }
}

// ==========================================
// CuttingEntry - 裁切记录
// ==========================================

/// 固化标记
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CuringMarker {
    pub is_pending: bool,
    pub due_at: Option<NaiveDateTime>,
}

/// 返工标记
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReworkMarker {
    pub is_active: bool,
    pub total_units: i64,
    pub remaining_units: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CuttingEntry {
    pub entry_id: i64,
    pub sku: String,
    pub week: i32,
    pub layer_code: Option<String>,   // NULL → MAIN
    pub quantity: Option<i64>,        // NULL → 0
    pub curing: Option<CuringMarker>,
    pub rework: Option<ReworkMarker>,
}

impl CuttingEntry {
    pub fn layer_code(&self) -> String {
        normalize_layer_code(self.layer_code.as_deref())
    }
}

// ==========================================
// LayerDefinition - 组件层定义
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDefinition {
    pub sku: String,
    pub layer_code: String,
    pub layer_index: Option<i32>, // NULL → 1
}

// ==========================================
// BondingConsumption - 贴合消耗聚合
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BondingConsumption {
    pub sku: String,
    pub week: i32,
    pub layer_code: Option<String>, // NULL 表示整品贴合，不指定层
    pub quantity: i64,
}

// ==========================================
// RejectRecord - 贴合不良
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectRecord {
    pub reject_id: i64,
    pub sku: String,
    pub layer_code: Option<String>,
    pub ng_quantity: Option<i64>,
    pub status: String,
}

impl RejectRecord {
    pub fn is_cancelled(&self) -> bool {
        self.status.trim().eq_ignore_ascii_case("CANCELLED")
    }

    pub fn layer_key(&self) -> LayerKey {
        LayerKey::new(self.sku.clone(), normalize_layer_code(self.layer_code.as_deref()))
    }
}

// ==========================================
// ReplacementRecord - 补料申请
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplacementRecord {
    pub replacement_id: i64,
    pub bonding_reject_id: i64,
    pub processed_qty: Option<i64>,
    pub status: ReplacementStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_key_no_separator_collision() {
        // 字符串拼接 "a|b" + "c" 与 "a" + "b|c" 会冲突，复合键不会
        let k1 = GroupKey::new("a|b", "c", 1);
        let k2 = GroupKey::new("a", "b|c", 1);
        assert_ne!(k1, k2);
    }

    #[test]
    fn test_normalize_layer_code() {
        assert_eq!(normalize_layer_code(None), "MAIN");
        assert_eq!(normalize_layer_code(Some("  ")), "MAIN");
        assert_eq!(normalize_layer_code(Some(" L2 ")), "L2");
    }

    #[test]
    fn test_reject_cancelled() {
        let reject = RejectRecord {
            reject_id: 1,
            sku: "SKU-1".to_string(),
            layer_code: None,
            ng_quantity: Some(5),
            status: "cancelled".to_string(),
        };
        assert!(reject.is_cancelled());
        assert_eq!(reject.layer_key(), LayerKey::new("SKU-1", "MAIN"));
    }
}
