// ==========================================
// 裁切贴合可投产量核算系统 - 领域类型定义
// ==========================================
// 职责: 核算状态、不良状态、补料状态等枚举
// 序列化格式: 状态标签与前端展示一致
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// 默认组件层代码（SKU 无子层时使用）
pub const DEFAULT_LAYER_CODE: &str = "MAIN";

/// 展示网格的最大层位（1..=4）
pub const LAYER_DISPLAY_SLOTS: usize = 4;

// ==========================================
// 可投产状态 (Workable Status)
// ==========================================
// 顺序: 与驾驶舱排序优先级一致
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkableStatus {
    #[serde(rename = "Running")]
    Running, // 裁切进行中
    #[serde(rename = "Halted")]
    Halted, // 固化/返工阻断
    #[serde(rename = "Completed")]
    Completed, // 贴合已满足订单
    #[serde(rename = "Not Started")]
    NotStarted, // 尚未裁切
}

impl WorkableStatus {
    /// 展示标签
    pub fn label(&self) -> &'static str {
        match self {
            WorkableStatus::Running => "Running",
            WorkableStatus::Halted => "Halted",
            WorkableStatus::Completed => "Completed",
            WorkableStatus::NotStarted => "Not Started",
        }
    }

    /// 从展示标签解析（大小写不敏感）
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "running" => Some(WorkableStatus::Running),
            "halted" => Some(WorkableStatus::Halted),
            "completed" => Some(WorkableStatus::Completed),
            "not started" => Some(WorkableStatus::NotStarted),
            _ => None,
        }
    }
}

impl fmt::Display for WorkableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ==========================================
// 补料状态 (Replacement Status)
// ==========================================
// 只有 IN_PROGRESS / COMPLETED 的补料可抵扣不良
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReplacementStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl ReplacementStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ReplacementStatus::Pending => "PENDING",
            ReplacementStatus::InProgress => "IN_PROGRESS",
            ReplacementStatus::Completed => "COMPLETED",
            ReplacementStatus::Cancelled => "CANCELLED",
        }
    }

    /// 未知状态按 PENDING 处理（不参与抵扣）
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "IN_PROGRESS" => ReplacementStatus::InProgress,
            "COMPLETED" => ReplacementStatus::Completed,
            "CANCELLED" => ReplacementStatus::Cancelled,
            _ => ReplacementStatus::Pending,
        }
    }

    /// 是否计入不良抵扣
    pub fn offsets_reject(&self) -> bool {
        matches!(
            self,
            ReplacementStatus::InProgress | ReplacementStatus::Completed
        )
    }

    /// 是否仍在处理中（未完成且未取消）
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            ReplacementStatus::Pending | ReplacementStatus::InProgress
        )
    }
}

impl fmt::Display for ReplacementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
