// ==========================================
// 裁切贴合可投产量核算系统 - 领域模型层
// ==========================================
// 职责: 定义源数据投影、核算结果实体与状态类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod production;
pub mod types;
pub mod workable;

// 重导出核心类型
pub use production::{
    normalize_layer_code, BondingConsumption, CuringMarker, CuttingEntry, GroupKey, LayerDefinition,
    LayerKey, PlannedDemand, RejectRecord, ReplacementRecord, ReworkMarker,
};
pub use types::{ReplacementStatus, WorkableStatus, DEFAULT_LAYER_CODE, LAYER_DISPLAY_SLOTS};
pub use workable::{
    CuringGate, LayerBreakdown, LedgerEntry, NetReject, RejectLayerFigures, RejectSummaryRow,
    ReworkGate, WorkableGroup,
};
