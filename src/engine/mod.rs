// ==========================================
// 裁切贴合可投产量核算系统 - 引擎层
// ==========================================
// 职责: 可投产量核算流水线，不拼 SQL
// 红线: Engine 只读快照；非负约束集中在 quantity 模块
// ==========================================

pub mod demand;
pub mod error;
pub mod gate;
pub mod ledger;
pub mod net_quantity;
pub mod orchestrator;
pub mod presenter;
pub mod quantity;
pub mod reject_summary;
pub mod source;
pub mod workable;

// 重导出核心引擎
pub use demand::{DemandLoader, DemandMap};
pub use error::{EngineError, EngineResult};
pub use gate::{GateClassification, GateClassifier};
pub use ledger::{build_layer_index, GroupLedger, LayerIndexMap, LedgerJoiner};
pub use net_quantity::{NetQuantityCalculator, NetRejectMap};
pub use orchestrator::{WorkableComputation, WorkableEngine};
pub use presenter::{
    display_qty, status_priority, DetailRow, RejectRow, ReportPresenter, SummaryRow,
    WorkableReport,
};
pub use quantity::clamp_non_negative;
pub use reject_summary::RejectSummaryBuilder;
pub use source::{ProductionSource, SourceSnapshot};
pub use workable::WorkableAggregator;
