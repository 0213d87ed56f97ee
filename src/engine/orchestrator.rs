// ==========================================
// 裁切贴合可投产量核算系统 - 核算编排
// ==========================================
// 流程:
//   需求加载 ┐
//            ├→ 台账合并(含净量) → 闸门分类/可投产聚合 → 排序 → 报告
//   不良净额 ┘                    ↘ 不良汇总 ↗
// 约束: 每次调用从快照全量重算，不保留跨次状态
// ==========================================

use chrono::NaiveDateTime;

use crate::domain::{RejectSummaryRow, WorkableGroup};
use crate::engine::demand::DemandLoader;
use crate::engine::error::EngineResult;
use crate::engine::ledger::{build_layer_index, LedgerJoiner};
use crate::engine::net_quantity::NetQuantityCalculator;
use crate::engine::presenter::{ReportPresenter, WorkableReport};
use crate::engine::reject_summary::RejectSummaryBuilder;
use crate::engine::source::{ProductionSource, SourceSnapshot};
use crate::engine::workable::WorkableAggregator;
use crate::perf::PerfGuard;

/// 报告时间戳格式
pub const REPORT_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// 排序后的核算结果（展示转换前）
#[derive(Debug, Clone, PartialEq)]
pub struct WorkableComputation {
    pub groups: Vec<WorkableGroup>,
    pub rejects: Vec<RejectSummaryRow>,
}

// ==========================================
// WorkableEngine - 可投产量核算引擎
// ==========================================
pub struct WorkableEngine {
    demand_loader: DemandLoader,
    net_calculator: NetQuantityCalculator,
    joiner: LedgerJoiner,
    aggregator: WorkableAggregator,
    reject_builder: RejectSummaryBuilder,
    presenter: ReportPresenter,
}

impl WorkableEngine {
    pub fn new() -> Self {
        Self {
            demand_loader: DemandLoader::new(),
            net_calculator: NetQuantityCalculator::new(),
            joiner: LedgerJoiner::new(),
            aggregator: WorkableAggregator::new(),
            reject_builder: RejectSummaryBuilder::new(),
            presenter: ReportPresenter::new(),
        }
    }

    /// 从快照计算（纯函数，`now` 只影响固化备注）
    pub fn compute(&self, snapshot: &SourceSnapshot, now: NaiveDateTime) -> WorkableComputation {
        let demand = self.demand_loader.load(&snapshot.planned_demand);
        let net_rejects = self
            .net_calculator
            .aggregate_rejects(&snapshot.rejects, &snapshot.replacements);
        let layer_index = build_layer_index(&snapshot.layer_definitions);

        let ledger = self.joiner.join(
            &demand,
            &snapshot.cutting_entries,
            &layer_index,
            &net_rejects,
            &snapshot.bonding_consumption,
        );

        let mut groups: Vec<WorkableGroup> = ledger
            .iter()
            .map(|(key, rows)| {
                let planned = demand.get(key).copied().unwrap_or(0);
                self.aggregator.aggregate(key, planned, rows, now)
            })
            .collect();
        self.presenter.sort_groups(&mut groups);

        let mut rejects = self
            .reject_builder
            .build(&net_rejects, &layer_index, &groups);
        self.presenter.sort_rejects(&mut rejects);

        let overflow_groups = groups.iter().filter(|g| g.layers.overflow).count();
        if overflow_groups > 0 {
            tracing::warn!(overflow_groups, "存在层序号超过展示上限的分组，已并入最后一层");
        }

        tracing::debug!(
            demand_groups = demand.len(),
            ledger_groups = ledger.len(),
            reject_rows = rejects.len(),
            "可投产核算完成"
        );

        WorkableComputation { groups, rejects }
    }

    /// 核算结果转换为展示报告
    pub fn present(&self, computation: &WorkableComputation, now: NaiveDateTime) -> WorkableReport {
        self.presenter.present(
            now.format(REPORT_TIMESTAMP_FORMAT).to_string(),
            &computation.groups,
            &computation.rejects,
        )
    }

    /// 从快照生成报告
    pub fn report(&self, snapshot: &SourceSnapshot, now: NaiveDateTime) -> WorkableReport {
        self.present(&self.compute(snapshot, now), now)
    }

    /// 读取数据源并计算（展示转换前）
    ///
    /// # 错误
    /// - 数据源读取失败时返回 `EngineError::Repository`，不产生部分结果
    pub fn compute_from(
        &self,
        source: &dyn ProductionSource,
        now: NaiveDateTime,
    ) -> EngineResult<WorkableComputation> {
        let _perf = PerfGuard::new("workable_compute");
        let snapshot = source.load_snapshot()?;
        Ok(self.compute(&snapshot, now))
    }

    /// 读取数据源并生成报告
    pub fn run(&self, source: &dyn ProductionSource, now: NaiveDateTime) -> EngineResult<WorkableReport> {
        let computation = self.compute_from(source, now)?;
        Ok(self.present(&computation, now))
    }
}

impl Default for WorkableEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CuttingEntry, PlannedDemand};
    use crate::engine::error::EngineError;
    use crate::repository::error::{RepositoryError, RepositoryResult};
    use chrono::NaiveDate;

    struct BrokenSource;

    impl ProductionSource for BrokenSource {
        fn load_snapshot(&self) -> RepositoryResult<SourceSnapshot> {
            Err(RepositoryError::DatabaseConnectionError("offline".to_string()))
        }
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 16)
            .unwrap()
            .and_hms_opt(9, 15, 0)
            .unwrap()
    }

    #[test]
    fn test_run_propagates_source_failure() {
        let err = WorkableEngine::new().run(&BrokenSource, now()).unwrap_err();
        assert!(matches!(err, EngineError::Repository(_)));
    }

    #[test]
    fn test_report_timestamp_uses_explicit_now() {
        let snapshot = SourceSnapshot {
            planned_demand: vec![PlannedDemand {
                customer_name: "Acme".to_string(),
                sku: "SKU-1".to_string(),
                week: 5,
                planned_qty: 10,
            }],
            cutting_entries: vec![CuttingEntry {
                entry_id: 1,
                sku: "SKU-1".to_string(),
                week: 5,
                layer_code: None,
                quantity: Some(10),
                curing: None,
                rework: None,
            }],
            ..SourceSnapshot::default()
        };

        let report = WorkableEngine::new().run(&snapshot, now()).unwrap();
        assert_eq!(report.timestamp, "2026-10-16T09:15:00");
        assert_eq!(report.summary.len(), 1);
        assert_eq!(report.detail.len(), 1);
        assert_eq!(report.reject.len(), 1);
    }
}
