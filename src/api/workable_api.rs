// ==========================================
// 裁切贴合可投产量核算系统 - 可投产量 API
// ==========================================
// 职责: 按需拉取核算报告（全量重算），支持周/客户视图过滤
// 约束: 过滤只作用于输出，不影响核算本身
// 架构: HTTP 层 → WorkableApi → WorkableEngine → ProductionSource
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::engine::orchestrator::{WorkableComputation, WorkableEngine};
use crate::engine::presenter::WorkableReport;
use crate::engine::source::ProductionSource;

/// ISO 周号范围
pub const MIN_WEEK: i32 = 1;
pub const MAX_WEEK: i32 = 53;

/// 报告视图过滤条件
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportFilter {
    pub week: Option<i32>,
    /// 大小写不敏感匹配
    pub customer: Option<String>,
}

impl ReportFilter {
    pub fn is_empty(&self) -> bool {
        self.week.is_none() && self.customer.is_none()
    }

    /// 参数校验
    pub fn validate(&self) -> ApiResult<()> {
        if let Some(week) = self.week {
            if !(MIN_WEEK..=MAX_WEEK).contains(&week) {
                return Err(ApiError::InvalidInput(format!(
                    "周号必须在 {}..={} 之间: {}",
                    MIN_WEEK, MAX_WEEK, week
                )));
            }
        }
        if let Some(customer) = &self.customer {
            if customer.trim().is_empty() {
                return Err(ApiError::InvalidInput("客户名称不能为空".to_string()));
            }
        }
        Ok(())
    }

    fn matches(&self, week: Option<i32>, customer: Option<&str>) -> bool {
        let week_ok = match self.week {
            Some(w) => week == Some(w),
            None => true,
        };
        let customer_ok = match &self.customer {
            Some(wanted) => customer
                .map(|c| fold_customer(c) == fold_customer(wanted))
                .unwrap_or(false),
            None => true,
        };
        week_ok && customer_ok
    }

    /// 过滤核算结果（展示转换前）
    pub fn apply(&self, mut computation: WorkableComputation) -> WorkableComputation {
        if self.is_empty() {
            return computation;
        }

        computation
            .groups
            .retain(|g| self.matches(Some(g.key.week), Some(g.key.customer_name.as_str())));
        // 无对应分组的不良行（周/客户为空）在过滤时不保留
        computation
            .rejects
            .retain(|r| self.matches(r.week, r.customer_name.as_deref()));

        computation
    }
}

/// 客户名称比较键，与报告排序使用同一 Unicode 小写折叠
fn fold_customer(name: &str) -> String {
    name.trim().to_lowercase()
}

// ==========================================
// WorkableApi - 可投产量 API
// ==========================================
pub struct WorkableApi {
    source: Arc<dyn ProductionSource>,
    engine: Arc<WorkableEngine>,
}

impl WorkableApi {
    /// 创建新的 WorkableApi 实例
    ///
    /// # 参数
    /// - source: 源数据读取（SQLite 仓储或内存快照）
    /// - engine: 核算引擎
    pub fn new(source: Arc<dyn ProductionSource>, engine: Arc<WorkableEngine>) -> Self {
        Self { source, engine }
    }

    /// 全量核算报告（推送通道使用）
    pub fn compute_report(&self, now: NaiveDateTime) -> ApiResult<WorkableReport> {
        Ok(self.engine.run(self.source.as_ref(), now)?)
    }

    /// 拉取核算报告
    ///
    /// # 参数
    /// - filter: 周/客户过滤（可选）
    /// - now: 核算时刻
    ///
    /// # 返回
    /// - Ok(WorkableReport): 与推送通道同结构
    /// - Err(ApiError): 参数错误或源数据读取失败
    pub fn get_live_report(
        &self,
        filter: &ReportFilter,
        now: NaiveDateTime,
    ) -> ApiResult<WorkableReport> {
        filter.validate()?;

        let computation = self
            .engine
            .compute_from(self.source.as_ref(), now)
            .map_err(|e| {
                tracing::error!(error = %e, "拉取可投产报告失败");
                ApiError::from(e)
            })?;

        Ok(self.engine.present(&filter.apply(computation), now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CuttingEntry, PlannedDemand};
    use crate::engine::source::SourceSnapshot;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 16)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn snapshot() -> SourceSnapshot {
        let demand = |customer: &str, week: i32| PlannedDemand {
            customer_name: customer.to_string(),
            sku: "SKU-1".to_string(),
            week,
            planned_qty: 50,
        };
        let cut = |id: i64, week: i32| CuttingEntry {
            entry_id: id,
            sku: "SKU-1".to_string(),
            week,
            layer_code: None,
            quantity: Some(20),
            curing: None,
            rework: None,
        };
        SourceSnapshot {
            planned_demand: vec![demand("Acme", 41), demand("Beta", 41), demand("Acme", 42)],
            cutting_entries: vec![cut(1, 41), cut(2, 42)],
            ..SourceSnapshot::default()
        }
    }

    fn api() -> WorkableApi {
        WorkableApi::new(Arc::new(snapshot()), Arc::new(WorkableEngine::new()))
    }

    #[test]
    fn test_unfiltered_report_contains_all_groups() {
        let report = api().get_live_report(&ReportFilter::default(), now()).unwrap();
        assert_eq!(report.summary.len(), 3);
    }

    #[test]
    fn test_filter_by_week_and_customer() {
        let filter = ReportFilter {
            week: Some(41),
            customer: Some("acme".to_string()),
        };
        let report = api().get_live_report(&filter, now()).unwrap();

        assert_eq!(report.summary.len(), 1);
        assert_eq!(report.summary[0].customer, "Acme");
        assert_eq!(report.summary[0].week, 41);
        assert_eq!(report.detail.len(), 1);
        assert_eq!(report.reject.len(), 1);
    }

    #[test]
    fn test_customer_filter_folds_non_ascii_case() {
        let mut snapshot = snapshot();
        snapshot.planned_demand[1].customer_name = "Ärzte Möbel".to_string();
        let api = WorkableApi::new(Arc::new(snapshot), Arc::new(WorkableEngine::new()));

        let filter = ReportFilter {
            week: None,
            customer: Some(" ärzte möbel ".to_string()),
        };
        let report = api.get_live_report(&filter, now()).unwrap();

        assert_eq!(report.summary.len(), 1);
        assert_eq!(report.summary[0].customer, "Ärzte Möbel");
    }

    #[test]
    fn test_filter_drops_orphan_rejects_and_keeps_matching_ones() {
        use crate::domain::{RejectSummaryRow, WorkableStatus};

        let reject = |customer: Option<&str>, week: Option<i32>| RejectSummaryRow {
            customer_name: customer.map(str::to_string),
            sku: "SKU-1".to_string(),
            week,
            layers: Default::default(),
            status: week.map(|_| WorkableStatus::Running),
        };
        let computation = WorkableComputation {
            groups: Vec::new(),
            rejects: vec![
                reject(Some("Acme"), Some(41)),
                reject(Some("Acme"), Some(42)),
                reject(None, None),
            ],
        };

        let by_week = ReportFilter {
            week: Some(41),
            customer: None,
        };
        let kept = by_week.apply(computation.clone()).rejects;
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].week, Some(41));

        let by_customer = ReportFilter {
            week: None,
            customer: Some("ACME".to_string()),
        };
        assert_eq!(by_customer.apply(computation.clone()).rejects.len(), 2);

        // 无过滤条件时原样返回
        assert_eq!(ReportFilter::default().apply(computation.clone()), computation);
    }

    #[test]
    fn test_invalid_filter_rejected() {
        let bad_week = ReportFilter {
            week: Some(54),
            customer: None,
        };
        assert!(matches!(
            api().get_live_report(&bad_week, now()),
            Err(ApiError::InvalidInput(_))
        ));

        let blank_customer = ReportFilter {
            week: None,
            customer: Some("  ".to_string()),
        };
        assert!(matches!(
            api().get_live_report(&blank_customer, now()),
            Err(ApiError::InvalidInput(_))
        ));
    }
}
