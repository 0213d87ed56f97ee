// ==========================================
// 裁切贴合可投产量核算系统 - 生产台账只读仓储
// ==========================================
// 红线: Repository 不含业务逻辑，只做读取与分组求和
// 约束: 只读；所有查询在同一读事务内完成，保证快照一致
// ==========================================

use chrono::{DateTime, NaiveDateTime};
use rusqlite::{Connection, Row};
use std::sync::{Arc, Mutex};

use crate::db::open_sqlite_connection;
use crate::domain::{
    BondingConsumption, CuringMarker, CuttingEntry, LayerDefinition, PlannedDemand, RejectRecord,
    ReplacementRecord, ReplacementStatus, ReworkMarker,
};
use crate::engine::source::{ProductionSource, SourceSnapshot};
use crate::perf::{install_sqlite_tracing, PerfGuard};
use crate::repository::error::{RepositoryError, RepositoryResult};

// ==========================================
// ProductionLedgerRepository - 生产台账仓储
// ==========================================

/// 生产台账仓储
/// 职责: 读取订单/裁切/组件层/贴合/不良/补料投影
pub struct ProductionLedgerRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProductionLedgerRepository {
    /// 创建新的仓储实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let mut conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        install_sqlite_tracing(&mut conn);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 快照读取
    // ==========================================

    /// 在一个读事务内读取全部源数据
    pub fn read_snapshot(&self) -> RepositoryResult<SourceSnapshot> {
        let _perf = PerfGuard::new("load_source_snapshot");
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let snapshot = SourceSnapshot {
            planned_demand: Self::query_planned_demand(&tx)?,
            cutting_entries: Self::query_cutting_entries(&tx)?,
            layer_definitions: Self::query_layer_definitions(&tx)?,
            bonding_consumption: Self::query_bonding_consumption(&tx)?,
            rejects: Self::query_rejects(&tx)?,
            replacements: Self::query_replacements(&tx)?,
        };

        tx.commit()?;

        tracing::debug!(
            demand = snapshot.planned_demand.len(),
            cutting = snapshot.cutting_entries.len(),
            layers = snapshot.layer_definitions.len(),
            bonding = snapshot.bonding_consumption.len(),
            rejects = snapshot.rejects.len(),
            replacements = snapshot.replacements.len(),
            "源数据快照读取完成"
        );

        Ok(snapshot)
    }

    /// 计划需求：按 (客户, SKU, 周) 汇总，已取消订单不计
    pub fn query_planned_demand(conn: &Connection) -> RepositoryResult<Vec<PlannedDemand>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT
                c.customer_name,
                oi.sku,
                po.week_number,
                COALESCE(SUM(oi.planned_qty), 0) AS planned_qty
            FROM order_item oi
            JOIN production_order po ON po.order_id = oi.order_id
            JOIN customer c ON c.customer_id = po.customer_id
            WHERE UPPER(COALESCE(po.status, '')) != 'CANCELLED'
            GROUP BY c.customer_name, oi.sku, po.week_number
            ORDER BY c.customer_name, oi.sku, po.week_number
            "#,
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok(PlannedDemand {
                    customer_name: row.get(0)?,
                    sku: row.get(1)?,
                    week: row.get(2)?,
                    planned_qty: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }

    /// 裁切记录（原始行，重复层由引擎归并）
    pub fn query_cutting_entries(conn: &Connection) -> RepositoryResult<Vec<CuttingEntry>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT
                entry_id, sku, week_number, layer_code, quantity_produced,
                is_curing_pending, curing_due_at,
                is_rework_active, rework_total_qty, rework_remaining_qty
            FROM cutting_entry
            ORDER BY entry_id
            "#,
        )?;

        let rows = stmt
            .query_map([], map_cutting_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }

    /// 组件层定义
    pub fn query_layer_definitions(conn: &Connection) -> RepositoryResult<Vec<LayerDefinition>> {
        let mut stmt = conn.prepare(
            "SELECT sku, layer_code, layer_index FROM assembly_layer ORDER BY sku, layer_code",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok(LayerDefinition {
                    sku: row.get(0)?,
                    layer_code: row.get(1)?,
                    layer_index: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }

    /// 贴合消耗：按 (SKU, 周, 层) 汇总，空层代码视为整品贴合
    pub fn query_bonding_consumption(
        conn: &Connection,
    ) -> RepositoryResult<Vec<BondingConsumption>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT
                sku,
                week_number,
                NULLIF(TRIM(layer_code), '') AS layer_code,
                COALESCE(SUM(quantity_consumed), 0) AS quantity
            FROM bonding_entry
            GROUP BY sku, week_number, NULLIF(TRIM(layer_code), '')
            ORDER BY sku, week_number, layer_code
            "#,
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok(BondingConsumption {
                    sku: row.get(0)?,
                    week: row.get(1)?,
                    layer_code: row.get(2)?,
                    quantity: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }

    /// 贴合不良（含已取消，由引擎过滤）
    pub fn query_rejects(conn: &Connection) -> RepositoryResult<Vec<RejectRecord>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT reject_id, sku, layer_code, ng_quantity, COALESCE(status, '')
            FROM bonding_reject
            ORDER BY reject_id
            "#,
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok(RejectRecord {
                    reject_id: row.get(0)?,
                    sku: row.get(1)?,
                    layer_code: row.get(2)?,
                    ng_quantity: row.get(3)?,
                    status: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }

    /// 补料申请
    pub fn query_replacements(conn: &Connection) -> RepositoryResult<Vec<ReplacementRecord>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT replacement_id, bonding_reject_id, processed_qty, COALESCE(status, '')
            FROM replacement_request
            ORDER BY replacement_id
            "#,
        )?;

        let rows = stmt
            .query_map([], |row| {
                let status: String = row.get(3)?;
                Ok(ReplacementRecord {
                    replacement_id: row.get(0)?,
                    bonding_reject_id: row.get(1)?,
                    processed_qty: row.get(2)?,
                    status: ReplacementStatus::from_str(&status),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }
}

impl ProductionSource for ProductionLedgerRepository {
    fn load_snapshot(&self) -> RepositoryResult<SourceSnapshot> {
        self.read_snapshot()
    }
}

// ==========================================
// 行映射
// ==========================================

fn map_cutting_entry(row: &Row<'_>) -> rusqlite::Result<CuttingEntry> {
    let entry_id: i64 = row.get(0)?;
    let curing_pending: Option<i64> = row.get(5)?;
    let curing_due_raw: Option<String> = row.get(6)?;
    let rework_active: Option<i64> = row.get(7)?;
    let rework_total: Option<i64> = row.get(8)?;
    let rework_remaining: Option<i64> = row.get(9)?;

    // 固化/返工标记缺失时视为无标记
    let curing = if curing_pending.is_none() && curing_due_raw.is_none() {
        None
    } else {
        Some(CuringMarker {
            is_pending: curing_pending.unwrap_or(0) != 0,
            due_at: curing_due_raw
                .as_deref()
                .and_then(|raw| parse_timestamp(entry_id, raw)),
        })
    };

    let rework = if rework_active.is_none() && rework_total.is_none() && rework_remaining.is_none()
    {
        None
    } else {
        Some(ReworkMarker {
            is_active: rework_active.unwrap_or(0) != 0,
            total_units: rework_total.unwrap_or(0),
            remaining_units: rework_remaining.unwrap_or(0),
        })
    };

    Ok(CuttingEntry {
        entry_id,
        sku: row.get(1)?,
        week: row.get(2)?,
        layer_code: row.get(3)?,
        quantity: row.get(4)?,
        curing,
        rework,
    })
}

/// 解析固化到期时间；无法解析时记录告警并按缺失处理
fn parse_timestamp(entry_id: i64, raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_local());
    }

    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt);
        }
    }

    tracing::warn!(entry_id, raw = %trimmed, "curing_due_at 无法解析，按缺失处理");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp(1, "2026-10-16 08:30:00").is_some());
        assert!(parse_timestamp(1, "2026-10-16T08:30:00").is_some());
        assert!(parse_timestamp(1, "2026-10-16T08:30:00+07:00").is_some());
        assert!(parse_timestamp(1, "2026-10-16 08:30").is_some());
        assert!(parse_timestamp(1, "next tuesday").is_none());
        assert!(parse_timestamp(1, "  ").is_none());
    }
}
