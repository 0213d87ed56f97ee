// ==========================================
// 生产台账仓储集成测试
// ==========================================
// 覆盖: SQL 投影（需求汇总/取消订单/补料状态/空层代码）、
//       缺表报错、仓储直连引擎出报告
// ==========================================


use chrono::Duration;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

use test_helpers::{create_test_db, fixed_now, SourceSeeder};
use workable_ledger::domain::ReplacementStatus;
use workable_ledger::engine::{EngineError, WorkableEngine};
use workable_ledger::repository::{ProductionLedgerRepository, RepositoryError};

fn open(db_path: &str) -> Connection {
    Connection::open(db_path).unwrap()
}

#[test]
fn test_planned_demand_sums_items_and_skips_cancelled_orders() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let conn = open(&db_path);
    SourceSeeder::new(&conn)
        .customer(1, "Acme")
        .customer(2, "Cedar|Co")
        .order(1, 1, 5, "OPEN")
        .order(2, 1, 5, "OPEN")
        .order(3, 2, 5, "CANCELLED")
        .order(4, 2, 6, "OPEN")
        .item(1, "SOFA-3S", Some(120))
        .item(2, "SOFA-3S", Some(30))
        .item(3, "SOFA-3S", Some(99))
        .item(4, "OTTOMAN", None);

    let repo = ProductionLedgerRepository::new(&db_path).unwrap();
    let snapshot = repo.read_snapshot().unwrap();

    assert_eq!(snapshot.planned_demand.len(), 2);
    let acme = snapshot
        .planned_demand
        .iter()
        .find(|d| d.customer_name == "Acme")
        .unwrap();
    assert_eq!(acme.sku, "SOFA-3S");
    assert_eq!(acme.week, 5);
    assert_eq!(acme.planned_qty, 150);

    // 空计划数量按 0
    let cedar = snapshot
        .planned_demand
        .iter()
        .find(|d| d.customer_name == "Cedar|Co")
        .unwrap();
    assert_eq!(cedar.sku, "OTTOMAN");
    assert_eq!(cedar.planned_qty, 0);
}

#[test]
fn test_cutting_markers_are_projected() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let conn = open(&db_path);
    SourceSeeder::new(&conn)
        .cutting("SKU-1", 5, None, Some(40))
        .curing_cutting("SKU-1", 5, "FOAM", 60, "2026-10-16 13:00:00")
        .rework_cutting("SKU-1", 5, "MAIN", 30, 10, 4);

    let repo = ProductionLedgerRepository::new(&db_path).unwrap();
    let snapshot = repo.read_snapshot().unwrap();
    let entries = &snapshot.cutting_entries;
    assert_eq!(entries.len(), 3);

    assert_eq!(entries[0].layer_code(), "MAIN");
    assert!(entries[0].curing.as_ref().map_or(true, |c| !c.is_pending));
    assert!(entries[0].rework.as_ref().map_or(true, |r| !r.is_active));

    let curing = entries[1].curing.as_ref().unwrap();
    assert!(curing.is_pending);
    assert_eq!(curing.due_at, Some(fixed_now() + Duration::hours(5)));

    let rework = entries[2].rework.as_ref().unwrap();
    assert!(rework.is_active);
    assert_eq!(rework.total_units, 10);
    assert_eq!(rework.remaining_units, 4);
}

#[test]
fn test_bonding_groups_blank_layer_with_null() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let conn = open(&db_path);
    SourceSeeder::new(&conn)
        .bonding("SKU-1", 5, None, 10)
        .bonding("SKU-1", 5, Some("  "), 5)
        .bonding("SKU-1", 5, Some("FRAME"), 7);

    let repo = ProductionLedgerRepository::new(&db_path).unwrap();
    let snapshot = repo.read_snapshot().unwrap();

    assert_eq!(snapshot.bonding_consumption.len(), 2);
    let whole = snapshot
        .bonding_consumption
        .iter()
        .find(|b| b.layer_code.is_none())
        .unwrap();
    assert_eq!(whole.quantity, 15);
    let frame = snapshot
        .bonding_consumption
        .iter()
        .find(|b| b.layer_code.as_deref() == Some("FRAME"))
        .unwrap();
    assert_eq!(frame.quantity, 7);
}

#[test]
fn test_replacement_status_parsing() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let conn = open(&db_path);
    SourceSeeder::new(&conn)
        .reject(1, "SKU-1", Some("MAIN"), 12, "OPEN")
        .replacement(1, Some(4), "IN_PROGRESS")
        .replacement(1, Some(8), "completed")
        .replacement(1, None, "ARCHIVED");

    let repo = ProductionLedgerRepository::new(&db_path).unwrap();
    let snapshot = repo.read_snapshot().unwrap();

    let statuses: Vec<ReplacementStatus> = snapshot.replacements.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![
            ReplacementStatus::InProgress,
            ReplacementStatus::Completed,
            ReplacementStatus::Pending,
        ]
    );
    assert_eq!(snapshot.replacements[2].processed_qty, None);
}

#[test]
fn test_missing_source_table_is_reported() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let conn = open(&db_path);
    conn.execute_batch("DROP TABLE bonding_entry").unwrap();

    let repo = ProductionLedgerRepository::new(&db_path).unwrap();
    match repo.read_snapshot() {
        Err(RepositoryError::MissingSourceTable { table }) => assert_eq!(table, "bonding_entry"),
        other => panic!("unexpected result: {:?}", other.map(|s| s.cutting_entries.len())),
    }

    let err = WorkableEngine::new().run(&repo, fixed_now()).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Repository(RepositoryError::MissingSourceTable { .. })
    ));
}

#[test]
fn test_engine_runs_against_repository() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let conn = open(&db_path);
    SourceSeeder::new(&conn)
        .customer(1, "Acme")
        .order(1, 1, 5, "OPEN")
        .order(2, 1, 5, "CANCELLED")
        .item(1, "SOFA-3S", Some(100))
        .item(2, "SOFA-3S", Some(500))
        .layer("SOFA-3S", "FRAME", Some(1))
        .layer("SOFA-3S", "COVER", None)
        .cutting("SOFA-3S", 5, Some("FRAME"), Some(90))
        .cutting("SOFA-3S", 5, Some("COVER"), Some(70))
        .bonding("SOFA-3S", 5, Some("FRAME"), 20)
        .reject(1, "SOFA-3S", Some("COVER"), 12, "OPEN")
        .reject(2, "SOFA-3S", Some("FRAME"), 50, "CANCELLED")
        .replacement(1, Some(2), "COMPLETED")
        .replacement(2, Some(50), "COMPLETED");

    let repo = ProductionLedgerRepository::from_connection(Arc::new(Mutex::new(conn)));
    let report = WorkableEngine::new().run(&repo, fixed_now()).unwrap();

    assert_eq!(report.summary.len(), 1);
    let row = &report.summary[0];
    assert_eq!(row.customer, "Acme");
    assert_eq!(row.quantity_order, "100");
    assert_eq!(row.bonding, "20");
    assert_eq!(row.remaining_to_produce, "80");
    // COVER 净量 70 - (12 - 2) = 60，FRAME 90；瓶颈 60 - 贴合 20
    assert_eq!(row.workable, "40");
    assert_eq!(row.status, "Running");

    // COVER 层序号为空，按第 1 层
    let detail = &report.detail[0];
    assert_eq!(detail.layer_1, "40");

    let reject = &report.reject[0];
    assert_eq!(reject.layer_1_ng, "12");
    assert_eq!(reject.layer_1_replacement, "2");
}
