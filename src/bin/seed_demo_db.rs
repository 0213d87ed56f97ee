// ==========================================
// 裁切贴合可投产量核算系统 - 演示库重置与造数
// ==========================================
// 用法: seed_demo_db [db_path]
// 说明: 已存在的库先备份再删除；建表后写入覆盖各状态的演示场景，
//       并用引擎跑一次核算输出结果概览
// ==========================================

use chrono::{Datelike, Duration, Local};
use rusqlite::{params, Connection};
use std::error::Error;
use std::fs;
use std::path::Path;

use workable_ledger::app::get_default_db_path;
use workable_ledger::config::config_keys;
use workable_ledger::db::{apply_source_schema, open_sqlite_connection};
use workable_ledger::engine::WorkableEngine;
use workable_ledger::repository::ProductionLedgerRepository;

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn main() -> Result<(), Box<dyn Error>> {
    let db_path = std::env::args().nth(1).unwrap_or_else(get_default_db_path);

    backup_and_reset_db(&db_path)?;

    let conn = open_sqlite_connection(&db_path)?;
    apply_source_schema(&conn)?;

    let week = Local::now().iso_week().week() as i32;
    seed_scenario(&conn, week)?;
    print_quick_counts(&conn)?;
    drop(conn);

    run_engine_once(&db_path)?;
    Ok(())
}

fn backup_and_reset_db(db_path: &str) -> Result<(), Box<dyn Error>> {
    let path = Path::new(db_path);
    if !path.exists() {
        return Ok(());
    }

    let ts = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let backup_path = format!("{}.bak.{}", db_path, ts);
    fs::copy(path, &backup_path)?;
    fs::remove_file(path)?;

    eprintln!("Backed up {} -> {}", db_path, backup_path);
    Ok(())
}

fn seed_scenario(conn: &Connection, week: i32) -> Result<(), Box<dyn Error>> {
    let tx = conn.unchecked_transaction()?;
    let now = Local::now().naive_local();
    let next_week = week % 53 + 1;

    // 客户（含分隔符的名称）
    for (id, name) in [(1, "Acme Furniture"), (2, "Borealis Home"), (3, "Cedar|Co")] {
        tx.execute(
            "INSERT INTO customer (customer_id, customer_name) VALUES (?1, ?2)",
            params![id, name],
        )?;
    }

    // 订单（已取消订单不计需求）
    for (id, customer, wk, status) in [
        (1, 1, week, "OPEN"),
        (2, 1, next_week, "OPEN"),
        (3, 2, week, "OPEN"),
        (4, 3, week, "CANCELLED"),
        (5, 3, week, "OPEN"),
    ] {
        tx.execute(
            "INSERT INTO production_order (order_id, customer_id, week_number, status) VALUES (?1, ?2, ?3, ?4)",
            params![id, customer, wk, status],
        )?;
    }

    for (order, sku, qty) in [
        (1, "SOFA-3S", Some(120)),
        (1, "SOFA-3S", Some(30)),
        (1, "CHAIR-01", Some(80)),
        (2, "SOFA-3S", Some(60)),
        (3, "BED-QN", Some(40)),
        (3, "CHAIR-01", Some(50)),
        (4, "BED-QN", Some(99)),
        (5, "OTTOMAN", None),
    ] {
        tx.execute(
            "INSERT INTO order_item (order_id, sku, planned_qty) VALUES (?1, ?2, ?3)",
            params![order, sku, qty],
        )?;
    }

    // 组件层（BED-QN 的 HOLE 层序号超过展示上限）
    for (sku, code, index) in [
        ("SOFA-3S", "FRAME", Some(1)),
        ("SOFA-3S", "FOAM", Some(2)),
        ("SOFA-3S", "COVER", Some(3)),
        ("BED-QN", "MAIN", Some(1)),
        ("BED-QN", "HOLE", Some(5)),
        ("CHAIR-01", "MAIN", None),
    ] {
        tx.execute(
            "INSERT INTO assembly_layer (sku, layer_code, layer_index) VALUES (?1, ?2, ?3)",
            params![sku, code, index],
        )?;
    }

    // 裁切
    let curing_due = (now + Duration::hours(5)).format(TS_FORMAT).to_string();
    tx.execute(
        "INSERT INTO cutting_entry (sku, week_number, layer_code, quantity_produced) VALUES ('SOFA-3S', ?1, 'FRAME', 150)",
        params![week],
    )?;
    tx.execute(
        "INSERT INTO cutting_entry (sku, week_number, layer_code, quantity_produced, is_curing_pending, curing_due_at)
         VALUES ('SOFA-3S', ?1, 'FOAM', 90, 1, ?2)",
        params![week, curing_due],
    )?;
    tx.execute(
        "INSERT INTO cutting_entry (sku, week_number, layer_code, quantity_produced) VALUES ('SOFA-3S', ?1, 'COVER', 120)",
        params![week],
    )?;
    tx.execute(
        "INSERT INTO cutting_entry (sku, week_number, layer_code, quantity_produced) VALUES ('SOFA-3S', ?1, 'FRAME', 20)",
        params![next_week],
    )?;
    tx.execute(
        "INSERT INTO cutting_entry (sku, week_number, layer_code, quantity_produced) VALUES ('CHAIR-01', ?1, NULL, 80)",
        params![week],
    )?;
    tx.execute(
        "INSERT INTO cutting_entry (sku, week_number, layer_code, quantity_produced, is_rework_active, rework_total_qty, rework_remaining_qty)
         VALUES ('BED-QN', ?1, 'MAIN', 40, 1, 10, 4)",
        params![week],
    )?;
    tx.execute(
        "INSERT INTO cutting_entry (sku, week_number, layer_code, quantity_produced) VALUES ('BED-QN', ?1, 'HOLE', 40)",
        params![week],
    )?;
    tx.execute(
        "INSERT INTO cutting_entry (sku, week_number, layer_code, quantity_produced) VALUES ('OTTOMAN', ?1, 'MAIN', 0)",
        params![week],
    )?;

    // 贴合
    tx.execute(
        "INSERT INTO bonding_entry (sku, week_number, layer_code, quantity_consumed) VALUES ('CHAIR-01', ?1, NULL, 130)",
        params![week],
    )?;
    tx.execute(
        "INSERT INTO bonding_entry (sku, week_number, layer_code, quantity_consumed) VALUES ('SOFA-3S', ?1, 'FRAME', 20)",
        params![week],
    )?;

    // 不良与补料
    for (id, sku, code, ng, status) in [
        (1, "SOFA-3S", "COVER", 12, "OPEN"),
        (2, "SOFA-3S", "FRAME", 8, "OPEN"),
        (3, "BED-QN", "MAIN", 5, "CANCELLED"),
        (4, "TABLE-X", "MAIN", 3, "OPEN"),
    ] {
        tx.execute(
            "INSERT INTO bonding_reject (reject_id, sku, layer_code, ng_quantity, status) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, sku, code, ng, status],
        )?;
    }
    for (reject, qty, status) in [(1, 12, "COMPLETED"), (2, 0, "PENDING"), (3, 5, "COMPLETED")] {
        tx.execute(
            "INSERT INTO replacement_request (bonding_reject_id, processed_qty, status) VALUES (?1, ?2, ?3)",
            params![reject, qty, status],
        )?;
    }

    tx.execute(
        "INSERT OR REPLACE INTO config_kv (scope_id, key, value) VALUES ('global', ?1, '15')",
        params![config_keys::LIVE_PUBLISH_INTERVAL_SECS],
    )?;

    tx.commit()?;
    Ok(())
}

fn print_quick_counts(conn: &Connection) -> Result<(), Box<dyn Error>> {
    for table in [
        "customer",
        "production_order",
        "order_item",
        "assembly_layer",
        "cutting_entry",
        "bonding_entry",
        "bonding_reject",
        "replacement_request",
    ] {
        let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
        println!("{:<22}{}", table, count);
    }
    Ok(())
}

fn run_engine_once(db_path: &str) -> Result<(), Box<dyn Error>> {
    let repo = ProductionLedgerRepository::new(db_path)?;
    let report = WorkableEngine::new().run(&repo, Local::now().naive_local())?;

    println!();
    println!("== summary @ {} ==", report.timestamp);
    for row in &report.summary {
        println!(
            "W{:<3} {:<16} {:<10} order={:<5} workable={:<5} bonding={:<5} remaining={:<5} {:<12} {}",
            row.week,
            row.customer,
            row.sku,
            row.quantity_order,
            row.workable,
            row.bonding,
            row.remaining_to_produce,
            row.status,
            row.remarks
        );
    }
    println!("== reject rows: {} ==", report.reject.len());
    Ok(())
}
