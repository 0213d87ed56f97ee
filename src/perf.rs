// ==========================================
// 裁切贴合可投产量核算系统 - 性能观测
// ==========================================
// 职责: SQL 计数 + 慢 SQL 告警 + 单次核算耗时
// 开关:
// - Debug 默认开启；Release 默认关闭
// - WORKABLE_LEDGER_PERF_SQL=1 强制开启
// - WORKABLE_LEDGER_SLOW_SQL_MS=50 配置慢 SQL 阈值（毫秒）
// ==========================================

use rusqlite::Connection;
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

pub const ENV_PERF_SQL: &str = "WORKABLE_LEDGER_PERF_SQL";
pub const ENV_SLOW_SQL_MS: &str = "WORKABLE_LEDGER_SLOW_SQL_MS";

static SQL_TRACE_ON: AtomicBool = AtomicBool::new(false);
static SLOW_SQL_MS: AtomicU64 = AtomicU64::new(0);

// 核算在 spawn_blocking 线程上同步执行，计数按线程隔离
thread_local! {
    static GUARD_DEPTH: Cell<u32> = const { Cell::new(0) };
    static STATEMENTS: Cell<u64> = const { Cell::new(0) };
    static SLOW_STATEMENTS: Cell<u64> = const { Cell::new(0) };
}

/// SQL 观测设置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqlTraceSettings {
    pub enabled: bool,
    pub slow_threshold_ms: u64,
}

impl SqlTraceSettings {
    /// 从环境变量读取
    pub fn from_env() -> Self {
        Self::resolve(
            std::env::var(ENV_PERF_SQL).ok().as_deref(),
            std::env::var(ENV_SLOW_SQL_MS).ok().as_deref(),
        )
    }

    fn resolve(perf_flag: Option<&str>, slow_ms: Option<&str>) -> Self {
        let enabled = perf_flag.map(is_truthy).unwrap_or(cfg!(debug_assertions));
        let slow_threshold_ms = slow_ms
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(if cfg!(debug_assertions) { 50 } else { 200 });
        Self {
            enabled,
            slow_threshold_ms,
        }
    }
}

fn is_truthy(v: &str) -> bool {
    matches!(
        v.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn one_line_sql(sql: &str, max_chars: usize) -> String {
    let flat = sql.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", &flat[..cut]),
        None => flat,
    }
}

/// 在连接上安装 trace/profile 回调
pub fn install_sqlite_tracing(conn: &mut Connection) {
    let settings = SqlTraceSettings::from_env();
    SQL_TRACE_ON.store(settings.enabled, Ordering::Relaxed);

    if !settings.enabled {
        conn.trace(None);
        conn.profile(None);
        return;
    }

    SLOW_SQL_MS.store(settings.slow_threshold_ms, Ordering::Relaxed);
    conn.trace(Some(on_statement));
    conn.profile(Some(on_statement_profiled));
}

fn guard_active() -> bool {
    GUARD_DEPTH.with(|d| d.get() > 0)
}

fn on_statement(_sql: &str) {
    if SQL_TRACE_ON.load(Ordering::Relaxed) && guard_active() {
        STATEMENTS.with(|c| c.set(c.get().saturating_add(1)));
    }
}

fn on_statement_profiled(sql: &str, duration: Duration) {
    if !SQL_TRACE_ON.load(Ordering::Relaxed) {
        return;
    }

    let elapsed_ms = duration.as_millis() as u64;
    let threshold = SLOW_SQL_MS.load(Ordering::Relaxed);
    if threshold == 0 || elapsed_ms < threshold {
        return;
    }

    tracing::warn!(
        target: "slow_sql",
        duration_ms = elapsed_ms,
        sql = %one_line_sql(sql, 400),
        "慢 SQL"
    );
    if guard_active() {
        SLOW_STATEMENTS.with(|c| c.set(c.get().saturating_add(1)));
    }
}

/// 耗时统计 Guard：drop 时输出 elapsed_ms / sql_count / slow_sql_count
///
/// ```ignore
/// let _perf = workable_ledger::perf::PerfGuard::new("workable_compute");
/// ```
pub struct PerfGuard {
    op: &'static str,
    started: Instant,
    statements_before: u64,
    slow_before: u64,
}

impl PerfGuard {
    pub fn new(op: &'static str) -> Self {
        GUARD_DEPTH.with(|d| d.set(d.get().saturating_add(1)));
        Self {
            op,
            started: Instant::now(),
            statements_before: STATEMENTS.with(|c| c.get()),
            slow_before: SLOW_STATEMENTS.with(|c| c.get()),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Drop for PerfGuard {
    fn drop(&mut self) {
        let sql_count = STATEMENTS
            .with(|c| c.get())
            .saturating_sub(self.statements_before);
        let slow_sql_count = SLOW_STATEMENTS
            .with(|c| c.get())
            .saturating_sub(self.slow_before);

        tracing::info!(
            target: "perf",
            op = self.op,
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            sql_count,
            slow_sql_count,
            "done"
        );

        GUARD_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}
