// ==========================================
// 周度 Flash 预测台账 - SQLite 连接初始化与 Schema
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，并发写入时等待而不是立即失败
// - 显式、带版本的 schema（不做运行时列探测）
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// v1 schema
const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS forecast_record (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    financial_type TEXT NOT NULL CHECK (financial_type IN ('Revenue', 'EBITDA')),
    region TEXT NOT NULL CHECK (region IN ('USA', 'Canada', 'Europe', 'India', 'Australia', 'Africa')),
    week TEXT NOT NULL,
    flash_est REAL NOT NULL CHECK (flash_est >= 0),
    actuals REAL NOT NULL CHECK (actuals >= 0),
    flash_vs_act REAL NOT NULL,
    pct_variance REAL,
    accuracy REAL NOT NULL CHECK (accuracy >= 0),
    month INTEGER NOT NULL CHECK (month BETWEEN 1 AND 12),
    year INTEGER NOT NULL,
    eom INTEGER NOT NULL DEFAULT 0 CHECK (eom IN (0, 1)),
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_forecast_record_group
    ON forecast_record (region, financial_type, year, month, week);

CREATE INDEX IF NOT EXISTS idx_forecast_record_week
    ON forecast_record (week DESC, id DESC);

CREATE TABLE IF NOT EXISTS action_log (
    action_id TEXT PRIMARY KEY,
    action_type TEXT NOT NULL,
    action_ts TEXT NOT NULL,
    actor TEXT NOT NULL,
    payload_json TEXT,
    detail TEXT
);

CREATE INDEX IF NOT EXISTS idx_action_log_ts ON action_log (action_ts DESC);

CREATE TABLE IF NOT EXISTS config_kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 建表（幂等）并登记 schema_version
///
/// 库版本高于代码期望时只告警，不降级
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    let current = read_schema_version(conn)?;

    match current {
        Some(v) if v > CURRENT_SCHEMA_VERSION => {
            tracing::warn!(
                "数据库 schema_version={} 高于代码期望的 {}，继续以兼容模式运行",
                v,
                CURRENT_SCHEMA_VERSION
            );
            return Ok(());
        }
        Some(v) if v == CURRENT_SCHEMA_VERSION => return Ok(()),
        _ => {}
    }

    conn.execute_batch(SCHEMA_V1)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    tracing::info!("schema 初始化完成: version={}", CURRENT_SCHEMA_VERSION);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();

        assert_eq!(read_schema_version(&conn).unwrap(), None);
        ensure_schema(&conn).unwrap();
        ensure_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_schema_rejects_negative_amounts() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();

        let result = conn.execute(
            r#"
            INSERT INTO forecast_record (
                financial_type, region, week, flash_est, actuals,
                flash_vs_act, pct_variance, accuracy, month, year, eom
            ) VALUES ('Revenue', 'USA', '2024-01-07', -1, 10, -11, -1.1, 0, 1, 2024, 0)
            "#,
            [],
        );
        assert!(result.is_err());
    }
}
