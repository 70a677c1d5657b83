// ==========================================
// 周度 Flash 预测台账 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value)
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 基于共享连接创建 ConfigManager（schema 由调用方保证）
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 从 config_kv 表读取配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(value)
    }

    /// 读取配置值，带默认值
    pub fn get_config_or_default(&self, key: &str, default: &str) -> RepositoryResult<String> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 写入配置值（UPSERT）
    pub fn set_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            "INSERT INTO config_kv (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;

        Ok(())
    }

    /// 列出全部已持久化的配置（按 key 排序）
    pub fn list_configs(&self) -> RepositoryResult<Vec<(String, String)>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare("SELECT key, value FROM config_kv ORDER BY key")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
    }

    /// 获取所有配置的快照（JSON格式, 已知键未设置时填入默认值）
    pub fn get_config_snapshot(&self) -> RepositoryResult<String> {
        let mut config_map: BTreeMap<String, String> = config_keys::DEFAULTS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        for (key, value) in self.list_configs()? {
            config_map.insert(key, value);
        }

        serde_json::to_string(&json!(config_map))
            .map_err(|e| RepositoryError::InternalError(format!("配置快照序列化失败: {}", e)))
    }

    // ===== 导出配置 =====

    /// CSV 导出文件名
    pub fn export_file_name(&self) -> RepositoryResult<String> {
        let name = self.get_config_or_default(
            config_keys::EXPORT_FILE_NAME,
            config_keys::DEFAULT_EXPORT_FILE_NAME,
        )?;
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Ok(config_keys::DEFAULT_EXPORT_FILE_NAME.to_string());
        }
        Ok(trimmed.to_string())
    }

    // ===== 列表配置 =====

    /// 列表默认最大行数（0 或未配置 = 不限制）
    pub fn list_max_rows(&self) -> RepositoryResult<Option<usize>> {
        let raw = self.get_config_or_default(config_keys::LIST_MAX_ROWS, "0")?;
        match raw.trim().parse::<usize>() {
            Ok(0) => Ok(None),
            Ok(n) => Ok(Some(n)),
            Err(_) => {
                tracing::warn!(
                    "配置 {} 的值 {:?} 不是非负整数，按不限制处理",
                    config_keys::LIST_MAX_ROWS,
                    raw
                );
                Ok(None)
            }
        }
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 导出
    pub const EXPORT_FILE_NAME: &str = "export.file_name";
    pub const DEFAULT_EXPORT_FILE_NAME: &str = "revenue_forecast.csv";

    // 列表
    pub const LIST_MAX_ROWS: &str = "list.max_rows";

    /// 已知键及默认值
    pub const DEFAULTS: [(&str, &str); 2] = [
        (EXPORT_FILE_NAME, DEFAULT_EXPORT_FILE_NAME),
        (LIST_MAX_ROWS, "0"),
    ];

    /// 是否为已知配置键
    pub fn is_known(key: &str) -> bool {
        DEFAULTS.iter().any(|(k, _)| *k == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::ensure_schema(&conn).unwrap();
        ConfigManager::new(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = setup();
        assert_eq!(config.export_file_name().unwrap(), "revenue_forecast.csv");
        assert_eq!(config.list_max_rows().unwrap(), None);
        assert!(config.list_configs().unwrap().is_empty());
    }

    #[test]
    fn test_set_and_overwrite() {
        let config = setup();
        config.set_config_value(config_keys::LIST_MAX_ROWS, "50").unwrap();
        assert_eq!(config.list_max_rows().unwrap(), Some(50));

        config.set_config_value(config_keys::LIST_MAX_ROWS, "0").unwrap();
        assert_eq!(config.list_max_rows().unwrap(), None);

        assert_eq!(config.list_configs().unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_max_rows_falls_back_to_unlimited() {
        let config = setup();
        config.set_config_value(config_keys::LIST_MAX_ROWS, "lots").unwrap();
        assert_eq!(config.list_max_rows().unwrap(), None);
    }

    #[test]
    fn test_snapshot_merges_defaults() {
        let config = setup();
        config
            .set_config_value(config_keys::EXPORT_FILE_NAME, "weekly.csv")
            .unwrap();

        let snapshot: serde_json::Value =
            serde_json::from_str(&config.get_config_snapshot().unwrap()).unwrap();
        assert_eq!(snapshot["export.file_name"], "weekly.csv");
        assert_eq!(snapshot["list.max_rows"], "0");
    }
}
