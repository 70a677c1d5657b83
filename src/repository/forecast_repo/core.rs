use crate::db::{ensure_schema, open_sqlite_connection};
use crate::domain::action_log::ActionLog;
use crate::domain::forecast::{EomGroup, ForecastMetrics, ForecastRecord, NewForecast};
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::sync::{Arc, Mutex};
use tracing::instrument;

// ==========================================
// ForecastRepository - 预测记录仓储
// ==========================================
// EOM 规则: 组内 week 最大者; week 相同取 id 最大者
// 并发: 写事务以 BEGIN IMMEDIATE 开启, 同库写入串行化
pub struct ForecastRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ForecastRepository {
    /// 基于共享连接创建仓储（调用方负责 schema 初始化）
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 打开数据库文件并确保 schema 存在
    pub fn open(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        ensure_schema(&conn)?;
        Ok(Self::new(Arc::new(Mutex::new(conn))))
    }

    /// 获取数据库连接
    pub(super) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 插入预测记录并维护所在分组的 EOM
    ///
    /// # 参数
    /// - `input`: 表单输入
    /// - `metrics`: 由指标计算器得到的派生指标
    /// - `audit`: 同事务写入的操作日志（可选）
    ///
    /// # 返回
    /// - `Ok(record)`: 提交后的记录（含最新 is_eom）
    /// - `Err(...)`: 任一步失败, 整个事务回滚
    #[instrument(skip(self, input, metrics, audit), fields(group = %input.group()))]
    pub fn insert_with_eom(
        &self,
        input: &NewForecast,
        metrics: &ForecastMetrics,
        audit: Option<&ActionLog>,
    ) -> RepositoryResult<ForecastRecord> {
        let group = input.group();
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        // 1. 暂定插入 (eom = 0)
        tx.execute(
            r#"
            INSERT INTO forecast_record (
                financial_type, region, week, flash_est, actuals,
                flash_vs_act, pct_variance, accuracy, month, year, eom, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 0, ?11)
            "#,
            params![
                input.financial_type.as_str(),
                input.region.as_str(),
                input.week,
                input.flash_estimate,
                input.actual,
                metrics.variance,
                metrics.percent_variance,
                metrics.accuracy,
                group.month,
                group.year,
                Utc::now().naive_utc(),
            ],
        )?;
        let id = tx.last_insert_rowid();

        // 2. 分组 EOM 重算
        let eom_id = apply_group_eom(&tx, &group)?;

        // 3. 审计
        if let Some(log) = audit {
            ActionLogRepository::insert_with_conn(&tx, log)?;
        }

        let record = Self::find_by_id_with_conn(&tx, id)?.ok_or_else(|| {
            RepositoryError::InternalError(format!("插入后未能读回记录: id={}", id))
        })?;

        // 4. 整体提交
        tx.commit()?;

        tracing::info!(
            "预测已提交: id={}, group={}, eom_id={:?}",
            id,
            group,
            eom_id
        );
        Ok(record)
    }

    /// 重算单个分组的 EOM（幂等）
    ///
    /// # 返回
    /// - `Ok(Some(id))`: 当前 EOM 记录
    /// - `Ok(None)`: 分组内无记录
    #[instrument(skip(self, group, audit), fields(group = %group))]
    pub fn recompute_group_eom(
        &self,
        group: &EomGroup,
        audit: Option<&ActionLog>,
    ) -> RepositoryResult<Option<i64>> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let eom_id = apply_group_eom(&tx, group)?;
        if let Some(log) = audit {
            ActionLogRepository::insert_with_conn(&tx, log)?;
        }

        tx.commit()?;
        Ok(eom_id)
    }

    /// 全表重建 EOM（单事务）
    ///
    /// # 返回
    /// - `Ok(n)`: 处理的分组数
    #[instrument(skip(self, audit))]
    pub fn rebuild_all_eom(&self, audit: Option<&ActionLog>) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let groups = Self::list_groups_with_conn(&tx)?;
        for group in &groups {
            apply_group_eom(&tx, group)?;
        }

        if let Some(log) = audit {
            ActionLogRepository::insert_with_conn(&tx, log)?;
        }

        tx.commit()?;
        tracing::info!("EOM 全量重建完成: groups={}", groups.len());
        Ok(groups.len())
    }
}

/// 在给定连接（事务）内恢复分组的 EOM 不变量
///
/// 步骤: 清除组内标记 → 取组内最大 week（同 week 取最大 id）→ 标记
fn apply_group_eom(conn: &Connection, group: &EomGroup) -> RepositoryResult<Option<i64>> {
    let region = group.region.as_str();
    let financial_type = group.financial_type.as_str();

    conn.execute(
        r#"
        UPDATE forecast_record
        SET eom = 0
        WHERE region = ?1 AND financial_type = ?2 AND month = ?3 AND year = ?4
          AND eom = 1
        "#,
        params![region, financial_type, group.month, group.year],
    )?;

    let eom_id: Option<i64> = conn
        .query_row(
            r#"
            SELECT id
            FROM forecast_record
            WHERE region = ?1 AND financial_type = ?2 AND month = ?3 AND year = ?4
            ORDER BY week DESC, id DESC
            LIMIT 1
            "#,
            params![region, financial_type, group.month, group.year],
            |row| row.get(0),
        )
        .optional()?;

    if let Some(id) = eom_id {
        conn.execute("UPDATE forecast_record SET eom = 1 WHERE id = ?1", params![id])?;
    }

    Ok(eom_id)
}
