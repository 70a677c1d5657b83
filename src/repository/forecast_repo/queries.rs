use super::core::ForecastRepository;
use crate::domain::forecast::{EomGroup, ForecastFilter, ForecastRecord};
use crate::domain::types::{FinancialType, Region};
use crate::repository::error::RepositoryResult;
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Result as SqliteResult, Row};

const SELECT_COLUMNS: &str = r#"
    SELECT id, financial_type, region, week, flash_est, actuals,
           flash_vs_act, pct_variance, accuracy, month, year, eom, created_at
    FROM forecast_record
"#;

impl ForecastRepository {
    // ==========================================
    // 查询操作
    // ==========================================

    /// 按 id 查询单条记录
    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<ForecastRecord>> {
        let conn = self.get_conn()?;
        Self::find_by_id_with_conn(&conn, id)
    }

    pub(super) fn find_by_id_with_conn(
        conn: &Connection,
        id: i64,
    ) -> RepositoryResult<Option<ForecastRecord>> {
        let sql = format!("{} WHERE id = ?1", SELECT_COLUMNS);
        let record = conn
            .query_row(&sql, params![id], map_row)
            .optional()?;
        Ok(record)
    }

    /// 列表查询（week 倒序, 同 week 按 id 倒序）
    pub fn list(&self, filter: &ForecastFilter) -> RepositoryResult<Vec<ForecastRecord>> {
        let mut conditions: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(financial_type) = filter.financial_type {
            conditions.push("financial_type = ?");
            values.push(Value::Text(financial_type.as_str().to_string()));
        }
        if let Some(region) = filter.region {
            conditions.push("region = ?");
            values.push(Value::Text(region.as_str().to_string()));
        }
        if let Some(year) = filter.year {
            conditions.push("year = ?");
            values.push(Value::Integer(i64::from(year)));
        }
        if let Some(month) = filter.month {
            conditions.push("month = ?");
            values.push(Value::Integer(i64::from(month)));
        }
        if filter.eom_only {
            conditions.push("eom = 1");
        }

        let mut sql = SELECT_COLUMNS.to_string();
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY week DESC, id DESC");
        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            values.push(Value::Integer(limit as i64));
        }

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(params_from_iter(values.iter()), map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(records)
    }

    /// 查询分组当前的 EOM 记录
    pub fn find_eom_record(&self, group: &EomGroup) -> RepositoryResult<Option<ForecastRecord>> {
        let filter = ForecastFilter {
            eom_only: true,
            ..ForecastFilter::for_group(group)
        };
        Ok(self.list(&filter)?.into_iter().next())
    }

    /// 全部已存在的分组
    pub fn list_groups(&self) -> RepositoryResult<Vec<EomGroup>> {
        let conn = self.get_conn()?;
        Self::list_groups_with_conn(&conn)
    }

    pub(super) fn list_groups_with_conn(conn: &Connection) -> RepositoryResult<Vec<EomGroup>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT DISTINCT region, financial_type, month, year
            FROM forecast_record
            ORDER BY year, month, region, financial_type
            "#,
        )?;

        let groups = stmt
            .query_map([], |row| {
                Ok(EomGroup {
                    region: parse_text_column(row, 0)?,
                    financial_type: parse_text_column(row, 1)?,
                    month: row.get(2)?,
                    year: row.get(3)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(groups)
    }

    /// 记录总数
    pub fn count(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let n = conn.query_row("SELECT COUNT(*) FROM forecast_record", [], |row| row.get(0))?;
        Ok(n)
    }
}

// ==========================================
// 行映射
// ==========================================

fn map_row(row: &Row) -> SqliteResult<ForecastRecord> {
    let financial_type: FinancialType = parse_text_column(row, 1)?;
    let region: Region = parse_text_column(row, 2)?;

    let eom: i64 = row.get(11)?;

    Ok(ForecastRecord {
        id: row.get(0)?,
        financial_type,
        region,
        week: row.get(3)?,
        flash_estimate: row.get(4)?,
        actual: row.get(5)?,
        variance: row.get(6)?,
        percent_variance: row.get(7)?,
        accuracy: row.get(8)?,
        month: row.get(9)?,
        year: row.get(10)?,
        is_eom: eom != 0,
        created_at: row.get(12)?,
    })
}

/// 文本列 → 枚举
fn parse_text_column<T>(row: &Row, idx: usize) -> SqliteResult<T>
where
    T: std::str::FromStr<Err = String>,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
}
