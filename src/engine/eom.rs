// ==========================================
// 周度 Flash 预测台账 - EOM 判定引擎
// ==========================================
// 分组键: (region, financial_type, month, year)
// 规则: 组内 week 最大者为 EOM; week 相同时取 id 最大者
// ==========================================
// 职责: EOM 选择规则 + 不变量巡检（只读, 不拼 SQL）
// 说明: 仓储层 SQL 按同一规则排序 (week DESC, id DESC)
// ==========================================

use crate::domain::forecast::{EomGroup, ForecastRecord};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::instrument;

/// 从 (id, week) 集合中选出 EOM 记录 id
///
/// 空集合返回 None
pub fn select_eom_id<I>(rows: I) -> Option<i64>
where
    I: IntoIterator<Item = (i64, NaiveDate)>,
{
    rows.into_iter()
        .max_by(|(id_a, week_a), (id_b, week_b)| week_a.cmp(week_b).then(id_a.cmp(id_b)))
        .map(|(id, _)| id)
}

// ==========================================
// EomViolation - 不变量违反明细
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EomViolation {
    pub group: EomGroup,
    pub expected_id: i64,        // 按规则应为 EOM 的记录
    pub marked_ids: Vec<i64>,    // 实际被标记的记录
}

// ==========================================
// EomInspector - EOM 不变量巡检
// ==========================================
pub struct EomInspector {}

impl EomInspector {
    pub fn new() -> Self {
        Self {}
    }

    /// 检查每个分组是否恰好一条 EOM 且为规则选中的记录
    ///
    /// 返回违反列表（按分组排序）, 为空表示不变量成立
    #[instrument(skip(self, records), fields(count = records.len()))]
    pub fn inspect(&self, records: &[ForecastRecord]) -> Vec<EomViolation> {
        let mut groups: BTreeMap<EomGroup, Vec<&ForecastRecord>> = BTreeMap::new();
        for record in records {
            groups.entry(record.group()).or_default().push(record);
        }

        groups
            .into_iter()
            .filter_map(|(group, members)| {
                let expected_id = select_eom_id(members.iter().map(|r| (r.id, r.week)))?;
                let mut marked_ids: Vec<i64> =
                    members.iter().filter(|r| r.is_eom).map(|r| r.id).collect();
                marked_ids.sort_unstable();

                if marked_ids == [expected_id] {
                    None
                } else {
                    Some(EomViolation {
                        group,
                        expected_id,
                        marked_ids,
                    })
                }
            })
            .collect()
    }
}

impl Default for EomInspector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{FinancialType, Region};
    use chrono::Utc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(id: i64, region: Region, week: NaiveDate, is_eom: bool) -> ForecastRecord {
        use chrono::Datelike;
        ForecastRecord {
            id,
            financial_type: FinancialType::Revenue,
            region,
            week,
            flash_estimate: 100.0,
            actual: 100.0,
            variance: 0.0,
            percent_variance: Some(0.0),
            accuracy: 1.0,
            month: week.month(),
            year: week.year(),
            is_eom,
            created_at: Utc::now().naive_utc(),
        }
    }

    #[test]
    fn test_select_latest_week() {
        let rows = vec![
            (1, date(2024, 1, 7)),
            (2, date(2024, 1, 28)),
            (3, date(2024, 1, 14)),
        ];
        assert_eq!(select_eom_id(rows), Some(2));
    }

    #[test]
    fn test_select_tie_prefers_highest_id() {
        let rows = vec![
            (4, date(2024, 1, 28)),
            (9, date(2024, 1, 28)),
            (7, date(2024, 1, 14)),
        ];
        assert_eq!(select_eom_id(rows), Some(9));
    }

    #[test]
    fn test_select_empty() {
        assert_eq!(select_eom_id(Vec::new()), None);
    }

    #[test]
    fn test_inspect_consistent_table() {
        let records = vec![
            record(1, Region::Usa, date(2024, 1, 7), false),
            record(2, Region::Usa, date(2024, 1, 14), true),
            record(3, Region::Canada, date(2024, 1, 7), true),
        ];
        assert!(EomInspector::new().inspect(&records).is_empty());
    }

    #[test]
    fn test_inspect_reports_stale_and_missing_marks() {
        let records = vec![
            // 旧记录仍被标记
            record(1, Region::Usa, date(2024, 1, 7), true),
            record(2, Region::Usa, date(2024, 1, 14), true),
            // 分组无任何标记
            record(3, Region::Europe, date(2024, 2, 4), false),
        ];
        let violations = EomInspector::new().inspect(&records);
        assert_eq!(violations.len(), 2);

        let usa = violations
            .iter()
            .find(|v| v.group.region == Region::Usa)
            .unwrap();
        assert_eq!(usa.expected_id, 2);
        assert_eq!(usa.marked_ids, vec![1, 2]);

        let europe = violations
            .iter()
            .find(|v| v.group.region == Region::Europe)
            .unwrap();
        assert_eq!(europe.expected_id, 3);
        assert!(europe.marked_ids.is_empty());
    }

    #[test]
    fn test_inspect_tie_marked_lower_id_is_violation() {
        let records = vec![
            record(1, Region::Africa, date(2024, 3, 31), true),
            record(2, Region::Africa, date(2024, 3, 31), false),
        ];
        let violations = EomInspector::new().inspect(&records);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].expected_id, 2);
    }
}
