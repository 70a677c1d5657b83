// ==========================================
// 周度 Flash 预测台账 - 预测记录领域模型
// ==========================================
// 对齐: forecast_record 表
// 红线: 派生字段只由指标计算器产生,不接受外部输入
// 红线: 记录创建后不可变,仅 is_eom 由 EOM 维护修改
// ==========================================

use crate::domain::types::{FinancialType, Region};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// NewForecast - 待提交的预测（表单输入）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewForecast {
    pub financial_type: FinancialType,
    pub region: Region,
    pub week: NaiveDate,      // 周截止日（允许任意日期）
    pub flash_estimate: f64,  // Flash 预估
    pub actual: f64,          // 实际值
}

impl NewForecast {
    /// 所属 EOM 分组
    pub fn group(&self) -> EomGroup {
        EomGroup::of(self.region, self.financial_type, self.week)
    }
}

// ==========================================
// ForecastMetrics - 派生指标
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastMetrics {
    pub variance: f64,                 // Flash vs Act
    pub percent_variance: Option<f64>, // actual = 0 时未定义
    pub accuracy: f64,                 // 下限截断为 0
}

// ==========================================
// ForecastRecord - 已持久化的预测记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub id: i64,
    pub financial_type: FinancialType,
    pub region: Region,
    pub week: NaiveDate,
    pub flash_estimate: f64,
    pub actual: f64,

    // ===== 派生字段 =====
    pub variance: f64,
    pub percent_variance: Option<f64>,
    pub accuracy: f64,
    pub month: u32,
    pub year: i32,

    // ===== EOM 维护 =====
    pub is_eom: bool,

    pub created_at: NaiveDateTime,
}

impl ForecastRecord {
    pub fn group(&self) -> EomGroup {
        EomGroup {
            region: self.region,
            financial_type: self.financial_type,
            month: self.month,
            year: self.year,
        }
    }

    pub fn metrics(&self) -> ForecastMetrics {
        ForecastMetrics {
            variance: self.variance,
            percent_variance: self.percent_variance,
            accuracy: self.accuracy,
        }
    }
}

// ==========================================
// EomGroup - EOM 分组键
// ==========================================
// 唯一规范分组: (region, financial_type, month, year)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EomGroup {
    pub region: Region,
    pub financial_type: FinancialType,
    pub month: u32,
    pub year: i32,
}

impl EomGroup {
    pub fn of(region: Region, financial_type: FinancialType, week: NaiveDate) -> Self {
        Self {
            region,
            financial_type,
            month: week.month(),
            year: week.year(),
        }
    }
}

impl fmt::Display for EomGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{:04}-{:02}",
            self.region, self.financial_type, self.year, self.month
        )
    }
}

// ==========================================
// ForecastFilter - 列表查询条件
// ==========================================
// 默认: 全表, 按 week 倒序
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastFilter {
    pub financial_type: Option<FinancialType>,
    pub region: Option<Region>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub eom_only: bool,
    pub limit: Option<usize>,
}

impl ForecastFilter {
    /// 单个分组的全部记录
    pub fn for_group(group: &EomGroup) -> Self {
        Self {
            financial_type: Some(group.financial_type),
            region: Some(group.region),
            year: Some(group.year),
            month: Some(group.month),
            ..Self::default()
        }
    }
}
