// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的临时数据库、AppState、表单构造等功能
// ==========================================

#![allow(dead_code)]

use flash_forecast::api::RawForecastForm;
use flash_forecast::app::AppState;
use flash_forecast::domain::{FinancialType, NewForecast, Region};
use chrono::NaiveDate;
use std::error::Error;
use tempfile::NamedTempFile;

/// 创建临时测试数据库文件
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file
        .path()
        .to_str()
        .ok_or("临时文件路径不是合法 UTF-8")?
        .to_string();
    Ok((temp_file, db_path))
}

/// 创建基于临时数据库的 AppState
pub fn create_test_state() -> Result<(NamedTempFile, AppState), Box<dyn Error>> {
    let (temp_file, db_path) = create_test_db()?;
    let state = AppState::new(db_path)?;
    Ok((temp_file, state))
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn new_forecast(
    financial_type: FinancialType,
    region: Region,
    week: NaiveDate,
    flash_estimate: f64,
    actual: f64,
) -> NewForecast {
    NewForecast {
        financial_type,
        region,
        week,
        flash_estimate,
        actual,
    }
}

pub fn raw_form(financial_type: &str, region: &str, week: &str, flash: &str, actual: &str) -> RawForecastForm {
    RawForecastForm {
        financial_type: financial_type.to_string(),
        region: region.to_string(),
        week: week.to_string(),
        flash_estimate: flash.to_string(),
        actual: actual.to_string(),
    }
}
