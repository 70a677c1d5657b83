// ==========================================
// 周度 Flash 预测台账 - 表单输入校验器
// ==========================================
// 职责: 原始表单文本 → NewForecast
// 红线: 校验失败不得触达存储
// ==========================================

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};
use crate::domain::forecast::NewForecast;
use crate::domain::types::{FinancialType, Region};

// ==========================================
// RawForecastForm - 原始表单
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawForecastForm {
    pub financial_type: String,
    pub region: String,
    pub week: String,           // YYYY-MM-DD
    pub flash_estimate: String,
    pub actual: String,
}

// ==========================================
// ForecastInputValidator
// ==========================================
// week 以 YYYY-MM-DD 文本存储并按文本排序, 年份限定为 4 位
const MIN_WEEK_YEAR: i32 = 1;
const MAX_WEEK_YEAR: i32 = 9999;

pub struct ForecastInputValidator;

impl ForecastInputValidator {
    /// 解析并校验原始表单
    pub fn parse_form(form: &RawForecastForm) -> ApiResult<NewForecast> {
        let financial_type = Self::parse_choice::<FinancialType>("financial_type", &form.financial_type)?;
        let region = Self::parse_choice::<Region>("region", &form.region)?;
        let week = Self::parse_week(&form.week)?;
        let flash_estimate = Self::parse_amount("flash_estimate", &form.flash_estimate)?;
        let actual = Self::parse_amount("actual", &form.actual)?;

        Ok(NewForecast {
            financial_type,
            region,
            week,
            flash_estimate,
            actual,
        })
    }

    /// 校验已类型化的输入（金额必须有限且非负, week 年份在 1..=9999）
    pub fn validate(input: &NewForecast) -> ApiResult<()> {
        Self::check_week(input.week)?;
        Self::check_amount("flash_estimate", input.flash_estimate)?;
        Self::check_amount("actual", input.actual)?;
        Ok(())
    }

    fn parse_choice<T>(field: &str, raw: &str) -> ApiResult<T>
    where
        T: std::str::FromStr<Err = String>,
    {
        if raw.trim().is_empty() {
            return Err(ApiError::ValidationError(format!("{} 不能为空", field)));
        }
        raw.parse::<T>()
            .map_err(|e| ApiError::ValidationError(format!("{}: {}", field, e)))
    }

    fn parse_week(raw: &str) -> ApiResult<NaiveDate> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ApiError::ValidationError("week 不能为空".to_string()));
        }
        let week = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|e| {
            ApiError::ValidationError(format!("week 日期格式错误（应为YYYY-MM-DD）: {}", e))
        })?;
        Self::check_week(week)?;
        Ok(week)
    }

    fn check_week(week: NaiveDate) -> ApiResult<()> {
        if !(MIN_WEEK_YEAR..=MAX_WEEK_YEAR).contains(&week.year()) {
            return Err(ApiError::ValidationError(format!(
                "week 年份超出范围 {}..={}: {}",
                MIN_WEEK_YEAR, MAX_WEEK_YEAR, week
            )));
        }
        Ok(())
    }

    fn parse_amount(field: &str, raw: &str) -> ApiResult<f64> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ApiError::ValidationError(format!("{} 不能为空", field)));
        }
        let value = trimmed
            .parse::<f64>()
            .map_err(|_| ApiError::ValidationError(format!("{} 不是数字: {:?}", field, trimmed)))?;
        Self::check_amount(field, value)?;

        // -0 归一为 0
        Ok(if value == 0.0 { 0.0 } else { value })
    }

    fn check_amount(field: &str, value: f64) -> ApiResult<()> {
        if !value.is_finite() {
            return Err(ApiError::ValidationError(format!("{} 必须是有限数值", field)));
        }
        if value < 0.0 {
            return Err(ApiError::ValidationError(format!(
                "{} 不能为负数: {}",
                field, value
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(flash: &str, actual: &str) -> RawForecastForm {
        RawForecastForm {
            financial_type: "Revenue".to_string(),
            region: "USA".to_string(),
            week: "2024-01-07".to_string(),
            flash_estimate: flash.to_string(),
            actual: actual.to_string(),
        }
    }

    #[test]
    fn test_parse_valid_form() {
        let input = ForecastInputValidator::parse_form(&form("10000", " 9500.50 ")).unwrap();
        assert_eq!(input.financial_type, FinancialType::Revenue);
        assert_eq!(input.region, Region::Usa);
        assert_eq!(input.week, NaiveDate::from_ymd_opt(2024, 1, 7).unwrap());
        assert_eq!(input.flash_estimate, 10_000.0);
        assert_eq!(input.actual, 9_500.5);
    }

    #[test]
    fn test_rejects_missing_and_non_numeric_amounts() {
        for (flash, actual) in [("", "1"), ("1", "  "), ("abc", "1"), ("1", "1e"), ("NaN", "1"), ("1", "inf")] {
            let err = ForecastInputValidator::parse_form(&form(flash, actual)).unwrap_err();
            assert!(err.is_validation_error(), "flash={:?} actual={:?}", flash, actual);
        }
    }

    #[test]
    fn test_rejects_negative_amounts() {
        let err = ForecastInputValidator::parse_form(&form("-1", "10")).unwrap_err();
        assert!(matches!(err, ApiError::ValidationError(msg) if msg.contains("flash_estimate")));
    }

    #[test]
    fn test_negative_zero_is_normalized() {
        let input = ForecastInputValidator::parse_form(&form("-0", "0")).unwrap();
        assert!(input.flash_estimate.is_sign_positive());
    }

    #[test]
    fn test_rejects_unknown_choices_and_bad_week() {
        let mut bad = form("1", "1");
        bad.region = "Mars".to_string();
        assert!(ForecastInputValidator::parse_form(&bad).is_err());

        let mut bad = form("1", "1");
        bad.financial_type = String::new();
        assert!(ForecastInputValidator::parse_form(&bad).is_err());

        let mut bad = form("1", "1");
        bad.week = "07/01/2024".to_string();
        assert!(ForecastInputValidator::parse_form(&bad).is_err());
    }

    #[test]
    fn test_validate_typed_input() {
        let mut input = ForecastInputValidator::parse_form(&form("1", "1")).unwrap();
        assert!(ForecastInputValidator::validate(&input).is_ok());

        input.actual = f64::NAN;
        assert!(ForecastInputValidator::validate(&input).is_err());

        input.actual = -5.0;
        assert!(ForecastInputValidator::validate(&input).is_err());
    }

    #[test]
    fn test_rejects_week_year_outside_four_digits() {
        for week in ["+12024-01-07", "-0001-06-01", "0000-12-31"] {
            let mut bad = form("1", "1");
            bad.week = week.to_string();
            let err = ForecastInputValidator::parse_form(&bad).unwrap_err();
            assert!(err.is_validation_error(), "week={:?}", week);
        }

        let mut input = ForecastInputValidator::parse_form(&form("1", "1")).unwrap();
        input.week = NaiveDate::from_ymd_opt(10_000, 1, 1).unwrap();
        assert!(ForecastInputValidator::validate(&input).is_err());

        input.week = NaiveDate::from_ymd_opt(9_999, 12, 31).unwrap();
        assert!(ForecastInputValidator::validate(&input).is_ok());
    }
}
