// ==========================================
// 周度 Flash 预测台账 - CSV 导出器
// ==========================================
// 格式: UTF-8, 逗号分隔, 首行为可读列名, 每条记录一行
// % Variance 未定义时留空; EOM 列为 "EOM" 或空
// ==========================================

use crate::domain::forecast::ForecastRecord;
use crate::exporter::error::{ExportError, ExportResult};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// 表头（与表格视图列名一致）
pub const CSV_HEADERS: [&str; 10] = [
    "Financials",
    "Region",
    "Week",
    "Flash Est",
    "Actuals",
    "Flash vs Act",
    "% Variance",
    "Accuracy",
    "Month",
    "EOM",
];

/// CSV 行
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    #[serde(rename = "Financials")]
    financials: &'a str,
    #[serde(rename = "Region")]
    region: &'a str,
    #[serde(rename = "Week")]
    week: String,
    #[serde(rename = "Flash Est")]
    flash_est: f64,
    #[serde(rename = "Actuals")]
    actuals: f64,
    #[serde(rename = "Flash vs Act")]
    flash_vs_act: f64,
    #[serde(rename = "% Variance")]
    pct_variance: Option<f64>,
    #[serde(rename = "Accuracy")]
    accuracy: f64,
    #[serde(rename = "Month")]
    month: u32,
    #[serde(rename = "EOM")]
    eom: &'static str,
}

impl<'a> From<&'a ForecastRecord> for CsvRow<'a> {
    fn from(record: &'a ForecastRecord) -> Self {
        Self {
            financials: record.financial_type.as_str(),
            region: record.region.as_str(),
            week: record.week.format("%Y-%m-%d").to_string(),
            flash_est: record.flash_estimate,
            actuals: record.actual,
            flash_vs_act: record.variance,
            pct_variance: record.percent_variance,
            accuracy: record.accuracy,
            month: record.month,
            eom: if record.is_eom { "EOM" } else { "" },
        }
    }
}

// ==========================================
// CsvExporter
// ==========================================
pub struct CsvExporter;

impl CsvExporter {
    /// 按给定顺序写出记录（空列表也写表头）
    ///
    /// # 返回
    /// - Ok(n): 写出的数据行数
    pub fn write_records<W: Write>(records: &[ForecastRecord], writer: W) -> ExportResult<usize> {
        let mut csv_writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);

        csv_writer.write_record(CSV_HEADERS)?;
        for record in records {
            csv_writer.serialize(CsvRow::from(record))?;
        }
        csv_writer.flush()?;

        Ok(records.len())
    }

    /// 导出为内存中的 CSV 文本
    pub fn to_csv_string(records: &[ForecastRecord]) -> ExportResult<String> {
        let mut buf = Vec::new();
        Self::write_records(records, &mut buf)?;
        String::from_utf8(buf).map_err(|e| ExportError::EncodingError(e.to_string()))
    }

    /// 导出到文件（覆盖已存在文件）
    pub fn export_to_path(records: &[ForecastRecord], path: &Path) -> ExportResult<usize> {
        let file = std::fs::File::create(path)?;
        let count = Self::write_records(records, std::io::BufWriter::new(file))?;
        tracing::info!("CSV 导出完成: path={}, rows={}", path.display(), count);
        Ok(count)
    }
}
