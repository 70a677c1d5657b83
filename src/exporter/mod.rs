// ==========================================
// 周度 Flash 预测台账 - 导出层
// ==========================================
// 职责: 将读回的预测表序列化为 CSV
// 红线: 纯序列化, 不重算任何派生字段
// ==========================================

pub mod csv_exporter;
pub mod error;

pub use csv_exporter::{CsvExporter, CSV_HEADERS};
pub use error::{ExportError, ExportResult};
