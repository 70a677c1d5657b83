// ==========================================
// 周度 Flash 预测台账 - 引擎层
// ==========================================
// 职责: 实现业务规则,不拼 SQL
// ==========================================

pub mod eom;
pub mod metrics;

// 重导出核心引擎
pub use eom::{select_eom_id, EomInspector, EomViolation};
pub use metrics::compute_metrics;
