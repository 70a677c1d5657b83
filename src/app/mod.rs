// ==========================================
// 周度 Flash 预测台账 - 应用层
// ==========================================
// 职责: 组装仓储与 API, 提供给 CLI 入口
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState, DB_PATH_ENV};
