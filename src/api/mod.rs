// ==========================================
// 周度 Flash 预测台账 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供 CLI / 前端调用
// ==========================================

pub mod config_api;
pub mod error;
pub mod forecast_api;
pub mod validator;

// 重导出核心类型
pub use config_api::{ConfigApi, ConfigItem};
pub use error::{ApiError, ApiResult};
pub use forecast_api::ForecastApi;
pub use validator::{ForecastInputValidator, RawForecastForm};
