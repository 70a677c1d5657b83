// ==========================================
// 周度 Flash 预测台账 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: Revenue/EBITDA 周度 Flash 预测录入, 派生准确率指标, 维护 EOM 标记
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 导出层 - CSV
pub mod exporter;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/schema）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 状态组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

pub use domain::{
    ActionLog, ActionType, EomGroup, FinancialType, ForecastFilter, ForecastMetrics,
    ForecastRecord, NewForecast, Region,
};

pub use engine::{compute_metrics, EomInspector, EomViolation};

pub use api::{ApiError, ApiResult, ConfigApi, ForecastApi, RawForecastForm};

pub use app::AppState;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "Weekly Revenue & EBITDA Forecast";
