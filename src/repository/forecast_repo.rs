// ==========================================
// 周度 Flash 预测台账 - 预测记录数据仓储
// ==========================================
// 对齐: forecast_record 表
// 红线: 插入 + EOM 维护 必须在同一事务内提交
// ==========================================

mod core;
mod queries;


pub use core::ForecastRepository;
