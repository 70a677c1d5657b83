// ==========================================
// 周度 Flash 预测台账 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 生命周期: 启动时打开, 进程退出时随 Drop 关闭
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{ApiError, ApiResult, ConfigApi, ForecastApi};
use crate::config::config_manager::ConfigManager;
use crate::db::{ensure_schema, open_sqlite_connection};
use crate::repository::{ActionLogRepository, ForecastRepository};

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "FLASH_FORECAST_DB_PATH";

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 预测API
    pub forecast_api: Arc<ForecastApi>,

    /// 配置管理API
    pub config_api: Arc<ConfigApi>,

    /// 操作日志仓储（用于审计追踪）
    pub action_log_repo: Arc<ActionLogRepository>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径（":memory:" 为内存库）
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(ApiError): 存储不可用（is_storage_error() 为 true）
    pub fn new(db_path: String) -> ApiResult<Self> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        // 创建数据库连接（共享连接）
        let conn = open_sqlite_connection(&db_path).map_err(|e| {
            ApiError::DatabaseConnectionError(format!("无法打开数据库 {}: {}", db_path, e))
        })?;
        ensure_schema(&conn).map_err(|e| {
            ApiError::DatabaseConnectionError(format!("无法初始化schema: {}", e))
        })?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let forecast_repo = Arc::new(ForecastRepository::new(conn.clone()));
        let action_log_repo = Arc::new(ActionLogRepository::new(conn.clone()));
        let config_manager = Arc::new(ConfigManager::new(conn));

        // ==========================================
        // 初始化API层
        // ==========================================
        let forecast_api = Arc::new(ForecastApi::new(
            forecast_repo,
            action_log_repo.clone(),
            config_manager.clone(),
        ));
        let config_api = Arc::new(ConfigApi::new(config_manager, action_log_repo.clone()));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            forecast_api,
            config_api,
            action_log_repo,
        })
    }
}

/// 获取默认数据库路径
///
/// 优先级: 环境变量 → 用户数据目录 → 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    // 允许通过环境变量显式指定 DB 路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./flash_forecast.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("flash-forecast");
        match std::fs::create_dir_all(&dir) {
            Ok(()) => path = dir.join("flash_forecast.db"),
            Err(e) => {
                tracing::warn!("无法创建数据目录 {}，改用当前目录: {}", dir.display(), e);
            }
        }
    }

    path.to_string_lossy().to_string()
}
