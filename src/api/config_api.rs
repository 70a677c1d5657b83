// ==========================================
// 周度 Flash 预测台账 - 配置管理 API
// ==========================================
// 职责: 配置查询、更新、快照
// ==========================================

use std::sync::Arc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::error::{ApiError, ApiResult};
use crate::config::config_manager::{config_keys, ConfigManager};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::repository::action_log_repo::ActionLogRepository;

/// 配置项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigItem {
    pub key: String,
    pub value: String,
}

// ==========================================
// ConfigApi - 配置管理 API
// ==========================================

/// 配置管理API
///
/// 职责：
/// 1. 配置查询（全部、单个）
/// 2. 配置更新（仅已知键, 带值校验）
/// 3. ActionLog记录
pub struct ConfigApi {
    config_manager: Arc<ConfigManager>,
    action_log_repo: Arc<ActionLogRepository>,
}

impl ConfigApi {
    /// 创建新的ConfigApi实例
    pub fn new(config_manager: Arc<ConfigManager>, action_log_repo: Arc<ActionLogRepository>) -> Self {
        Self {
            config_manager,
            action_log_repo,
        }
    }

    /// 查询所有配置（含未持久化键的默认值）
    pub fn list_configs(&self) -> ApiResult<Vec<ConfigItem>> {
        let mut items: Vec<ConfigItem> = Vec::new();
        for (key, default) in config_keys::DEFAULTS {
            items.push(ConfigItem {
                key: key.to_string(),
                value: self.config_manager.get_config_or_default(key, default)?,
            });
        }
        Ok(items)
    }

    /// 查询单个配置
    pub fn get_config(&self, key: &str) -> ApiResult<ConfigItem> {
        let default = config_keys::DEFAULTS
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
            .ok_or_else(|| ApiError::NotFound(format!("配置项{}不存在", key)))?;

        Ok(ConfigItem {
            key: key.to_string(),
            value: self.config_manager.get_config_or_default(key, default)?,
        })
    }

    /// 更新配置
    ///
    /// # 参数
    /// - key: 已知配置键
    /// - value: 新值
    /// - actor: 操作人
    pub fn update_config(&self, key: &str, value: &str, actor: &str) -> ApiResult<()> {
        if !config_keys::is_known(key) {
            return Err(ApiError::InvalidInput(format!("未知配置项: {}", key)));
        }
        Self::validate_value(key, value)?;

        let old_value = self.config_manager.get_config_value(key)?;
        self.config_manager.set_config_value(key, value.trim())?;

        let log = ActionLog::new(
            ActionType::UpdateConfig,
            actor,
            Some(json!({
                "key": key,
                "old_value": old_value,
                "new_value": value.trim(),
            })),
        );
        self.action_log_repo.insert(&log)?;

        tracing::info!("配置已更新: key={}, actor={}", key, actor);
        Ok(())
    }

    /// 配置快照（JSON）
    pub fn get_config_snapshot(&self) -> ApiResult<String> {
        Ok(self.config_manager.get_config_snapshot()?)
    }

    fn validate_value(key: &str, value: &str) -> ApiResult<()> {
        let trimmed = value.trim();
        match key {
            config_keys::EXPORT_FILE_NAME => {
                if trimmed.is_empty() {
                    return Err(ApiError::InvalidInput("导出文件名不能为空".to_string()));
                }
            }
            config_keys::LIST_MAX_ROWS => {
                trimmed.parse::<usize>().map_err(|_| {
                    ApiError::InvalidInput(format!("{} 必须是非负整数: {:?}", key, trimmed))
                })?;
            }
            _ => {}
        }
        Ok(())
    }
}
