// ==========================================
// 周度 Flash 预测台账 - 预测 API
// ==========================================
// 流程: 输入校验 → 指标计算 → 持久化 + EOM 重算（单事务）→ 读回
// ==========================================

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::instrument;

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::{ForecastInputValidator, RawForecastForm};
use crate::config::config_manager::ConfigManager;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::forecast::{EomGroup, ForecastFilter, ForecastRecord, NewForecast};
use crate::engine::{compute_metrics, EomInspector, EomViolation};
use crate::exporter::CsvExporter;
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::forecast_repo::ForecastRepository;

// ==========================================
// ForecastApi - 预测 API
// ==========================================

/// 预测API
///
/// 职责：
/// 1. 提交预测（校验、计算派生指标、落库并维护 EOM）
/// 2. 读回预测表（week 倒序）
/// 3. EOM 维护（单组重算、全量重建、巡检）
/// 4. CSV 导出
pub struct ForecastApi {
    forecast_repo: Arc<ForecastRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    config_manager: Arc<ConfigManager>,
    eom_inspector: EomInspector,
}

impl ForecastApi {
    /// 创建新的ForecastApi实例
    pub fn new(
        forecast_repo: Arc<ForecastRepository>,
        action_log_repo: Arc<ActionLogRepository>,
        config_manager: Arc<ConfigManager>,
    ) -> Self {
        Self {
            forecast_repo,
            action_log_repo,
            config_manager,
            eom_inspector: EomInspector::new(),
        }
    }

    // ==========================================
    // 提交
    // ==========================================

    /// 提交原始表单
    pub fn submit_form(&self, form: &RawForecastForm, actor: &str) -> ApiResult<ForecastRecord> {
        let input = ForecastInputValidator::parse_form(form)?;
        self.submit(&input, actor)
    }

    /// 提交预测
    ///
    /// # 返回
    /// - Ok(ForecastRecord): 已提交的记录（含派生字段与 EOM 标记）
    /// - Err(ApiError::ValidationError): 输入非法, 未触达存储
    /// - Err(存储错误): 提交未发生, 无部分写入
    #[instrument(skip(self, input), fields(group = %input.group(), week = %input.week))]
    pub fn submit(&self, input: &NewForecast, actor: &str) -> ApiResult<ForecastRecord> {
        ForecastInputValidator::validate(input)?;

        let metrics = compute_metrics(input.flash_estimate, input.actual);

        let payload = serde_json::to_value(input)
            .map_err(|e| ApiError::InternalError(format!("操作日志序列化失败: {}", e)))?;
        let audit = ActionLog::new(ActionType::SubmitForecast, actor, Some(payload))
            .with_detail(format!("提交预测: {}", input.group()));

        let record = self
            .forecast_repo
            .insert_with_eom(input, &metrics, Some(&audit))?;

        Ok(record)
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 读回预测表
    ///
    /// 未指定 limit 时使用配置 list.max_rows（0 = 不限制）
    pub fn list_records(&self, filter: Option<ForecastFilter>) -> ApiResult<Vec<ForecastRecord>> {
        let mut filter = filter.unwrap_or_default();
        if filter.limit.is_none() {
            filter.limit = self.config_manager.list_max_rows()?;
        }
        Ok(self.forecast_repo.list(&filter)?)
    }

    /// 按 id 查询
    pub fn get_record(&self, id: i64) -> ApiResult<ForecastRecord> {
        self.forecast_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::NotFound(format!("ForecastRecord(id={})不存在", id)))
    }

    /// 查询分组当前的 EOM 记录
    pub fn get_eom_record(&self, group: &EomGroup) -> ApiResult<Option<ForecastRecord>> {
        Ok(self.forecast_repo.find_eom_record(group)?)
    }

    /// 最近操作日志
    pub fn list_recent_actions(&self, limit: i32) -> ApiResult<Vec<ActionLog>> {
        if limit <= 0 {
            return Err(ApiError::InvalidInput(format!("limit 必须为正数: {}", limit)));
        }
        Ok(self.action_log_repo.find_recent(limit)?)
    }

    // ==========================================
    // EOM 维护
    // ==========================================

    /// 单组 EOM 重算（幂等）
    pub fn recompute_group_eom(
        &self,
        group: &EomGroup,
        actor: &str,
    ) -> ApiResult<Option<ForecastRecord>> {
        let audit = ActionLog::new(ActionType::RecomputeEom, actor, None)
            .with_detail(format!("单组 EOM 重算: {}", group));

        match self.forecast_repo.recompute_group_eom(group, Some(&audit))? {
            Some(id) => Ok(Some(self.get_record(id)?)),
            None => Ok(None),
        }
    }

    /// 全量 EOM 重建
    ///
    /// # 返回
    /// - Ok(n): 处理的分组数
    pub fn rebuild_all_eom(&self, actor: &str) -> ApiResult<usize> {
        let audit = ActionLog::new(ActionType::RebuildEom, actor, None)
            .with_detail("全量 EOM 重建");
        Ok(self.forecast_repo.rebuild_all_eom(Some(&audit))?)
    }

    /// EOM 不变量巡检（只读）
    ///
    /// # 返回
    /// - Ok(vec![]): 每个分组恰好一条 EOM 且为最新 week
    /// - Ok(violations): 违反明细
    pub fn verify_eom(&self) -> ApiResult<Vec<EomViolation>> {
        let records = self.forecast_repo.list(&ForecastFilter::default())?;
        let violations = self.eom_inspector.inspect(&records);
        if !violations.is_empty() {
            tracing::warn!("EOM 巡检发现 {} 个分组不一致", violations.len());
        }
        Ok(violations)
    }

    // ==========================================
    // 导出
    // ==========================================

    /// 导出全表为 CSV 文本
    pub fn export_csv_string(&self) -> ApiResult<String> {
        let records = self.forecast_repo.list(&ForecastFilter::default())?;
        Ok(CsvExporter::to_csv_string(&records)?)
    }

    /// 导出全表到文件
    ///
    /// # 参数
    /// - path: 目标路径; None 时使用配置 export.file_name（当前目录）
    ///
    /// # 返回
    /// - Ok((path, rows)): 实际写入路径与行数
    pub fn export_csv(&self, path: Option<&Path>) -> ApiResult<(PathBuf, usize)> {
        let target = match path {
            Some(p) => p.to_path_buf(),
            None => PathBuf::from(self.config_manager.export_file_name()?),
        };

        let records = self.forecast_repo.list(&ForecastFilter::default())?;
        let rows = CsvExporter::export_to_path(&records, &target)?;
        Ok((target, rows))
    }
}
