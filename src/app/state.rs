// ==========================================
// 灾害救援物资分配引擎 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 生命周期:
// - new: 加载配置 → 打开台账存储 → 装配 API
// - shutdown: 记录最终库存后释放存储（所有写入在返回前已落盘）
// ==========================================

use std::sync::Arc;

use crate::api::{AllocationApi, ApiResult, DashboardApi};
use crate::config::{AllocationConfig, RuntimeSettings};
use crate::engine::{AlertEvaluator, AllocationEngine};
use crate::repository::{open_ledger_store, LedgerStore};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 运行时设置（存储路径 / 后端 / 配置文件）
    pub settings: RuntimeSettings,

    /// 不可变分配配置
    pub config: Arc<AllocationConfig>,

    /// 台账存储
    pub store: Arc<dyn LedgerStore>,

    /// 分配API
    pub allocation_api: Arc<AllocationApi>,

    /// 看板API
    pub dashboard_api: Arc<DashboardApi>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(ApiError::ConfigError): 配置文件不可读或未通过校验（配置不降级）
    /// - Err(ApiError::StorageError): 存储无法打开且无法重建
    pub fn new(settings: RuntimeSettings) -> ApiResult<Self> {
        tracing::info!(
            "初始化AppState，存储路径: {}, 后端: {}",
            settings.store_path.display(),
            settings.backend
        );

        let config = match &settings.config_path {
            Some(path) => AllocationConfig::load_from_file(path)?,
            None => {
                let config = AllocationConfig::default();
                config.validate()?;
                config
            }
        };
        let config = Arc::new(config);

        let store = open_ledger_store(settings.backend, &settings.store_path, &config.initial_inventory)?;

        Ok(Self::from_parts(settings, config, store))
    }

    /// 由已打开的组件装配（测试中可注入任意存储实现）
    pub fn from_parts(
        settings: RuntimeSettings,
        config: Arc<AllocationConfig>,
        store: Arc<dyn LedgerStore>,
    ) -> Self {
        let engine = Arc::new(AllocationEngine::new(Arc::clone(&config)));
        let allocation_api = Arc::new(AllocationApi::new(engine, Arc::clone(&store)));
        let dashboard_api = Arc::new(DashboardApi::new(
            Arc::clone(&store),
            AlertEvaluator::new(config.thresholds.clone()),
        ));

        tracing::info!("AppState初始化完成, backend={}", store.backend_name());

        Self {
            settings,
            config,
            store,
            allocation_api,
            dashboard_api,
        }
    }

    /// 关闭应用
    pub fn shutdown(self) {
        match self.store.inventory() {
            Ok(inventory) => tracing::info!(?inventory, "关闭台账存储, 最终库存"),
            Err(e) => tracing::warn!(error = %e, "关闭前读取库存失败"),
        }
        drop(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreBackend;
    use crate::domain::allocation::AllocationRequest;
    use crate::domain::types::SeverityLevel;
    use tempfile::TempDir;

    #[test]
    fn test_state_survives_restart() {
        let dir = TempDir::new().unwrap();
        let settings = RuntimeSettings::new(dir.path().join("ledger.json"), StoreBackend::JsonFile);

        let state = AppState::new(settings.clone()).unwrap();
        state
            .allocation_api
            .allocate(&AllocationRequest::new(SeverityLevel::Medium))
            .unwrap();
        state.shutdown();

        let state = AppState::new(settings).unwrap();
        assert_eq!(state.dashboard_api.list_history().unwrap().len(), 1);
        assert_eq!(state.dashboard_api.get_stats().unwrap().total_cost, 454_000.0);
    }

    #[test]
    fn test_invalid_config_file_fails_startup() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("allocation.json");
        std::fs::write(&config_path, r#"{"costs": {"food_kits": -1.0}}"#).unwrap();

        let mut settings = RuntimeSettings::new(dir.path().join("ledger.db"), StoreBackend::Sqlite);
        settings.config_path = Some(config_path);

        assert!(AppState::new(settings).is_err());
    }
}
