// ==========================================
// 灾害救援物资分配引擎 - 分配 API
// ==========================================
// 流程:
// 1) 校验 + 求解（纯计算,无锁,可并发）
// 2) 仅 Optimal 结果进入台账事务（扣减库存 + 追加历史）
// 3) 持久化失败 → 整次分配失败,库存与历史均不变
// ==========================================

use std::sync::Arc;

use crate::api::error::ApiResult;
use crate::domain::allocation::{AllocationOutcome, AllocationRequest, AllocationResult};
use crate::domain::ledger::SeverityContext;
use crate::domain::types::SeverityLevel;
use crate::engine::{AllocationEngine, ValidationError};
use crate::repository::LedgerStore;

// ==========================================
// AllocationApi - 分配 API
// ==========================================
pub struct AllocationApi {
    engine: Arc<AllocationEngine>,
    store: Arc<dyn LedgerStore>,
}

impl AllocationApi {
    pub fn new(engine: Arc<AllocationEngine>, store: Arc<dyn LedgerStore>) -> Self {
        Self { engine, store }
    }

    /// 求解并提交分配
    ///
    /// # 返回
    /// - Ok(AllocationOutcome): Optimal 时带 entry_id 与扣减后库存；Infeasible 时两者为空
    /// - Err(ApiError::Validation): 输入非法,未求解
    /// - Err(ApiError::StorageError / ConcurrencyInvariantViolation): 提交失败,状态未变
    pub fn allocate(&self, request: &AllocationRequest) -> ApiResult<AllocationOutcome> {
        let result = self.engine.solve(request)?;

        if !result.is_optimal() {
            tracing::info!(
                severity = %result.severity,
                budget = result.budget,
                minimum_required = ?result.minimum_required,
                "预算不足,分配不可行"
            );
            return Ok(AllocationOutcome {
                result,
                entry_id: None,
                inventory_after: None,
            });
        }

        let context = SeverityContext {
            severity: request.severity.as_str().to_string(),
            confidence: request.confidence,
            feature_importance: request.feature_importance.clone(),
        };

        let committed = self
            .store
            .record_allocation(context, result.clone())
            .map_err(|e| {
                tracing::error!(error = %e, backend = self.store.backend_name(), "分配提交失败");
                e
            })?;

        tracing::info!(
            entry_id = %committed.entry.entry_id,
            severity = %result.severity,
            total_cost = ?result.total_cost,
            "分配已提交"
        );

        Ok(AllocationOutcome {
            result,
            entry_id: Some(committed.entry.entry_id),
            inventory_after: Some(committed.inventory),
        })
    }

    /// 按原始严重等级标签分配（大小写不敏感）
    pub fn allocate_labelled(&self, label: &str, budget: Option<f64>) -> ApiResult<AllocationOutcome> {
        let severity: SeverityLevel = label
            .parse()
            .map_err(|_| ValidationError::UnknownSeverity(label.to_string()))?;

        let mut request = AllocationRequest::new(severity);
        request.budget = budget;
        self.allocate(&request)
    }

    /// 仅求解,不触碰台账
    pub fn preview(&self, request: &AllocationRequest) -> ApiResult<AllocationResult> {
        Ok(self.engine.solve(request)?)
    }

    pub fn engine(&self) -> &AllocationEngine {
        &self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::ApiError;
    use crate::config::AllocationConfig;
    use crate::domain::types::quantities;
    use crate::repository::SqliteLedgerStore;

    fn api() -> (AllocationApi, Arc<dyn LedgerStore>) {
        let config = Arc::new(AllocationConfig::default());
        let store: Arc<dyn LedgerStore> =
            Arc::new(SqliteLedgerStore::open_in_memory(&config.initial_inventory).unwrap());
        let engine = Arc::new(AllocationEngine::new(config));
        (AllocationApi::new(engine, Arc::clone(&store)), store)
    }

    #[test]
    fn test_optimal_allocation_is_committed() {
        let (api, store) = api();
        let outcome = api
            .allocate(&AllocationRequest::new(SeverityLevel::Low).with_budget(100_000.0))
            .unwrap();

        assert!(outcome.result.is_optimal());
        assert!(outcome.entry_id.is_some());
        assert_eq!(outcome.inventory_after, Some(quantities(49_500, 1_980, 9_900)));
        assert_eq!(store.history().unwrap().len(), 1);
    }

    #[test]
    fn test_infeasible_allocation_changes_nothing() {
        let (api, store) = api();
        let before = store.inventory().unwrap();

        let outcome = api
            .allocate(&AllocationRequest::new(SeverityLevel::Low).with_budget(50_000.0))
            .unwrap();

        assert!(!outcome.result.is_optimal());
        assert_eq!(outcome.entry_id, None);
        assert_eq!(outcome.inventory_after, None);
        assert_eq!(store.inventory().unwrap(), before);
        assert!(store.history().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_budget_is_rejected_before_mutation() {
        let (api, store) = api();
        let err = api
            .allocate(&AllocationRequest::new(SeverityLevel::High).with_budget(0.0))
            .unwrap_err();

        assert!(matches!(err, ApiError::Validation(ValidationError::InvalidBudget(_))));
        assert!(store.history().unwrap().is_empty());
    }

    #[test]
    fn test_allocate_labelled() {
        let (api, _store) = api();
        let outcome = api.allocate_labelled("  medium ", None).unwrap();
        assert_eq!(outcome.result.severity, SeverityLevel::Medium);
        assert_eq!(outcome.result.budget, 500_000.0);

        let err = api.allocate_labelled("Catastrophic", None).unwrap_err();
        assert!(matches!(err, ApiError::Validation(ValidationError::UnknownSeverity(_))));
    }

    #[test]
    fn test_preview_does_not_touch_store() {
        let (api, store) = api();
        let result = api
            .preview(&AllocationRequest::new(SeverityLevel::High))
            .unwrap();

        assert!(result.is_optimal());
        assert_eq!(result.total_cost, Some(2_750_000.0));
        assert_eq!(store.inventory().unwrap(), quantities(50_000, 2_000, 10_000));
        assert!(store.history().unwrap().is_empty());
    }
}
