// ==========================================
// 灾害救援物资分配引擎 - 看板 API
// ==========================================
// 职责: 库存 / 历史 / 统计 / 告警 的只读查询
// 统计与告警每次现算,不缓存
// ==========================================

use std::sync::Arc;

use crate::api::error::ApiResult;
use crate::domain::alert::{Alert, StatsSummary};
use crate::domain::ledger::{HistoryEntry, InventorySnapshot};
use crate::engine::{AlertEvaluator, StatsAggregator};
use crate::repository::LedgerStore;

// ==========================================
// DashboardApi - 看板 API
// ==========================================
pub struct DashboardApi {
    store: Arc<dyn LedgerStore>,
    stats: StatsAggregator,
    alerts: AlertEvaluator,
}

impl DashboardApi {
    pub fn new(store: Arc<dyn LedgerStore>, alerts: AlertEvaluator) -> Self {
        Self {
            store,
            stats: StatsAggregator::new(),
            alerts,
        }
    }

    /// 当前库存快照
    pub fn get_inventory(&self) -> ApiResult<InventorySnapshot> {
        Ok(self.store.inventory()?)
    }

    /// 全部历史（最早在前）
    pub fn list_history(&self) -> ApiResult<Vec<HistoryEntry>> {
        Ok(self.store.history()?)
    }

    /// KPI 汇总
    ///
    /// 库存与历史取自同一次读取,保证汇总值与历史长度一致
    pub fn get_stats(&self) -> ApiResult<StatsSummary> {
        let state = self.store.state()?;
        Ok(self.stats.summarize(&state))
    }

    /// 活动告警（目录顺序）
    pub fn get_alerts(&self) -> ApiResult<Vec<Alert>> {
        let inventory = self.store.inventory()?;
        Ok(self.alerts.evaluate(&inventory))
    }
}
