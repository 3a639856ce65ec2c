// ==========================================
// 灾害救援物资分配引擎 - KPI 汇总
// ==========================================
// 输入: 同一临界区内读取的台账文档（库存 + 历史）
// 每次调用重新计算,不做缓存
// ==========================================

use crate::domain::alert::StatsSummary;
use crate::domain::ledger::LedgerDocument;
use crate::domain::types::SeverityLevel;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default)]
pub struct StatsAggregator;

impl StatsAggregator {
    pub fn new() -> Self {
        Self
    }

    /// 汇总 KPI
    ///
    /// - total_analyses: 历史条目数
    /// - total_cost: Σ 各条目 total_cost
    /// - total_resources_deployed: Σ 各条目各资源分配数量
    /// - severity_distribution: 按等级计数,无法识别的等级静默跳过
    /// - current_inventory: 库存快照
    pub fn summarize(&self, state: &LedgerDocument) -> StatsSummary {
        let mut severity_distribution: BTreeMap<SeverityLevel, usize> =
            SeverityLevel::ALL.into_iter().map(|s| (s, 0)).collect();

        let mut total_cost = 0.0;
        let mut total_resources_deployed = 0i64;

        for entry in &state.history {
            total_cost += entry.optimization.total_cost.unwrap_or(0.0);
            total_resources_deployed =
                total_resources_deployed.saturating_add(entry.optimization.total_quantity());

            if let Some(level) = entry.prediction.level() {
                *severity_distribution.entry(level).or_insert(0) += 1;
            }
        }

        StatsSummary {
            total_analyses: state.history.len(),
            total_cost,
            total_resources_deployed,
            severity_distribution,
            current_inventory: state.inventory.clone(),
        }
    }
}
