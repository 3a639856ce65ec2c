// ==========================================
// 灾害救援物资分配引擎 - 库存告警与统计模型
// ==========================================

use crate::domain::ledger::InventorySnapshot;
use crate::domain::types::{AlertLevel, ResourceType, SeverityLevel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 告警阈值: 资源 → 预警库存线
pub type AlertThresholds = BTreeMap<ResourceType, i64>;

// ==========================================
// Alert - 库存告警
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub level: AlertLevel,
    pub resource: ResourceType,
    pub current: i64,
    pub threshold: i64,
    pub message: String,
}

// ==========================================
// StatsSummary - KPI 汇总
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    pub total_analyses: usize,
    pub total_cost: f64,
    pub total_resources_deployed: i64,
    /// 三个等级始终存在（无记录时为 0）
    pub severity_distribution: BTreeMap<SeverityLevel, usize>,
    pub current_inventory: InventorySnapshot,
}
