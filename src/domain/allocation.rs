// ==========================================
// 灾害救援物资分配引擎 - 分配领域模型
// ==========================================
// 输入: 分类器结果 + 分配请求
// 输出: AllocationResult (Optimal / Infeasible)
// ==========================================

use crate::domain::types::{ResourceQuantities, SeverityLevel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 分配方案: 资源 → 分配数量
pub type ResourcePlan = ResourceQuantities;

// ==========================================
// SeverityClassification - 外部分类器输出
// ==========================================
// 本引擎不校验也不产出,只消费 level
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeverityClassification {
    pub level: SeverityLevel,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub feature_importance: Option<BTreeMap<String, f64>>,
}

// ==========================================
// AllocationRequest - 分配请求
// ==========================================
// 优先级: 请求显式值 > 严重等级默认值
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationRequest {
    pub severity: SeverityLevel,

    /// 预算（缺省时使用目录中该等级的默认预算）
    #[serde(default)]
    pub budget: Option<f64>,

    /// 需求下限覆写（整体替换目录下限,缺失的资源视为 0）
    #[serde(default)]
    pub demand_override: Option<ResourceQuantities>,

    /// 分类置信度（仅记录到历史）
    #[serde(default)]
    pub confidence: Option<f64>,

    /// 特征重要性（仅记录到历史）
    #[serde(default)]
    pub feature_importance: Option<BTreeMap<String, f64>>,
}

impl AllocationRequest {
    pub fn new(severity: SeverityLevel) -> Self {
        Self {
            severity,
            budget: None,
            demand_override: None,
            confidence: None,
            feature_importance: None,
        }
    }

    pub fn with_budget(mut self, budget: f64) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn with_demand_override(mut self, demand: ResourceQuantities) -> Self {
        self.demand_override = Some(demand);
        self
    }

    /// 由分类器结果构造请求（携带置信度等上下文）
    pub fn from_classification(classification: &SeverityClassification, budget: Option<f64>) -> Self {
        Self {
            severity: classification.level,
            budget,
            demand_override: None,
            confidence: classification.confidence,
            feature_importance: classification.feature_importance.clone(),
        }
    }
}

// ==========================================
// AllocationStatus - 求解状态
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllocationStatus {
    Optimal,
    Infeasible,
}

// ==========================================
// AllocationResult - 分配结果
// ==========================================
// 不变量:
// - Optimal: plan / total_cost 存在, minimum_required 缺省
// - Infeasible: 仅 minimum_required 存在, 且 minimum_required > budget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationResult {
    pub status: AllocationStatus,
    pub severity: SeverityLevel,
    /// 实际使用的预算（请求值或默认值）
    pub budget: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<ResourcePlan>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_required: Option<f64>,
}

impl AllocationResult {
    pub fn optimal(severity: SeverityLevel, budget: f64, plan: ResourcePlan, total_cost: f64) -> Self {
        Self {
            status: AllocationStatus::Optimal,
            severity,
            budget,
            plan: Some(plan),
            total_cost: Some(total_cost),
            minimum_required: None,
        }
    }

    pub fn infeasible(severity: SeverityLevel, budget: f64, minimum_required: f64) -> Self {
        Self {
            status: AllocationStatus::Infeasible,
            severity,
            budget,
            plan: None,
            total_cost: None,
            minimum_required: Some(minimum_required),
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.status == AllocationStatus::Optimal
    }

    /// 方案中全部资源数量之和（Infeasible 为 0,越界时饱和）
    pub fn total_quantity(&self) -> i64 {
        self.plan
            .as_ref()
            .map(|p| p.values().fold(0i64, |acc, q| acc.saturating_add(*q)))
            .unwrap_or(0)
    }
}

// ==========================================
// AllocationOutcome - 分配调用返回
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationOutcome {
    pub result: AllocationResult,
    /// 写入历史的条目 ID（Infeasible 时为 None）
    pub entry_id: Option<String>,
    /// 扣减后的库存快照（Infeasible 时为 None）
    pub inventory_after: Option<ResourceQuantities>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::quantities;

    #[test]
    fn test_infeasible_result_omits_plan_fields() {
        let r = AllocationResult::infeasible(SeverityLevel::Low, 50_000.0, 59_000.0);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["status"], "Infeasible");
        assert_eq!(json["minimum_required"], 59_000.0);
        assert!(json.get("plan").is_none());
        assert!(json.get("total_cost").is_none());
        assert_eq!(r.total_quantity(), 0);
    }

    #[test]
    fn test_optimal_total_quantity() {
        let r = AllocationResult::optimal(SeverityLevel::Low, 100_000.0, quantities(500, 20, 100), 59_000.0);
        assert!(r.is_optimal());
        assert_eq!(r.total_quantity(), 620);

        let huge = AllocationResult::optimal(SeverityLevel::Low, 1e20, quantities(i64::MAX, 5, 0), 1e19);
        assert_eq!(huge.total_quantity(), i64::MAX);
    }

    #[test]
    fn test_request_from_classification_keeps_context() {
        let c = SeverityClassification {
            level: SeverityLevel::High,
            confidence: Some(0.87),
            feature_importance: None,
        };
        let req = AllocationRequest::from_classification(&c, Some(3_000_000.0));
        assert_eq!(req.severity, SeverityLevel::High);
        assert_eq!(req.confidence, Some(0.87));
        assert_eq!(req.budget, Some(3_000_000.0));
    }
}
