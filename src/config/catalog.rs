// ==========================================
// 灾害救援物资分配引擎 - 需求目录与成本表
// ==========================================
// 职责: 进程级不可变配置,启动时加载一次
// 内容: 各等级需求下限 + 默认预算 / 单位成本 / 告警阈值 / 初始库存
// 红线: 配置非法时拒绝启动（配置不做降级）
// ==========================================

use crate::domain::alert::AlertThresholds;
use crate::domain::ledger::InventorySnapshot;
use crate::domain::types::{quantities, ResourceQuantities, ResourceType, SeverityLevel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

// ==========================================
// 默认配置常量
// ==========================================
pub mod defaults {
    use super::*;

    /// 单位成本 (food_kits, medical_units, shelters)
    pub const UNIT_COSTS: [f64; 3] = [10.0, 200.0, 500.0];

    /// 各等级默认预算
    pub const DEFAULT_BUDGET_LOW: f64 = 100_000.0;
    pub const DEFAULT_BUDGET_MEDIUM: f64 = 500_000.0;
    pub const DEFAULT_BUDGET_HIGH: f64 = 5_000_000.0;

    pub fn demand(level: SeverityLevel) -> ResourceQuantities {
        match level {
            SeverityLevel::Low => quantities(500, 20, 100),
            SeverityLevel::Medium => quantities(3_000, 120, 800),
            SeverityLevel::High => quantities(15_000, 500, 5_000),
        }
    }

    pub fn default_budget(level: SeverityLevel) -> f64 {
        match level {
            SeverityLevel::Low => DEFAULT_BUDGET_LOW,
            SeverityLevel::Medium => DEFAULT_BUDGET_MEDIUM,
            SeverityLevel::High => DEFAULT_BUDGET_HIGH,
        }
    }

    pub fn alert_thresholds() -> AlertThresholds {
        quantities(10_000, 500, 2_000)
    }

    pub fn initial_inventory() -> InventorySnapshot {
        quantities(50_000, 2_000, 10_000)
    }
}

// ==========================================
// 配置错误
// ==========================================
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件读取失败 (path={path}): {message}")]
    Unreadable { path: String, message: String },

    #[error("配置文件解析失败 (path={path}): {message}")]
    Malformed { path: String, message: String },

    #[error("配置校验失败 (field={field}): {message}")]
    Invalid { field: String, message: String },
}

impl ConfigError {
    fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

// ==========================================
// SeverityProfile - 单个等级的需求配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityProfile {
    /// 需求下限
    pub demand: ResourceQuantities,
    /// 默认预算（请求未指定时使用）
    pub default_budget: f64,
}

/// 需求目录: 等级 → 需求配置
pub type DemandCatalog = BTreeMap<SeverityLevel, SeverityProfile>;

/// 成本表: 资源 → 单位成本（可为小数）
pub type CostTable = BTreeMap<ResourceType, f64>;

// ==========================================
// AllocationConfig - 分配配置总表
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationConfig {
    pub catalog: DemandCatalog,
    pub costs: CostTable,
    pub thresholds: AlertThresholds,
    pub initial_inventory: InventorySnapshot,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        let catalog = SeverityLevel::ALL
            .into_iter()
            .map(|level| {
                (
                    level,
                    SeverityProfile {
                        demand: defaults::demand(level),
                        default_budget: defaults::default_budget(level),
                    },
                )
            })
            .collect();

        let costs = ResourceType::ALL
            .into_iter()
            .zip(defaults::UNIT_COSTS)
            .collect();

        Self {
            catalog,
            costs,
            thresholds: defaults::alert_thresholds(),
            initial_inventory: defaults::initial_inventory(),
        }
    }
}

impl AllocationConfig {
    /// 从 JSON 文件加载配置（缺失的段落使用默认值）
    ///
    /// # 返回
    /// - Ok(AllocationConfig): 已通过校验的配置
    /// - Err(ConfigError): 读取/解析/校验失败
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let config: AllocationConfig =
            serde_json::from_str(&raw).map_err(|e| ConfigError::Malformed {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        config.validate()?;
        tracing::info!(
            "已加载分配配置: path={}, severities={}",
            path.display(),
            config.catalog.len()
        );
        Ok(config)
    }

    /// 校验配置
    ///
    /// 规则:
    /// 1) 每类资源必须有成本,且为非负有限数
    /// 2) 需求下限非负
    /// 3) 默认预算为正的有限数
    /// 4) 告警阈值非负
    pub fn validate(&self) -> Result<(), ConfigError> {
        for resource in ResourceType::ALL {
            match self.costs.get(&resource) {
                None => {
                    return Err(ConfigError::invalid(
                        format!("costs.{}", resource),
                        "缺少单位成本",
                    ))
                }
                Some(c) if !c.is_finite() || *c < 0.0 => {
                    return Err(ConfigError::invalid(
                        format!("costs.{}", resource),
                        format!("单位成本必须为非负有限数, 实际={}", c),
                    ))
                }
                Some(_) => {}
            }
        }

        for (level, profile) in &self.catalog {
            if let Some((resource, qty)) = profile.demand.iter().find(|(_, q)| **q < 0) {
                return Err(ConfigError::invalid(
                    format!("catalog.{}.demand.{}", level, resource),
                    format!("需求下限不能为负, 实际={}", qty),
                ));
            }
            if !profile.default_budget.is_finite() || profile.default_budget <= 0.0 {
                return Err(ConfigError::invalid(
                    format!("catalog.{}.default_budget", level),
                    format!("默认预算必须为正数, 实际={}", profile.default_budget),
                ));
            }
        }

        if let Some((resource, t)) = self.thresholds.iter().find(|(_, t)| **t < 0) {
            return Err(ConfigError::invalid(
                format!("thresholds.{}", resource),
                format!("告警阈值不能为负, 实际={}", t),
            ));
        }

        Ok(())
    }

    /// 查询等级配置（目录中不存在时返回 None）
    pub fn profile(&self, level: SeverityLevel) -> Option<&SeverityProfile> {
        self.catalog.get(&level)
    }

    /// 某等级的最低所需成本 Σ cost[r] * demand[r]
    pub fn minimum_required(&self, level: SeverityLevel) -> Option<f64> {
        self.profile(level)
            .map(|p| minimum_cost(&self.costs, &p.demand))
    }
}

/// 计算 Σ cost[r] * quantity[r]（缺失成本按 0 计）
pub fn minimum_cost(costs: &CostTable, quantities: &ResourceQuantities) -> f64 {
    quantities
        .iter()
        .map(|(r, q)| costs.get(r).copied().unwrap_or(0.0) * (*q as f64))
        .sum()
}
