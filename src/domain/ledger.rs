// ==========================================
// 灾害救援物资分配引擎 - 库存台账与历史记录
// ==========================================
// 台账: 资源 → 整数库存（允许为负,不做下限截断）
// 历史: 只追加,条目一经写入不再修改
// 持久化: 单个带版本号的文档 {version, inventory, history}
// ==========================================

use crate::domain::allocation::{AllocationResult, ResourcePlan, SeverityClassification};
use crate::domain::types::{ResourceQuantities, ResourceType, SeverityLevel};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// 库存快照（不可变副本）
pub type InventorySnapshot = ResourceQuantities;

/// 当前持久化文档版本
pub const LEDGER_DOCUMENT_VERSION: u32 = 1;

// ==========================================
// SeverityContext - 历史中记录的分类上下文
// ==========================================
// severity 以原始字符串保存: 统计时无法识别的等级静默跳过
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityContext {
    pub severity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_importance: Option<BTreeMap<String, f64>>,
}

impl SeverityContext {
    pub fn new(level: SeverityLevel) -> Self {
        Self {
            severity: level.as_str().to_string(),
            confidence: None,
            feature_importance: None,
        }
    }

    /// 解析为封闭集合内的等级（无法识别返回 None）
    pub fn level(&self) -> Option<SeverityLevel> {
        self.severity.parse().ok()
    }

    /// 去掉非有限值（NaN / ±inf）
    ///
    /// JSON 无法表示非有限浮点数,不清理则内存状态与落盘文档不一致
    pub fn finite_only(mut self) -> Self {
        self.confidence = self.confidence.filter(|c| c.is_finite());
        if let Some(features) = self.feature_importance.as_mut() {
            features.retain(|_, v| v.is_finite());
        }
        self
    }
}

impl From<&SeverityClassification> for SeverityContext {
    fn from(c: &SeverityClassification) -> Self {
        Self {
            severity: c.level.as_str().to_string(),
            confidence: c.confidence,
            feature_importance: c.feature_importance.clone(),
        }
    }
}

// ==========================================
// HistoryEntry - 历史条目
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub entry_id: String,
    /// 严格递增的 UTC 时间戳
    pub timestamp: DateTime<Utc>,
    pub prediction: SeverityContext,
    pub optimization: AllocationResult,
}

impl HistoryEntry {
    /// 生成新条目
    ///
    /// 时间戳取 max(now, previous + 1µs),保证插入顺序与时间顺序一致
    pub fn stamp(
        previous: Option<&HistoryEntry>,
        prediction: SeverityContext,
        optimization: AllocationResult,
    ) -> Self {
        Self::stamp_after(previous.map(|p| p.timestamp), prediction, optimization)
    }

    /// 同 `stamp`,但只需上一条的时间戳
    pub fn stamp_after(
        previous: Option<DateTime<Utc>>,
        prediction: SeverityContext,
        optimization: AllocationResult,
    ) -> Self {
        let now = Utc::now();
        let timestamp = match previous {
            Some(prev) if now <= prev => prev + Duration::microseconds(1),
            _ => now,
        };

        Self {
            entry_id: uuid::Uuid::new_v4().to_string(),
            timestamp,
            prediction: prediction.finite_only(),
            optimization,
        }
    }
}

// ==========================================
// LedgerDocument - 持久化文档
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerDocument {
    #[serde(default = "default_document_version")]
    pub version: u32,
    pub inventory: InventorySnapshot,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

fn default_document_version() -> u32 {
    LEDGER_DOCUMENT_VERSION
}

impl LedgerDocument {
    /// 默认初始状态: 初始库存 + 空历史
    pub fn initial(inventory: InventorySnapshot) -> Self {
        Self {
            version: LEDGER_DOCUMENT_VERSION,
            inventory,
            history: Vec::new(),
        }
    }

    /// 补齐缺失的资源键（取初始库存值）
    ///
    /// # 返回
    /// - 被补齐的资源列表（便于上层记录告警日志）
    pub fn fill_missing_resources(&mut self, initial: &InventorySnapshot) -> Vec<ResourceType> {
        let mut filled = Vec::new();
        for r in ResourceType::ALL {
            if !self.inventory.contains_key(&r) {
                self.inventory.insert(r, initial.get(&r).copied().unwrap_or(0));
                filled.push(r);
            }
        }
        filled
    }
}

/// 扣减超出 i64 表示范围
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("库存扣减越界: resource={resource}, stock={stock}, quantity={quantity}")]
pub struct StockOverflow {
    pub resource: ResourceType,
    pub stock: i64,
    pub quantity: i64,
}

/// 单项扣减: stock - quantity（允许为负,越界报错）
pub fn deduct_quantity(resource: ResourceType, stock: i64, quantity: i64) -> Result<i64, StockOverflow> {
    stock.checked_sub(quantity).ok_or(StockOverflow {
        resource,
        stock,
        quantity,
    })
}

/// 将方案从库存中扣减（不截断,允许变为负数）
///
/// 任一资源越界则整体不生效
pub fn deduct_plan(inventory: &mut InventorySnapshot, plan: &ResourcePlan) -> Result<(), StockOverflow> {
    let mut updated = Vec::with_capacity(plan.len());
    for (resource, qty) in plan {
        let stock = inventory.get(resource).copied().unwrap_or(0);
        updated.push((*resource, deduct_quantity(*resource, stock, *qty)?));
    }
    inventory.extend(updated);
    Ok(())
}
