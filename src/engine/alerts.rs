// ==========================================
// 灾害救援物资分配引擎 - 库存告警评估
// ==========================================
// 规则（按目录顺序逐资源判定）:
// 1) stock <= 0          → critical（已耗尽）
// 2) stock < threshold   → warning（低于阈值）
// 3) 其他                → 无告警
// 负库存同样适用规则 1
// ==========================================

use crate::domain::alert::{Alert, AlertThresholds};
use crate::domain::ledger::InventorySnapshot;
use crate::domain::types::{AlertLevel, ResourceType};
use crate::i18n;

pub struct AlertEvaluator {
    thresholds: AlertThresholds,
}

impl AlertEvaluator {
    pub fn new(thresholds: AlertThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &AlertThresholds {
        &self.thresholds
    }

    /// 评估库存快照
    ///
    /// # 返回
    /// - 告警列表（目录顺序）；空列表表示无活动告警
    ///
    /// # 说明
    /// - 快照中缺失的资源按库存 0 处理
    /// - 未配置阈值的资源只做耗尽判定
    pub fn evaluate(&self, inventory: &InventorySnapshot) -> Vec<Alert> {
        ResourceType::ALL
            .into_iter()
            .filter_map(|resource| {
                let current = inventory.get(&resource).copied().unwrap_or(0);
                let threshold = self.thresholds.get(&resource).copied().unwrap_or(0);
                classify(current, threshold).map(|level| Alert {
                    level,
                    resource,
                    current,
                    threshold,
                    message: alert_message(level, resource, current, threshold),
                })
            })
            .collect()
    }
}

fn classify(current: i64, threshold: i64) -> Option<AlertLevel> {
    if current <= 0 {
        Some(AlertLevel::Critical)
    } else if current < threshold {
        Some(AlertLevel::Warning)
    } else {
        None
    }
}

fn alert_message(level: AlertLevel, resource: ResourceType, current: i64, threshold: i64) -> String {
    match level {
        AlertLevel::Critical => i18n::depleted_message(resource),
        AlertLevel::Warning => i18n::below_threshold_message(
            resource,
            &format_thousands(threshold),
            &format_thousands(current),
        ),
    }
}

/// 千分位格式化: 9999 → "9,999", -12000 → "-12,000"
pub fn format_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if value < 0 {
        out.insert(0, '-');
    }
    out
}
