// ==========================================
// 灾害救援物资分配引擎 - 领域类型定义
// ==========================================
// 严重等级 / 资源类型 / 告警级别 均为封闭集合
// 未知取值属于校验错误,不是第四种情况
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ==========================================
// 灾害严重等级 (Severity Level)
// ==========================================
// 由外部分类器产出,本引擎只消费
// 顺序: Low < Medium < High
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SeverityLevel {
    Low,    // 轻度
    Medium, // 中度
    High,   // 重度
}

impl SeverityLevel {
    /// 全部等级（目录顺序）
    pub const ALL: [SeverityLevel; 3] = [SeverityLevel::Low, SeverityLevel::Medium, SeverityLevel::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityLevel::Low => "Low",
            SeverityLevel::Medium => "Medium",
            SeverityLevel::High => "High",
        }
    }
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 解析严重等级标签（忽略大小写与首尾空白）
///
/// 失败时返回原始标签,由调用方转换为 `UnknownSeverity`
impl FromStr for SeverityLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(SeverityLevel::Low),
            "medium" => Ok(SeverityLevel::Medium),
            "high" => Ok(SeverityLevel::High),
            _ => Err(s.to_string()),
        }
    }
}

// ==========================================
// 资源类型 (Resource Type)
// ==========================================
// 固定三类,有序；BTreeMap 的键顺序即目录顺序
// 序列化格式: snake_case (与持久化文档一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    FoodKits,     // 食品包
    MedicalUnits, // 医疗单元
    Shelters,     // 帐篷/庇护所
}

impl ResourceType {
    /// 全部资源类型（目录顺序）
    pub const ALL: [ResourceType; 3] = [
        ResourceType::FoodKits,
        ResourceType::MedicalUnits,
        ResourceType::Shelters,
    ];

    /// 存储键（与 serde 名称一致）
    pub fn as_key(&self) -> &'static str {
        match self {
            ResourceType::FoodKits => "food_kits",
            ResourceType::MedicalUnits => "medical_units",
            ResourceType::Shelters => "shelters",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        ResourceType::ALL.into_iter().find(|r| r.as_key() == key)
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_key())
    }
}

// ==========================================
// 告警级别 (Alert Level)
// ==========================================
// 顺序: Warning < Critical
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Warning,  // 低于阈值
    Critical, // 已耗尽（库存 <= 0）
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertLevel::Warning => write!(f, "warning"),
            AlertLevel::Critical => write!(f, "critical"),
        }
    }
}

// ==========================================
// 资源数量映射
// ==========================================

/// 资源 → 整数数量（需求下限 / 分配方案 / 库存快照 共用）
pub type ResourceQuantities = BTreeMap<ResourceType, i64>;

/// 构造完整的资源数量映射（按目录顺序）
pub fn quantities(food_kits: i64, medical_units: i64, shelters: i64) -> ResourceQuantities {
    ResourceType::ALL
        .into_iter()
        .zip([food_kits, medical_units, shelters])
        .collect()
}
