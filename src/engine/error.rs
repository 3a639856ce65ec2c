// ==========================================
// 灾害救援物资分配引擎 - 引擎层校验错误
// ==========================================
// 在任何求解或状态变更之前拒绝,调用方可见,无副作用
// ==========================================

use crate::domain::types::ResourceType;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("未知的严重等级: {0}")]
    UnknownSeverity(String),

    #[error("无效预算: {0} (预算必须为正的有限数)")]
    InvalidBudget(f64),

    #[error("无效需求下限: resource={resource}, quantity={quantity}")]
    InvalidDemand { resource: ResourceType, quantity: i64 },
}
