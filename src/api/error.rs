// ==========================================
// 灾害救援物资分配引擎 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，将仓储/配置/校验错误转换为调用方可理解的错误
// 分类:
// - 校验错误: 求解前拒绝,无状态变化
// - 存储错误: 读降级不上抛；写失败则整次分配失败
// - 并发不变量错误: 存储已熔断,需 recover 后才能继续变更
// ==========================================

use crate::config::ConfigError;
use crate::engine::ValidationError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 请求校验错误
    // ==========================================
    #[error("请求校验失败: {0}")]
    Validation(#[from] ValidationError),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("存储错误: {0}")]
    StorageError(String),

    #[error("并发不变量被破坏: {0}")]
    ConcurrencyInvariantViolation(String),

    // ==========================================
    // 配置错误
    // ==========================================
    #[error("配置错误: {0}")]
    ConfigError(String),

    // ==========================================
    // 业务错误
    // ==========================================
    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("内部错误: {0}")]
    InternalError(String),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::StoreFenced(msg) => {
                ApiError::ConcurrencyInvariantViolation(format!("存储已熔断: {}", msg))
            }
            RepositoryError::InvariantViolation(msg) => ApiError::ConcurrencyInvariantViolation(msg),
            RepositoryError::BusinessRuleViolation(msg) => ApiError::InternalError(msg),
            RepositoryError::StockOverflow(e) => ApiError::BusinessRuleViolation(e.to_string()),
            other => ApiError::StorageError(other.to_string()),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

/// API层Result类型别名
pub type ApiResult<T> = Result<T, ApiError>;
