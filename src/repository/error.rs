// ==========================================
// 灾害救援物资分配引擎 - 仓储层错误类型
// ==========================================
// 读失败: 降级为默认状态并记录日志（不经由本类型上抛）
// 写失败: 整个事务中止,作为致命错误返回调用方
// 工具: thiserror 派生宏
// ==========================================

use crate::domain::ledger::StockOverflow;
use thiserror::Error;

/// 仓储层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== 存储错误 =====
    #[error("存储读取失败: {0}")]
    StorageRead(String),

    #[error("存储写入失败: {0}")]
    StorageWrite(String),

    #[error("序列化失败: {0}")]
    Serialization(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    // ===== 并发控制错误 =====
    #[error("并发不变量被破坏: {0}")]
    InvariantViolation(String),

    #[error("存储已熔断,拒绝变更,需先恢复: {0}")]
    StoreFenced(String),

    // ===== 业务规则错误 =====
    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error(transparent)]
    StockOverflow(#[from] StockOverflow),
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        RepositoryError::DatabaseQueryError(err.to_string())
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for RepositoryError {
    fn from(err: std::io::Error) -> Self {
        RepositoryError::StorageWrite(err.to_string())
    }
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;
