// ==========================================
// 灾害救援物资分配引擎 - 核心库
// ==========================================
// 职责: 严重等级 + 预算 → 物资分配方案
//       方案落账到持久化库存台账,并派生统计与告警
// 技术栈: Rust + JSON 文档 / SQLite
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "en");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 台账存储
pub mod repository;

// 引擎层 - 求解 / 统计 / 告警
pub mod engine;

// 配置层 - 需求目录与运行时设置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - 生命周期
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    AlertLevel, AllocationOutcome, AllocationRequest, AllocationResult, AllocationStatus,
    HistoryEntry, InventorySnapshot, ResourceType, SeverityClassification, SeverityLevel,
};

// 引擎
pub use engine::{AlertEvaluator, AllocationEngine, AllocationSolver, FeasibilitySolver, StatsAggregator};

// 存储
pub use repository::{JsonFileLedgerStore, LedgerStore, SqliteLedgerStore};

// API
pub use api::{AllocationApi, ApiError, DashboardApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "灾害救援物资分配引擎";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
