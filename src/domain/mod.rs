// ==========================================
// 灾害救援物资分配引擎 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod alert;
pub mod allocation;
pub mod ledger;
pub mod types;

// 重导出核心类型
pub use alert::{Alert, AlertThresholds, StatsSummary};
pub use allocation::{
    AllocationOutcome, AllocationRequest, AllocationResult, AllocationStatus, ResourcePlan,
    SeverityClassification,
};
pub use ledger::{
    deduct_plan, deduct_quantity, HistoryEntry, InventorySnapshot, LedgerDocument,
    SeverityContext, StockOverflow, LEDGER_DOCUMENT_VERSION,
};
pub use types::{quantities, AlertLevel, ResourceQuantities, ResourceType, SeverityLevel};
