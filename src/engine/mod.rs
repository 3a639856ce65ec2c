// ==========================================
// 灾害救援物资分配引擎 - 引擎层
// ==========================================
// 职责: 求解 / KPI 汇总 / 告警评估
// 红线: 引擎不访问存储,只处理传入的快照
// ==========================================

pub mod alerts;
pub mod error;
pub mod solver;
pub mod stats;

// 重导出核心引擎
pub use alerts::{format_thousands, AlertEvaluator};
pub use error::ValidationError;
pub use solver::{AllocationEngine, AllocationProblem, AllocationSolver, FeasibilitySolver};
pub use stats::StatsAggregator;
