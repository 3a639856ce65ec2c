// ==========================================
// 灾害救援物资分配引擎 - 配置层
// ==========================================
// 职责: 需求目录 / 成本表 / 告警阈值 / 运行时设置
// 优先级: 请求显式值 > 严重等级默认值
// ==========================================

pub mod catalog;
pub mod settings;

// 重导出核心配置
pub use catalog::{
    defaults, minimum_cost, AllocationConfig, ConfigError, CostTable, DemandCatalog,
    SeverityProfile,
};
pub use settings::{get_default_store_path, RuntimeSettings, StoreBackend};
