// ==========================================
// 灾害救援物资分配引擎 - API 层
// ==========================================
// 职责: 面向外部协作方（如 HTTP 层）的业务接口
// ==========================================

pub mod allocation_api;
pub mod dashboard_api;
pub mod error;

// 重导出核心类型
pub use allocation_api::AllocationApi;
pub use dashboard_api::DashboardApi;
pub use error::{ApiError, ApiResult};
