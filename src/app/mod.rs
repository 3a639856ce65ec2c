// ==========================================
// 灾害救援物资分配引擎 - 应用层
// ==========================================
// 职责: 启动时装配配置 / 存储 / API,关闭时释放
// ==========================================

pub mod state;

// 重导出
pub use crate::config::get_default_store_path;
pub use state::AppState;
