// ==========================================
// 灾害救援物资分配引擎 - 数据仓储层
// ==========================================
// 红线: Repository 不含分配逻辑,只负责台账读写与原子提交
// ==========================================
// 职责: 提供台账访问接口,屏蔽 JSON 文档 / SQLite 细节
// 约束: 所有 SQL 查询使用参数化
// ==========================================

pub mod error;
pub mod json_store;
pub mod ledger_store;
pub mod sqlite_store;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use json_store::JsonFileLedgerStore;
pub use ledger_store::{CommittedAllocation, LedgerStore};
pub use sqlite_store::SqliteLedgerStore;

use crate::config::StoreBackend;
use crate::domain::ledger::InventorySnapshot;
use std::path::Path;
use std::sync::Arc;

/// 按后端类型打开台账存储
pub fn open_ledger_store(
    backend: StoreBackend,
    path: &Path,
    initial_inventory: &InventorySnapshot,
) -> RepositoryResult<Arc<dyn LedgerStore>> {
    let store: Arc<dyn LedgerStore> = match backend {
        StoreBackend::JsonFile => Arc::new(JsonFileLedgerStore::open(path, initial_inventory.clone())),
        StoreBackend::Sqlite => {
            let db_path = path.to_str().ok_or_else(|| {
                RepositoryError::StorageRead(format!("数据库路径不是合法 UTF-8: {}", path.display()))
            })?;
            Arc::new(SqliteLedgerStore::open(db_path, initial_inventory)?)
        }
    };
    Ok(store)
}
