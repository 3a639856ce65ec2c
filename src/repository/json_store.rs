// ==========================================
// 灾害救援物资分配引擎 - JSON 文档台账存储
// ==========================================
// 持久化: 单个文档 {version, inventory, history}
// 写入: 临时文件 → fsync → rename,崩溃时不会留下半截文档
// 并发: RwLock 保护内存文档；变更先在副本上完成,持久化成功后才替换
// 读降级:
// - 文件缺失: 使用初始状态,并尽力写出一份
// - 文件损坏/版本过新: 原文件移至 <path>.corrupt,使用初始状态
// ==========================================

use crate::domain::allocation::{AllocationResult, ResourcePlan};
use crate::domain::ledger::{
    deduct_plan, HistoryEntry, InventorySnapshot, LedgerDocument, SeverityContext,
    LEDGER_DOCUMENT_VERSION,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::ledger_store::{require_plan, CommittedAllocation, LedgerStore, MutationFence};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard};
use tracing::{debug, info, warn};

// ==========================================
// JsonFileLedgerStore
// ==========================================
pub struct JsonFileLedgerStore {
    path: PathBuf,
    initial_inventory: InventorySnapshot,
    state: RwLock<LedgerDocument>,
    fence: MutationFence,
}

impl JsonFileLedgerStore {
    /// 打开（或初始化）台账文档
    ///
    /// 读失败不会上抛,按降级规则回落到初始状态
    pub fn open(path: impl Into<PathBuf>, initial_inventory: InventorySnapshot) -> Self {
        let path = path.into();
        let document = load_or_initialize(&path, &initial_inventory);
        info!(
            path = %path.display(),
            history_len = document.history.len(),
            "JSON 台账已加载"
        );

        Self {
            path,
            initial_inventory,
            state: RwLock::new(document),
            fence: MutationFence::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读锁；锁中毒时熔断变更,但读取仍返回最后一次提交的文档
    fn read(&self) -> RwLockReadGuard<'_, LedgerDocument> {
        self.state.read().unwrap_or_else(|poisoned| {
            self.fence.trip("台账读锁已中毒");
            poisoned.into_inner()
        })
    }

    /// 独占临界区内执行变更
    ///
    /// 流程: 熔断检查 → 写锁 → 克隆 → 变更 → 追加不变量检查 → 持久化 → 替换
    fn mutate<T>(
        &self,
        op: impl FnOnce(&mut LedgerDocument) -> RepositoryResult<T>,
    ) -> RepositoryResult<T> {
        self.fence.check()?;

        let mut guard = match self.state.write() {
            Ok(guard) => guard,
            Err(_) => {
                let reason = "台账写锁已中毒: 上一次变更在临界区内异常中断";
                self.fence.trip(reason);
                return Err(RepositoryError::InvariantViolation(reason.to_string()));
            }
        };

        let mut next = guard.clone();
        let output = op(&mut next)?;

        // 按 entry_id 比较已提交前缀（条目含浮点字段,不做值相等比较）
        let prefix_kept = next.history.len() >= guard.history.len()
            && guard
                .history
                .iter()
                .zip(&next.history)
                .all(|(old, new)| old.entry_id == new.entry_id);
        if !prefix_kept {
            let reason = "历史记录只允许追加";
            self.fence.trip(reason);
            return Err(RepositoryError::InvariantViolation(reason.to_string()));
        }

        write_document(&self.path, &next)?;
        *guard = next;
        Ok(output)
    }
}

impl LedgerStore for JsonFileLedgerStore {
    fn backend_name(&self) -> &'static str {
        "json_file"
    }

    fn inventory(&self) -> RepositoryResult<InventorySnapshot> {
        Ok(self.read().inventory.clone())
    }

    fn history(&self) -> RepositoryResult<Vec<HistoryEntry>> {
        Ok(self.read().history.clone())
    }

    fn state(&self) -> RepositoryResult<LedgerDocument> {
        Ok(self.read().clone())
    }

    fn apply(&self, plan: &ResourcePlan) -> RepositoryResult<InventorySnapshot> {
        self.mutate(|doc| {
            deduct_plan(&mut doc.inventory, plan)?;
            Ok(doc.inventory.clone())
        })
    }

    fn append(
        &self,
        prediction: SeverityContext,
        result: AllocationResult,
    ) -> RepositoryResult<HistoryEntry> {
        require_plan(&result)?;
        self.mutate(move |doc| {
            let entry = HistoryEntry::stamp(doc.history.last(), prediction, result);
            doc.history.push(entry.clone());
            Ok(entry)
        })
    }

    fn record_allocation(
        &self,
        prediction: SeverityContext,
        result: AllocationResult,
    ) -> RepositoryResult<CommittedAllocation> {
        let plan = require_plan(&result)?.clone();
        self.mutate(move |doc| {
            deduct_plan(&mut doc.inventory, &plan)?;
            let entry = HistoryEntry::stamp(doc.history.last(), prediction, result);
            doc.history.push(entry.clone());
            Ok(CommittedAllocation {
                entry,
                inventory: doc.inventory.clone(),
            })
        })
    }

    fn recover(&self) -> RepositoryResult<()> {
        let document = load_or_initialize(&self.path, &self.initial_inventory);

        match self.state.write() {
            Ok(mut guard) => *guard = document,
            Err(poisoned) => *poisoned.into_inner() = document,
        }
        self.state.clear_poison();
        self.fence.clear();

        info!(path = %self.path.display(), "JSON 台账已从磁盘恢复");
        Ok(())
    }

    fn is_fenced(&self) -> bool {
        self.fence.is_tripped()
    }
}

// ==========================================
// 文件读写
// ==========================================

/// 读取文档；文件不存在返回 Ok(None)
fn read_document(path: &Path) -> RepositoryResult<Option<LedgerDocument>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(RepositoryError::StorageRead(format!(
                "path={}: {}",
                path.display(),
                e
            )))
        }
    };

    let document: LedgerDocument = serde_json::from_slice(&bytes).map_err(|e| {
        RepositoryError::StorageRead(format!("文档解析失败 path={}: {}", path.display(), e))
    })?;

    if document.version > LEDGER_DOCUMENT_VERSION {
        return Err(RepositoryError::StorageRead(format!(
            "文档版本过新: found={}, supported={}",
            document.version, LEDGER_DOCUMENT_VERSION
        )));
    }

    Ok(Some(document))
}

/// 加载文档,失败时按降级规则回落到初始状态
fn load_or_initialize(path: &Path, initial_inventory: &InventorySnapshot) -> LedgerDocument {
    match read_document(path) {
        Ok(Some(mut document)) => {
            let filled = document.fill_missing_resources(initial_inventory);
            if !filled.is_empty() {
                warn!(?filled, "台账缺少部分资源键,已按初始库存补齐");
            }
            document.version = LEDGER_DOCUMENT_VERSION;
            document
        }
        Ok(None) => {
            let document = LedgerDocument::initial(initial_inventory.clone());
            if let Err(e) = write_document(path, &document) {
                warn!(error = %e, "初始台账写出失败,继续使用内存状态");
            }
            document
        }
        Err(e) => {
            warn!(error = %e, "台账读取失败,降级为初始状态");
            quarantine(path);
            let document = LedgerDocument::initial(initial_inventory.clone());
            if let Err(e) = write_document(path, &document) {
                warn!(error = %e, "初始台账写出失败,继续使用内存状态");
            }
            document
        }
    }
}

/// 原子写出文档（临时文件 + fsync + rename）
pub(crate) fn write_document(path: &Path, document: &LedgerDocument) -> RepositoryResult<()> {
    let bytes = serde_json::to_vec_pretty(document)?;
    let tmp_path = path.with_extension(format!("tmp.{}", uuid::Uuid::new_v4()));

    if let Err(e) = write_and_rename(&tmp_path, path, &bytes) {
        let _ = fs::remove_file(&tmp_path);
        return Err(RepositoryError::StorageWrite(format!(
            "path={}: {}",
            path.display(),
            e
        )));
    }

    debug!(path = %path.display(), bytes = bytes.len(), "台账已持久化");
    Ok(())
}

fn write_and_rename(tmp_path: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(tmp_path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    fs::rename(tmp_path, path)?;
    sync_parent_dir(path)
}

/// rename 之后同步父目录,确保目录项落盘
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => File::open(dir)?.sync_all(),
        _ => File::open(".")?.sync_all(),
    }
}

// 非 unix 平台无法以文件句柄打开目录
#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// 损坏文件的隔离路径: `<path>.corrupt`
pub(crate) fn corrupt_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".corrupt");
    PathBuf::from(name)
}

/// 将损坏文件移到一边,保留现场
pub(crate) fn quarantine(path: &Path) {
    if !path.exists() {
        return;
    }
    let target = corrupt_path(path);
    match fs::rename(path, &target) {
        Ok(()) => warn!(from = %path.display(), to = %target.display(), "损坏文件已隔离"),
        Err(e) => warn!(error = %e, path = %path.display(), "损坏文件隔离失败"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{quantities, SeverityLevel};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn initial() -> InventorySnapshot {
        quantities(50_000, 2_000, 10_000)
    }

    fn low_result() -> AllocationResult {
        AllocationResult::optimal(SeverityLevel::Low, 100_000.0, quantities(500, 20, 100), 59_000.0)
    }

    #[test]
    fn test_missing_file_writes_initial_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.json");

        let store = JsonFileLedgerStore::open(&path, initial());
        assert_eq!(store.inventory().unwrap(), initial());
        assert!(store.history().unwrap().is_empty());
        assert!(path.exists());
    }

    #[test]
    fn test_corrupt_file_is_quarantined() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.json");
        fs::write(&path, b"{ not json").unwrap();

        let store = JsonFileLedgerStore::open(&path, initial());
        assert_eq!(store.inventory().unwrap(), initial());
        assert!(corrupt_path(&path).exists());
        assert_eq!(fs::read(corrupt_path(&path)).unwrap(), b"{ not json");
    }

    #[test]
    fn test_newer_document_version_degrades() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.json");
        fs::write(
            &path,
            r#"{"version": 99, "inventory": {"food_kits": 1, "medical_units": 1, "shelters": 1}, "history": []}"#,
        )
        .unwrap();

        let store = JsonFileLedgerStore::open(&path, initial());
        assert_eq!(store.inventory().unwrap(), initial());
        assert!(corrupt_path(&path).exists());
    }

    #[test]
    fn test_write_failure_leaves_state_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing-dir").join("ledger.json");

        let store = JsonFileLedgerStore::open(&path, initial());
        let err = store
            .record_allocation(SeverityContext::new(SeverityLevel::Low), low_result())
            .unwrap_err();
        assert!(matches!(err, RepositoryError::StorageWrite(_)));

        assert_eq!(store.inventory().unwrap(), initial());
        assert!(store.history().unwrap().is_empty());
        assert!(!store.is_fenced());
    }

    #[test]
    fn test_poisoned_lock_fences_mutations_until_recover() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.json");
        let store = Arc::new(JsonFileLedgerStore::open(&path, initial()));

        store
            .record_allocation(SeverityContext::new(SeverityLevel::Low), low_result())
            .unwrap();

        let s = Arc::clone(&store);
        let joined = std::thread::spawn(move || {
            let _guard = s.state.write().unwrap();
            panic!("变更中途崩溃");
        })
        .join();
        assert!(joined.is_err());

        let err = store.apply(&quantities(1, 1, 1)).unwrap_err();
        assert!(matches!(err, RepositoryError::InvariantViolation(_)));
        assert!(store.is_fenced());

        let err = store.apply(&quantities(1, 1, 1)).unwrap_err();
        assert!(matches!(err, RepositoryError::StoreFenced(_)));

        // 读取不受熔断影响
        assert_eq!(store.inventory().unwrap(), quantities(49_500, 1_980, 9_900));
        assert_eq!(store.history().unwrap().len(), 1);

        store.recover().unwrap();
        assert!(!store.is_fenced());
        assert_eq!(store.apply(&quantities(1, 1, 1)).unwrap(), quantities(49_499, 1_979, 9_899));
    }

    #[test]
    fn test_non_finite_confidence_does_not_fence_later_commits() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.json");
        let store = JsonFileLedgerStore::open(&path, initial());

        let mut ctx = SeverityContext::new(SeverityLevel::Low);
        ctx.confidence = Some(f64::NAN);
        ctx.feature_importance = Some(std::collections::BTreeMap::from([(
            "rainfall".to_string(),
            f64::NAN,
        )]));
        store.record_allocation(ctx, low_result()).unwrap();

        store
            .record_allocation(SeverityContext::new(SeverityLevel::Low), low_result())
            .unwrap();
        assert!(!store.is_fenced());
        assert_eq!(store.history().unwrap().len(), 2);

        // 内存状态与落盘文档一致
        let reopened = JsonFileLedgerStore::open(&path, initial());
        assert_eq!(reopened.state().unwrap(), store.state().unwrap());
        assert!(!corrupt_path(&path).exists());
    }

    #[test]
    fn test_stock_overflow_is_rejected_without_fencing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.json");
        let store = JsonFileLedgerStore::open(&path, initial());

        let huge = AllocationResult::optimal(
            SeverityLevel::Low,
            1e20,
            quantities(i64::MAX, 0, 0),
            1e19,
        );
        store
            .record_allocation(SeverityContext::new(SeverityLevel::Low), huge.clone())
            .unwrap();
        let before = store.state().unwrap();

        let err = store
            .record_allocation(SeverityContext::new(SeverityLevel::Low), huge)
            .unwrap_err();
        assert!(matches!(err, RepositoryError::StockOverflow(_)));
        assert!(!store.is_fenced());
        assert_eq!(store.state().unwrap(), before);
        assert_eq!(JsonFileLedgerStore::open(&path, initial()).state().unwrap(), before);
    }

    #[test]
    fn test_write_document_syncs_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.json");

        write_document(&path, &LedgerDocument::initial(initial())).unwrap();
        sync_parent_dir(&path).unwrap();
        assert!(sync_parent_dir(Path::new("ledger.json")).is_ok());

        // 临时文件已被 rename,不残留
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp."))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_append_rejects_infeasible() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileLedgerStore::open(dir.path().join("ledger.json"), initial());

        let infeasible = AllocationResult::infeasible(SeverityLevel::High, 1_000.0, 2_750_000.0);
        let err = store
            .append(SeverityContext::new(SeverityLevel::High), infeasible)
            .unwrap_err();
        assert!(matches!(err, RepositoryError::BusinessRuleViolation(_)));
        assert!(store.history().unwrap().is_empty());
    }

    #[test]
    fn test_reopen_preserves_committed_state() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.json");

        {
            let store = JsonFileLedgerStore::open(&path, initial());
            store
                .record_allocation(SeverityContext::new(SeverityLevel::Low), low_result())
                .unwrap();
        }

        let reopened = JsonFileLedgerStore::open(&path, initial());
        assert_eq!(reopened.inventory().unwrap(), quantities(49_500, 1_980, 9_900));
        assert_eq!(reopened.history().unwrap().len(), 1);
    }
}
