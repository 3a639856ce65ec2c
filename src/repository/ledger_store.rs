// ==========================================
// 灾害救援物资分配引擎 - 台账存储抽象
// ==========================================
// 职责: 库存台账 + 分配历史 的统一存储接口
// 红线:
// - 读: 返回副本,调用方拿不到可变引用
// - 写: 独占临界区内 读库存 → 计算 → 写库存 → 追加历史 → 持久化
// - 持久化失败: 整个事务作废,内存状态不变
// - 熔断: 检测到并发不变量被破坏后拒绝一切变更,直到 recover()
// ==========================================

use crate::domain::allocation::{AllocationResult, ResourcePlan};
use crate::domain::ledger::{HistoryEntry, InventorySnapshot, LedgerDocument, SeverityContext};
use crate::repository::error::{RepositoryError, RepositoryResult};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

// ==========================================
// CommittedAllocation - 事务提交结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommittedAllocation {
    pub entry: HistoryEntry,
    /// 扣减后的库存
    pub inventory: InventorySnapshot,
}

// ==========================================
// LedgerStore Trait
// ==========================================

/// 台账存储
///
/// 实现者:
/// - `JsonFileLedgerStore`: 单文件 JSON 文档
/// - `SqliteLedgerStore`: SQLite 事务
pub trait LedgerStore: Send + Sync {
    /// 后端名称（日志用）
    fn backend_name(&self) -> &'static str;

    /// 当前库存快照
    fn inventory(&self) -> RepositoryResult<InventorySnapshot>;

    /// 全部历史（插入顺序,最早在前）
    fn history(&self) -> RepositoryResult<Vec<HistoryEntry>>;

    /// 同一临界区内读取的库存 + 历史
    fn state(&self) -> RepositoryResult<LedgerDocument>;

    /// 扣减库存（不截断,允许为负）,持久化后返回新库存
    fn apply(&self, plan: &ResourcePlan) -> RepositoryResult<InventorySnapshot>;

    /// 追加历史条目（仅接受 Optimal 结果）
    fn append(
        &self,
        prediction: SeverityContext,
        result: AllocationResult,
    ) -> RepositoryResult<HistoryEntry>;

    /// 扣减库存 + 追加历史,作为一个事务提交
    fn record_allocation(
        &self,
        prediction: SeverityContext,
        result: AllocationResult,
    ) -> RepositoryResult<CommittedAllocation>;

    /// 从持久化存储重新加载最后一次提交的状态,并解除熔断
    fn recover(&self) -> RepositoryResult<()>;

    /// 是否处于熔断状态
    fn is_fenced(&self) -> bool;
}

/// 取出 Optimal 结果的方案；Infeasible 结果不允许写入台账
pub(crate) fn require_plan(result: &AllocationResult) -> RepositoryResult<&ResourcePlan> {
    match (&result.plan, result.is_optimal()) {
        (Some(plan), true) => Ok(plan),
        _ => Err(RepositoryError::BusinessRuleViolation(format!(
            "仅 Optimal 结果可写入台账: status={:?}",
            result.status
        ))),
    }
}

// ==========================================
// MutationFence - 变更熔断器
// ==========================================
#[derive(Debug, Default)]
pub(crate) struct MutationFence {
    tripped: AtomicBool,
    reason: Mutex<Option<String>>,
}

impl MutationFence {
    /// 熔断状态下拒绝变更
    pub fn check(&self) -> RepositoryResult<()> {
        if !self.tripped.load(Ordering::SeqCst) {
            return Ok(());
        }
        let reason = self
            .reason
            .lock()
            .map(|r| r.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
            .unwrap_or_default();
        Err(RepositoryError::StoreFenced(reason))
    }

    pub fn trip(&self, reason: &str) {
        tracing::error!("台账存储熔断: {}", reason);
        match self.reason.lock() {
            Ok(mut r) => *r = Some(reason.to_string()),
            Err(e) => *e.into_inner() = Some(reason.to_string()),
        }
        self.tripped.store(true, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        match self.reason.lock() {
            Ok(mut r) => *r = None,
            Err(e) => *e.into_inner() = None,
        }
        self.tripped.store(false, Ordering::SeqCst);
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::SeqCst)
    }
}
