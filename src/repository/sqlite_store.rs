// ==========================================
// 灾害救援物资分配引擎 - SQLite 台账存储
// ==========================================
// 职责: 同一 LedgerStore 契约的 SQLite 实现
// 事务: 每次变更一个事务,失败自动回滚
// 读降级:
// - 库文件损坏/版本过新: 移至 <path>.corrupt 后重建
// - 其他打开失败（权限、路径不可用等）: 原样返回,不动原文件
// - 单条历史 payload 无法解析: 跳过并记录日志
// ==========================================

use crate::db::{
    configure_sqlite_connection, ensure_ledger_schema, open_sqlite_connection,
    read_schema_version, CURRENT_SCHEMA_VERSION,
};
use crate::domain::allocation::{AllocationResult, ResourcePlan};
use crate::domain::ledger::{
    deduct_quantity, HistoryEntry, InventorySnapshot, LedgerDocument, SeverityContext,
};
use crate::domain::types::ResourceType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::json_store::quarantine;
use crate::repository::ledger_store::{require_plan, CommittedAllocation, LedgerStore, MutationFence};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Transaction};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

// ==========================================
// SqliteLedgerStore
// ==========================================
pub struct SqliteLedgerStore {
    conn: Mutex<Connection>,
    fence: MutationFence,
}

impl SqliteLedgerStore {
    /// 打开（或初始化）台账数据库
    ///
    /// 库文件损坏或版本过新时隔离原文件并重建；其他失败直接返回
    pub fn open(db_path: &str, initial_inventory: &InventorySnapshot) -> RepositoryResult<Self> {
        let conn = match prepare_file(db_path, initial_inventory) {
            Ok(conn) => conn,
            Err(PrepareError::Unusable(reason)) => {
                warn!(reason = %reason, db_path, "台账数据库不可用,隔离后重建");
                quarantine(Path::new(db_path));
                prepare_file(db_path, initial_inventory)?
            }
            Err(PrepareError::Failed(e)) => return Err(e),
        };

        info!(db_path, "SQLite 台账已加载");
        Ok(Self {
            conn: Mutex::new(conn),
            fence: MutationFence::default(),
        })
    }

    /// 内存数据库（测试与临时会话）
    pub fn open_in_memory(initial_inventory: &InventorySnapshot) -> RepositoryResult<Self> {
        let conn = Connection::open_in_memory()?;
        configure_sqlite_connection(&conn)?;
        prepare_schema(&conn, initial_inventory).map_err(RepositoryError::from)?;
        Ok(Self {
            conn: Mutex::new(conn),
            fence: MutationFence::default(),
        })
    }

    /// 读连接；锁中毒时熔断变更,未提交事务已随 Transaction 析构回滚
    fn read_conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| {
            self.fence.trip("台账连接锁已中毒");
            poisoned.into_inner()
        })
    }

    /// 在单个事务内执行变更
    fn transact<T>(&self, op: impl FnOnce(&Transaction<'_>) -> RepositoryResult<T>) -> RepositoryResult<T> {
        self.fence.check()?;

        let mut conn = match self.conn.lock() {
            Ok(conn) => conn,
            Err(_) => {
                let reason = "台账连接锁已中毒: 上一次变更在临界区内异常中断";
                self.fence.trip(reason);
                return Err(RepositoryError::InvariantViolation(reason.to_string()));
            }
        };

        let tx = conn.transaction()?;
        let output = op(&tx)?;
        tx.commit()
            .map_err(|e| RepositoryError::StorageWrite(format!("事务提交失败: {}", e)))?;
        Ok(output)
    }
}

impl LedgerStore for SqliteLedgerStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn inventory(&self) -> RepositoryResult<InventorySnapshot> {
        let conn = self.read_conn();
        load_inventory(&conn)
    }

    fn history(&self) -> RepositoryResult<Vec<HistoryEntry>> {
        let conn = self.read_conn();
        load_history(&conn)
    }

    fn state(&self) -> RepositoryResult<LedgerDocument> {
        let conn = self.read_conn();
        let mut document = LedgerDocument::initial(load_inventory(&conn)?);
        document.history = load_history(&conn)?;
        Ok(document)
    }

    fn apply(&self, plan: &ResourcePlan) -> RepositoryResult<InventorySnapshot> {
        self.transact(|tx| {
            deduct_in_tx(tx, plan)?;
            load_inventory(tx)
        })
    }

    fn append(
        &self,
        prediction: SeverityContext,
        result: AllocationResult,
    ) -> RepositoryResult<HistoryEntry> {
        require_plan(&result)?;
        self.transact(move |tx| append_in_tx(tx, prediction, result))
    }

    fn record_allocation(
        &self,
        prediction: SeverityContext,
        result: AllocationResult,
    ) -> RepositoryResult<CommittedAllocation> {
        let plan = require_plan(&result)?.clone();
        self.transact(move |tx| {
            deduct_in_tx(tx, &plan)?;
            let entry = append_in_tx(tx, prediction, result)?;
            Ok(CommittedAllocation {
                entry,
                inventory: load_inventory(tx)?,
            })
        })
    }

    fn recover(&self) -> RepositoryResult<()> {
        self.conn.clear_poison();
        self.fence.clear();
        info!("SQLite 台账已解除熔断");
        Ok(())
    }

    fn is_fenced(&self) -> bool {
        self.fence.is_tripped()
    }
}

// ==========================================
// 建库与种子数据
// ==========================================

/// 建库失败分类
enum PrepareError {
    /// 库文件本身不可用（非数据库 / 已损坏 / 版本过新）,可隔离重建
    Unusable(String),
    Failed(RepositoryError),
}

impl From<rusqlite::Error> for PrepareError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _)
                if matches!(e.code, ErrorCode::NotADatabase | ErrorCode::DatabaseCorrupt) =>
            {
                PrepareError::Unusable(err.to_string())
            }
            _ => PrepareError::Failed(err.into()),
        }
    }
}

impl From<PrepareError> for RepositoryError {
    fn from(err: PrepareError) -> Self {
        match err {
            PrepareError::Unusable(reason) => RepositoryError::StorageRead(reason),
            PrepareError::Failed(e) => e,
        }
    }
}

fn prepare_file(db_path: &str, initial_inventory: &InventorySnapshot) -> Result<Connection, PrepareError> {
    let conn = open_sqlite_connection(db_path)?;
    prepare_schema(&conn, initial_inventory)?;
    Ok(conn)
}

fn prepare_schema(conn: &Connection, initial_inventory: &InventorySnapshot) -> Result<(), PrepareError> {
    if let Some(version) = read_schema_version(conn)? {
        if version > CURRENT_SCHEMA_VERSION {
            return Err(PrepareError::Unusable(format!(
                "schema_version 过新: found={}, supported={}",
                version, CURRENT_SCHEMA_VERSION
            )));
        }
    }
    ensure_ledger_schema(conn)?;

    // 缺失的资源键按初始库存补齐,已有库存不覆盖
    for r in ResourceType::ALL {
        conn.execute(
            "INSERT OR IGNORE INTO ledger_inventory (resource, stock) VALUES (?1, ?2)",
            params![r.as_key(), initial_inventory.get(&r).copied().unwrap_or(0)],
        )?;
    }
    Ok(())
}

// ==========================================
// 读写辅助（Transaction 通过 Deref 复用读取函数）
// ==========================================

fn load_inventory(conn: &Connection) -> RepositoryResult<InventorySnapshot> {
    let mut stmt = conn.prepare("SELECT resource, stock FROM ledger_inventory")?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;

    let mut inventory = BTreeMap::new();
    for row in rows {
        let (key, stock) = row?;
        match ResourceType::from_key(&key) {
            Some(resource) => {
                inventory.insert(resource, stock);
            }
            None => warn!(resource = %key, "未知资源键,已跳过"),
        }
    }
    Ok(inventory)
}

fn load_history(conn: &Connection) -> RepositoryResult<Vec<HistoryEntry>> {
    let mut stmt = conn.prepare("SELECT seq, payload_json FROM ledger_history ORDER BY seq")?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?;

    let mut history = Vec::new();
    for row in rows {
        let (seq, payload) = row?;
        match serde_json::from_str::<HistoryEntry>(&payload) {
            Ok(entry) => history.push(entry),
            Err(e) => warn!(seq, error = %e, "历史条目无法解析,已跳过"),
        }
    }
    Ok(history)
}

/// 最近一条历史的时间戳
///
/// 从最新一行往前找: payload 可解析取其 timestamp,否则取 recorded_at 列；
/// 两者都不可用的行跳过
fn last_timestamp(conn: &Connection) -> RepositoryResult<Option<DateTime<Utc>>> {
    let mut stmt =
        conn.prepare("SELECT seq, payload_json, recorded_at FROM ledger_history ORDER BY seq DESC")?;
    let mut rows = stmt.query([])?;

    while let Some(row) = rows.next()? {
        let seq: i64 = row.get(0)?;
        let payload: String = row.get(1)?;
        if let Ok(entry) = serde_json::from_str::<HistoryEntry>(&payload) {
            return Ok(Some(entry.timestamp));
        }
        let recorded_at: String = row.get(2)?;
        match DateTime::parse_from_rfc3339(&recorded_at) {
            Ok(ts) => return Ok(Some(ts.with_timezone(&Utc))),
            Err(e) => warn!(seq, error = %e, "历史条目时间戳无法解析,继续向前查找"),
        }
    }
    Ok(None)
}

/// 逐项扣减；算术越界时返回错误,事务随之回滚
fn deduct_in_tx(tx: &Transaction<'_>, plan: &ResourcePlan) -> RepositoryResult<()> {
    for (resource, qty) in plan {
        let stock: i64 = tx
            .query_row(
                "SELECT stock FROM ledger_inventory WHERE resource = ?1",
                params![resource.as_key()],
                |row| row.get(0),
            )
            .optional()?
            .unwrap_or(0);
        let next = deduct_quantity(*resource, stock, *qty)?;

        tx.execute(
            r#"
            INSERT INTO ledger_inventory (resource, stock) VALUES (?1, ?2)
            ON CONFLICT(resource) DO UPDATE SET stock = excluded.stock
            "#,
            params![resource.as_key(), next],
        )?;
    }
    Ok(())
}

fn append_in_tx(
    tx: &Transaction<'_>,
    prediction: SeverityContext,
    result: AllocationResult,
) -> RepositoryResult<HistoryEntry> {
    let previous = last_timestamp(tx)?;
    let entry = HistoryEntry::stamp_after(previous, prediction, result);
    let payload = serde_json::to_string(&entry)?;

    tx.execute(
        r#"
        INSERT INTO ledger_history (entry_id, recorded_at, severity, payload_json)
        VALUES (?1, ?2, ?3, ?4)
        "#,
        params![
            entry.entry_id,
            entry.timestamp.to_rfc3339(),
            entry.prediction.severity,
            payload
        ],
    )?;
    Ok(entry)
}
