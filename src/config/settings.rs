// ==========================================
// 灾害救援物资分配引擎 - 运行时设置
// ==========================================
// 来源: 环境变量
// - RELIEF_ALLOCATION_STORE_PATH    台账存储路径
// - RELIEF_ALLOCATION_STORE_BACKEND json | sqlite (默认 json)
// - RELIEF_ALLOCATION_CONFIG        分配配置 JSON 路径（可选）
// ==========================================

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub const ENV_STORE_PATH: &str = "RELIEF_ALLOCATION_STORE_PATH";
pub const ENV_STORE_BACKEND: &str = "RELIEF_ALLOCATION_STORE_BACKEND";
pub const ENV_CONFIG_PATH: &str = "RELIEF_ALLOCATION_CONFIG";

/// 台账存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    /// 单文件 JSON 文档（写临时文件后原子替换）
    #[default]
    JsonFile,
    /// SQLite 数据库（事务提交）
    Sqlite,
}

impl StoreBackend {
    fn file_name(&self) -> &'static str {
        match self {
            StoreBackend::JsonFile => "relief_ledger.json",
            StoreBackend::Sqlite => "relief_ledger.db",
        }
    }
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" | "json_file" => Ok(StoreBackend::JsonFile),
            "sqlite" | "db" => Ok(StoreBackend::Sqlite),
            other => Err(format!("未知的存储后端: {}", other)),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::JsonFile => write!(f, "json"),
            StoreBackend::Sqlite => write!(f, "sqlite"),
        }
    }
}

// ==========================================
// RuntimeSettings
// ==========================================
#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub store_path: PathBuf,
    pub backend: StoreBackend,
    pub config_path: Option<PathBuf>,
}

impl RuntimeSettings {
    /// 指定存储路径与后端（不读取分配配置文件）
    pub fn new(store_path: impl Into<PathBuf>, backend: StoreBackend) -> Self {
        Self {
            store_path: store_path.into(),
            backend,
            config_path: None,
        }
    }

    /// 从环境变量读取设置
    ///
    /// 无法识别的后端名称记录告警后回退为 JSON
    pub fn from_env() -> Self {
        let backend = match std::env::var(ENV_STORE_BACKEND) {
            Ok(raw) if !raw.trim().is_empty() => raw.parse().unwrap_or_else(|e| {
                tracing::warn!("{}, 回退为 json", e);
                StoreBackend::JsonFile
            }),
            _ => StoreBackend::default(),
        };

        let store_path = non_empty_env(ENV_STORE_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|| get_default_store_path(backend));

        Self {
            store_path,
            backend,
            config_path: non_empty_env(ENV_CONFIG_PATH).map(PathBuf::from),
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// 获取默认存储路径
///
/// # 返回
/// - 开发环境: 用户数据目录/relief-allocation-dev/<文件名>
/// - 生产环境: 用户数据目录/relief-allocation/<文件名>
/// - 无法获取用户数据目录时: ./<文件名>
pub fn get_default_store_path(backend: StoreBackend) -> PathBuf {
    let Some(data_dir) = dirs::data_dir() else {
        return PathBuf::from(".").join(backend.file_name());
    };

    // 开发环境使用独立目录，避免污染生产数据
    let dir = if cfg!(debug_assertions) {
        data_dir.join("relief-allocation-dev")
    } else {
        data_dir.join("relief-allocation")
    };

    // best-effort: 目录创建失败时由存储层在首次写入时报错
    std::fs::create_dir_all(&dir).ok();
    dir.join(backend.file_name())
}
