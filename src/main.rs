// ==========================================
// 灾害救援物资分配引擎 - 诊断入口
// ==========================================
// 启动 → 加载台账 → 输出库存 / 统计 / 告警 → 关闭
// 参数: --json-logs 以 JSON 格式输出日志（或 RELIEF_ALLOCATION_LOG_FORMAT=json）
// ==========================================

use anyhow::Context;
use relief_allocation::app::AppState;
use relief_allocation::config::RuntimeSettings;
use relief_allocation::logging::{self, LogFormat};

fn main() -> anyhow::Result<()> {
    logging::init_with(LogFormat::detect(std::env::args()));

    tracing::info!("==================================================");
    tracing::info!("{}", relief_allocation::APP_NAME);
    tracing::info!("系统版本: {}", relief_allocation::VERSION);
    tracing::info!("==================================================");

    let settings = RuntimeSettings::from_env();
    let state = AppState::new(settings).context("无法初始化AppState")?;

    let inventory = state.dashboard_api.get_inventory()?;
    for (resource, stock) in &inventory {
        tracing::info!(resource = %resource, stock, "当前库存");
    }

    let stats = state.dashboard_api.get_stats()?;
    tracing::info!(
        total_analyses = stats.total_analyses,
        total_cost = stats.total_cost,
        total_resources_deployed = stats.total_resources_deployed,
        "历史统计"
    );

    let alerts = state.dashboard_api.get_alerts()?;
    if alerts.is_empty() {
        tracing::info!("无活动告警");
    }
    for alert in &alerts {
        tracing::warn!(level = %alert.level, resource = %alert.resource, "{}", alert.message);
    }

    state.shutdown();
    Ok(())
}
