// ==========================================
// 国际化 (i18n) 模块
// ==========================================
// 使用 rust-i18n 库
// 文案: 资源显示名称 + 两类库存告警（en 默认 / zh-CN）
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// ==========================================

use crate::domain::types::ResourceType;
use rust_i18n::t;

pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 设置语言（"en" 或 "zh-CN"）
pub fn set_locale(locale: &str) {
    rust_i18n::set_locale(locale);
}

/// 资源显示名称
pub fn resource_name(resource: ResourceType) -> String {
    let key = format!("resource.{}", resource.as_key());
    t!(key.as_str()).to_string()
}

/// 耗尽告警文案
pub fn depleted_message(resource: ResourceType) -> String {
    let name = resource_name(resource);
    t!("alert.depleted", resource = name).to_string()
}

/// 低于阈值告警文案（数值由调用方格式化）
pub fn below_threshold_message(resource: ResourceType, threshold: &str, current: &str) -> String {
    let name = resource_name(resource);
    t!(
        "alert.below_threshold",
        resource = name,
        threshold = threshold,
        current = current
    )
    .to_string()
}
