//! # testr Library / testr 库
//!
//! This library provides the core functionality of testr, a multi-package test
//! orchestrator: it discovers each package's test scripts, filters them by
//! include/exclude/skip rules, runs them in isolated working copies and
//! aggregates the results into a machine-readable report.
//!
//! 此库为 testr 提供核心功能。testr 是一个多包测试编排器：
//! 它发现每个包的测试脚本，按包含/排除/跳过规则过滤，在隔离的工作副本中运行，
//! 并将结果汇总为机器可读的报告。
//!
//! ## Modules / 模块
//!
//! - `core` - Data models, discovery, filtering, skip rules, execution and regression capture
//! - `infra` - Infrastructure services like process execution, file system and host facts
//! - `reporting` - Report aggregation and visualization
//! - `cli` - Command-line interface and commands
//!
//! - `core` - 数据模型、发现、过滤、跳过规则、执行和回归捕获
//! - `infra` - 基础设施服务，如进程执行、文件系统和主机信息
//! - `reporting` - 报告汇总和可视化
//! - `cli` - 命令行接口和命令

pub mod core;
pub mod infra;
pub mod reporting;
pub mod cli;

// Re-export commonly used items
pub use core::models;
pub use core::config;
pub use core::execution;

/// Initializes the application's internationalization (i18n) based on the system locale.
///
/// This function detects the user's system locale and sets the appropriate
/// language for the application's user interface. It attempts to match the full
/// locale (e.g., "zh-CN"), then just the language code (e.g., "en"), and
/// finally falls back to the default language ("en").
pub fn init() {
    // Detect system locale and set it for i18n.
    // Fallback to "en" if detection fails.
    let locale = sys_locale::get_locale().unwrap_or_else(|| "en".to_string());
    let available_locales = rust_i18n::available_locales!();

    // Try to match the full locale first (e.g., "zh-CN")
    // Then try to match the language part only (e.g., "en" from "en-US")
    // Finally, fall back to "en"
    let lang = if available_locales.contains(&locale.as_str()) {
        &locale
    } else {
        locale
            .split('-')
            .next()
            .filter(|lang_code| available_locales.contains(lang_code))
            .unwrap_or("en")
    };

    rust_i18n::set_locale(lang);
}

// Initialize i18n
rust_i18n::i18n!("locales", fallback = "en");