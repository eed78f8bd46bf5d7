//! # Core Module / 核心模块
//!
//! This module contains the orchestration core of testr: data models,
//! run configuration, test discovery and filtering, skip rules, the executor
//! and regression capture.
//!
//! 此模块包含 testr 的编排核心：数据模型、运行配置、测试发现与过滤、
//! 跳过规则、执行器以及回归捕获。

pub mod config;
pub mod discovery;
pub mod error;
pub mod execution;
pub mod filter;
pub mod models;
pub mod regress;
pub mod skip;

// Re-exports
pub use error::TestrError;
pub use models::{TestPlan, TestStatus};
