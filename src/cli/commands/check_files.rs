//! # Check-Files Command Module / 文件检查命令模块
//!
//! Fails when output files of a test contain forbidden lines (for example
//! `warning` or `error`), so a test can assert its own logs are clean.
//!
//! 当测试的输出文件包含禁止的行（例如 `warning` 或 `error`）时失败，
//! 以便测试可以断言其自身日志是干净的。

use anyhow::Result;
use colored::*;
use std::path::PathBuf;

use crate::{
    cli::commands::regress::{OUT_DIR_ENV, dir_or_env},
    core::regress::check_files,
    infra::{logging::console, t},
};

/// Executes the check-files command.
pub fn execute(
    glob: String,
    checks: Vec<String>,
    allows: Vec<String>,
    out_dir: Option<PathBuf>,
) -> Result<()> {
    let out_dir = dir_or_env(out_dir, OUT_DIR_ENV)?;
    check_files(&out_dir, &glob, &checks, &allows)?;
    console(t!("check_files.clean", glob = &glob).green());
    Ok(())
}
