//! # Regress Command Module / 回归命令模块
//!
//! Captures regression files of the current test's output directory into the
//! regression archive. Usually invoked by a test itself, which finds both
//! directories in the `TESTR_OUT_DIR` / `TESTR_REGRESS_DIR` variables.
//!
//! 将当前测试输出目录中的回归文件捕获到回归归档中。通常由测试自身调用，
//! 测试通过 `TESTR_OUT_DIR` / `TESTR_REGRESS_DIR` 变量找到这两个目录。

use anyhow::{Context, Result};
use colored::*;
use std::env;
use std::path::PathBuf;

use crate::{
    core::{
        error::TestrError,
        regress::{RegressionCapturer, RegressionSpec},
    },
    infra::{logging::console, t},
};

pub const OUT_DIR_ENV: &str = "TESTR_OUT_DIR";
pub const REGRESS_DIR_ENV: &str = "TESTR_REGRESS_DIR";

/// Returns `explicit`, or the directory named by the environment variable `var`.
pub fn dir_or_env(explicit: Option<PathBuf>, var: &'static str) -> Result<PathBuf> {
    match explicit {
        Some(dir) => Ok(dir),
        None => env::var_os(var)
            .map(PathBuf::from)
            .ok_or_else(|| TestrError::MissingEnv(var).into()),
    }
}

/// Executes the regress command.
///
/// # Arguments
/// * `spec` - Optional TOML file listing files and clean rules
/// * `out_dir` - Source directory, defaults to `$TESTR_OUT_DIR`
/// * `regress_dir` - Archive directory, defaults to `$TESTR_REGRESS_DIR`
/// * `files` - Extra files or globs appended to the spec's list
pub fn execute(
    spec: Option<PathBuf>,
    out_dir: Option<PathBuf>,
    regress_dir: Option<PathBuf>,
    files: Vec<String>,
) -> Result<()> {
    let out_dir = dir_or_env(out_dir, OUT_DIR_ENV)?;
    let regress_dir = dir_or_env(regress_dir, REGRESS_DIR_ENV)?;

    let mut regression = match &spec {
        Some(path) => RegressionSpec::load(path)
            .with_context(|| format!("Failed to load regression spec: {}", path.display()))?,
        None => RegressionSpec::default(),
    };
    regression.files.extend(files);

    let written = RegressionCapturer::new(&out_dir, &regress_dir).capture(&regression)?;
    for path in &written {
        console(t!("regress.captured", path = path.display()));
    }
    console(t!("regress.done", count = written.len(), path = regress_dir.display()).green());
    Ok(())
}
