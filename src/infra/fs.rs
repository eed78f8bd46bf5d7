//! # File System Operations Module / 文件系统操作模块
//!
//! This module provides utilities for file system operations: materializing a
//! package's working copy, creating the run directory, relative path helpers
//! and glob expansion below a directory.
//!
//! 此模块提供文件系统操作的实用功能：创建包的工作副本、创建运行目录、
//! 相对路径辅助函数以及目录下的通配符展开。

use anyhow::{Context, Result};
use fs_extra::dir::{CopyOptions, copy};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::core::error::TestrError;
use crate::core::filter::{glob_match, has_glob_chars};

/// Copies the entire content of `from` into a fresh `to` directory.
///
/// If `to` already exists it is removed first when `overwrite` is set;
/// otherwise the copy is refused with [`TestrError::OutputDirExists`].
///
/// 将 `from` 的全部内容复制到新的 `to` 目录中。
/// 如果 `to` 已存在：设置了 `overwrite` 时先删除它，否则拒绝复制。
pub fn materialize_dir(from: &Path, to: &Path, overwrite: bool) -> Result<()> {
    if to.exists() {
        if !overwrite {
            return Err(TestrError::OutputDirExists(to.to_path_buf()).into());
        }
        tracing::info!(dir = %to.display(), "removing existing output dir");
        fs::remove_dir_all(to)
            .with_context(|| format!("Failed to remove existing output dir: {}", to.display()))?;
    }
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    copy_dir_all(from, to)
}

/// Copies the entire content of a source directory to a destination directory.
///
/// # Arguments
/// * `from` - Source directory path
/// * `to` - Destination directory path; created if missing
pub fn copy_dir_all(from: &Path, to: &Path) -> Result<()> {
    let mut options = CopyOptions::new();
    options.overwrite = true;
    options.copy_inside = true;
    copy(from, to, &options).with_context(|| {
        format!("Failed to copy {} to {}", from.display(), to.display())
    })?;
    Ok(())
}

/// Creates the run's log directory and points a `last` symlink at it.
///
/// An existing directory is reused with a warning. Returns `true` if the
/// directory was reused.
///
/// 创建本次运行的日志目录，并将 `last` 符号链接指向它。已存在的目录会被复用并给出警告。
pub fn make_run_dir(log_dir: &Path) -> Result<bool> {
    let reused = log_dir.exists();
    if !reused {
        fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create output directory: {}", log_dir.display()))?;
    }
    update_last_link(log_dir);
    Ok(reused)
}

#[cfg(unix)]
fn update_last_link(log_dir: &Path) {
    let (Some(parent), Some(name)) = (log_dir.parent(), log_dir.file_name()) else {
        return;
    };
    let link = parent.join("last");
    if fs::symlink_metadata(&link).is_ok() {
        if let Err(e) = fs::remove_file(&link) {
            tracing::warn!(link = %link.display(), error = %e, "could not remove stale link");
            return;
        }
    }
    if let Err(e) = std::os::unix::fs::symlink(name, &link) {
        tracing::warn!(link = %link.display(), error = %e, "could not create link");
    }
}

#[cfg(not(unix))]
fn update_last_link(_log_dir: &Path) {}

/// Returns `path` relative to `root` if it lies below it, otherwise `path`
/// unchanged.
///
/// 如果 `path` 位于 `root` 之下则返回相对路径，否则原样返回。
pub fn relative_to(path: &Path, root: &Path) -> PathBuf {
    path.strip_prefix(root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Converts a relative path into `/`-separated form.
pub fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Expands a relative path pattern below `root`.
///
/// A pattern without glob characters is returned as-is (whether or not it
/// exists). A glob is matched against every file below `root` with path
/// semantics (`*` stops at `/`); a glob that matches nothing is an error.
///
/// 在 `root` 下展开相对路径模式。不含通配符的模式按原样返回（无论是否存在）。
/// 通配符以路径语义与 `root` 下的每个文件匹配；没有匹配项的通配符视为错误。
pub fn expand_glob(root: &Path, pattern: &str) -> std::result::Result<Vec<String>, TestrError> {
    if !has_glob_chars(pattern) {
        return Ok(vec![pattern.to_string()]);
    }

    let mut matches = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
            TestrError::io(path, std::io::Error::other(e.to_string()))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = slash_path(&relative_to(entry.path(), root));
        if glob_match(pattern, &rel, true) {
            matches.push(rel);
        }
    }

    if matches.is_empty() {
        return Err(TestrError::NoGlobMatches {
            pattern: pattern.to_string(),
            root: root.to_path_buf(),
        });
    }
    Ok(matches)
}
