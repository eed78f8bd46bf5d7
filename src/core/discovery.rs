//! # Test Discovery Module / 测试发现模块
//!
//! Walks the packages root, lists each package's `test_*` and `post_*` scripts
//! and builds the ordered test plan, applying the inclusion filter once.
//!
//! 遍历包根目录，列出每个包的 `test_*` 和 `post_*` 脚本，
//! 构建有序的测试计划，并一次性应用包含过滤器。

use std::fs;
use std::path::Path;
use std::sync::Arc;
use walkdir::WalkDir;

use crate::core::config::RunContext;
use crate::core::error::{Result, TestrError};
use crate::core::filter::InclusionFilter;
use crate::core::models::{
    InclusionStatus, Interpreter, Package, PackagePlan, PlannedTest, TestPlan, TestPlanEntry,
};

/// File name prefixes that mark a test, in execution order.
/// 标记测试的文件名前缀，按执行顺序排列。
pub const TEST_PREFIXES: [&str; 2] = ["test_", "post_"];

/// Name of the optional per-package version file.
pub const VERSION_FILE: &str = "VERSION";

/// Discovers every package under the run's packages root.
///
/// Packages are returned sorted by name. A missing packages root is a fatal
/// configuration error.
///
/// 发现运行包根目录下的每个包。包按名称排序返回。包根目录缺失是致命的配置错误。
pub fn discover(ctx: &RunContext) -> Result<TestPlan> {
    let packages_dir = &ctx.packages_dir;
    if !packages_dir.is_dir() {
        return Err(TestrError::PackagesRootMissing(packages_dir.clone()));
    }

    let mut names = list_packages(packages_dir)?;
    names.sort();

    let mut packages = Vec::with_capacity(names.len());
    for name in names {
        let in_dir = packages_dir.join(&name);
        let package = Arc::new(Package {
            version: read_version(&in_dir),
            out_dir: ctx.log_dir.join(&name),
            regress_dir: ctx.regress_dir.join(&name),
            in_dir,
            name,
        });
        packages.push(plan_package(package, &ctx.filter, &ctx.options.packages_repo)?);
    }

    tracing::debug!(packages = packages.len(), "discovery finished");
    Ok(TestPlan { packages })
}

/// Lists immediate, non-hidden subdirectories of `packages_dir`.
fn list_packages(packages_dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in WalkDir::new(packages_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| TestrError::io(packages_dir, e.into()))?;
        if !entry.path().is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with('.') {
            names.push(name);
        }
    }
    Ok(names)
}

/// Reads `<in_dir>/VERSION`, falling back to `unknown`.
fn read_version(in_dir: &Path) -> String {
    fs::read_to_string(in_dir.join(VERSION_FILE))
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Builds the plan for one package.
///
/// Files are sorted by name within each prefix group, and `test_` files come
/// before `post_` files.
///
/// 为单个包构建计划。文件在每个前缀组内按名称排序，`test_` 文件排在 `post_` 文件之前。
pub fn plan_package(
    package: Arc<Package>,
    filter: &InclusionFilter,
    packages_repo: &str,
) -> Result<PackagePlan> {
    let files = list_test_files(&package.in_dir)?;

    let tests = files
        .into_iter()
        .map(|(file, interpreter)| {
            let inclusion = if filter.is_included(&package.name, &file) {
                InclusionStatus::NotRun
            } else {
                InclusionStatus::Excluded
            };
            PlannedTest::new(TestPlanEntry {
                file,
                interpreter,
                inclusion,
                package: Arc::clone(&package),
                packages_repo: packages_repo.to_string(),
            })
        })
        .collect();

    Ok(PackagePlan { package, tests })
}

/// Lists candidate test files of a package directory in execution order.
/// 按执行顺序列出包目录中的候选测试文件。
pub fn list_test_files(in_dir: &Path) -> Result<Vec<(String, Interpreter)>> {
    let mut groups: [Vec<(String, Interpreter)>; 2] = [Vec::new(), Vec::new()];

    let entries = fs::read_dir(in_dir).map_err(|e| TestrError::io(in_dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| TestrError::io(in_dir, e))?;
        if !entry.path().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(group) = TEST_PREFIXES.iter().position(|p| name.starts_with(p)) else {
            continue;
        };
        if let Some(interpreter) = Interpreter::from_file_name(&name) {
            groups[group].push((name, interpreter));
        }
    }

    let mut files = Vec::new();
    for mut group in groups {
        group.sort_by(|a, b| a.0.cmp(&b.0));
        files.extend(group);
    }
    Ok(files)
}
