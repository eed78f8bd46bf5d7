//! # Run Configuration Module / 运行配置模块
//!
//! Holds the options of a `testr run` invocation and resolves them once into a
//! [`RunContext`]: absolute directories, the run id, the merged include/exclude
//! lists and the inclusion filter. The context is owned by the run command and
//! passed by reference to every component.
//!
//! 保存 `testr run` 调用的选项，并将其一次性解析为 [`RunContext`]：
//! 绝对目录、运行 ID、合并后的包含/排除列表以及包含过滤器。

use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::error::{Result, TestrError};
use crate::core::filter::InclusionFilter;
use crate::infra::host::HostInfo;

/// Default base URL for upstream package repositories.
pub const DEFAULT_PACKAGES_REPO: &str = "https://github.com/sot";

/// Options for a single run, as given on the command line.
/// 单次运行的选项，来自命令行。
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Directory containing the `packages/` tree / 包含 `packages/` 目录树的目录
    pub root: PathBuf,
    /// Root for run outputs, logs and regression archives / 运行输出、日志和回归归档的根目录
    pub outputs_dir: PathBuf,
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
    /// Discover and report without executing / 只发现并报告，不执行
    pub collect_only: bool,
    pub test_spec: Option<PathBuf>,
    pub packages_repo: String,
    /// Replace a pre-existing package output directory instead of aborting.
    pub overwrite: bool,
    /// Program used for Python tests.
    pub python: String,
    pub timeout: Option<Duration>,
    /// Embed each test's log in its report case.
    pub include_stdout: bool,
    pub html: Option<PathBuf>,
    /// The command line that started this run, recorded in the report.
    pub argv: Vec<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            outputs_dir: PathBuf::from("outputs"),
            includes: Vec::new(),
            excludes: Vec::new(),
            collect_only: false,
            test_spec: None,
            packages_repo: DEFAULT_PACKAGES_REPO.to_string(),
            overwrite: false,
            python: "python3".to_string(),
            timeout: None,
            include_stdout: false,
            html: None,
            argv: Vec::new(),
        }
    }
}

/// Include/exclude entries read from a test-spec file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestSpec {
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
}

impl TestSpec {
    /// Parses newline-delimited entries: `pattern` includes, `-pattern`
    /// excludes, blank and `#` lines are ignored.
    ///
    /// 解析按行分隔的条目：`pattern` 为包含，`-pattern` 为排除，空行和 `#` 行被忽略。
    pub fn parse(content: &str) -> Self {
        let mut spec = TestSpec::default();
        for line in content.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match line.strip_prefix('-') {
                Some(exclude) => spec.excludes.push(exclude.trim().to_string()),
                None => spec.includes.push(line.to_string()),
            }
        }
        spec
    }
}

/// Fully resolved configuration of a run.
/// 完全解析后的运行配置。
#[derive(Debug, Clone)]
pub struct RunContext {
    pub options: RunOptions,
    pub root: PathBuf,
    pub outputs_dir: PathBuf,
    pub packages_dir: PathBuf,
    pub run_id: String,
    /// Absolute directory holding package working copies, logs and the report.
    pub log_dir: PathBuf,
    /// Absolute regression archive directory for this run.
    pub regress_dir: PathBuf,
    /// Resolved test-spec file, if any.
    pub test_spec: Option<PathBuf>,
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
    pub filter: InclusionFilter,
    pub host: HostInfo,
    pub started: DateTime<Local>,
}

impl RunContext {
    /// Resolves `options` against the current directory and host.
    pub fn resolve(options: RunOptions, host: HostInfo) -> Result<Self> {
        Self::resolve_at(options, host, Local::now())
    }

    /// Like [`RunContext::resolve`], with an explicit start time.
    /// 与 [`RunContext::resolve`] 相同，但显式指定开始时间。
    pub fn resolve_at(options: RunOptions, host: HostInfo, started: DateTime<Local>) -> Result<Self> {
        let root = absolute(&options.root)?;
        let outputs_dir = absolute(&options.outputs_dir)?;
        let packages_dir = root.join("packages");

        let run_id = make_run_id(&host, started);
        let log_dir = outputs_dir.join("logs").join(&run_id);
        let mut regress_dir = outputs_dir.join("regress").join(&run_id);

        let mut includes = options.includes.clone();
        let mut excludes = options.excludes.clone();

        let test_spec = match &options.test_spec {
            Some(path) => {
                let path = resolve_test_spec(path, &root)?;
                let content = fs::read_to_string(&path).map_err(|e| TestrError::io(&path, e))?;
                let spec = TestSpec::parse(&content);
                includes.extend(spec.includes);
                excludes.extend(spec.excludes);
                // Regression outputs of a test-spec run go in their own sub-directory.
                if let Some(name) = path.file_name() {
                    regress_dir = regress_dir.join(name);
                }
                Some(path)
            }
            None => None,
        };

        if includes.is_empty() {
            includes.push("*".to_string());
        }
        let filter = InclusionFilter::new(includes.clone(), excludes.clone());

        Ok(Self {
            options,
            root,
            outputs_dir,
            packages_dir,
            run_id,
            log_dir,
            regress_dir,
            test_spec,
            includes,
            excludes,
            filter,
            host,
            started,
        })
    }

    /// Path of the JSON report for this run.
    pub fn report_path(&self) -> PathBuf {
        self.log_dir.join("all_tests.json")
    }
}

/// Looks for the test-spec file as given, then relative to `root`.
fn resolve_test_spec(path: &Path, root: &Path) -> Result<PathBuf> {
    if path.is_file() {
        return absolute(path);
    }
    let under_root = root.join(path);
    if under_root.is_file() {
        return Ok(under_root);
    }
    Err(TestrError::TestSpecMissing(path.to_path_buf()))
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|e| TestrError::io(path, e))
}

/// Builds `<System>_<timestamp>_<version>_<hostname>`, without `:` characters
/// so the id is usable as a directory name everywhere.
///
/// 构建 `<System>_<timestamp>_<version>_<hostname>`，不含 `:` 字符，
/// 以便在任何平台上都可作为目录名使用。
pub fn make_run_id(host: &HostInfo, started: DateTime<Local>) -> String {
    let id = format!(
        "{}_{}_{}_{}",
        host.system,
        started.format("%Y-%m-%dT%H:%M:%S"),
        env!("CARGO_PKG_VERSION"),
        host.hostname
    );
    id.replace([':', '/', '\\', ' '], "-")
}
