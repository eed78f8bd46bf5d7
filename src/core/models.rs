//! # Data Models Module / 数据模型模块
//!
//! This module defines the core data structures used throughout the orchestrator:
//! packages, discovered test plan entries, their execution outcomes and the
//! per-package plan that ties them together.
//!
//! 此模块定义了整个编排器中使用的核心数据结构：
//! 包、发现的测试计划条目、它们的执行结果，以及将它们组织在一起的每包计划。

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::error::{Result, TestrError};

/// How a discovered test file is invoked. Resolved once at discovery time.
/// 被发现的测试文件的调用方式。在发现阶段一次性确定。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpreter {
    /// Run as `<python> <file>`.
    Python,
    /// File contents are executed as an inline, traced `bash` command block.
    /// 文件内容作为内联的、可追踪的 `bash` 命令块执行。
    Shell,
    /// Run the file itself as a program.
    DirectExecutable,
}

impl Interpreter {
    /// Infers the interpreter from a file name's suffix.
    ///
    /// Returns `None` for suffixes that do not identify a test script
    /// (e.g. `.log`, `.txt`), so such files are never treated as tests.
    ///
    /// 根据文件名后缀推断解释器。对于不代表测试脚本的后缀返回 `None`。
    pub fn from_file_name(name: &str) -> Option<Self> {
        match Path::new(name).extension().and_then(|ext| ext.to_str()) {
            Some("py") => Some(Interpreter::Python),
            Some("sh") | Some("bash") => Some(Interpreter::Shell),
            Some(_) => None,
            None => Some(Interpreter::DirectExecutable),
        }
    }

    /// The tag exposed to tests as `TESTR_INTERPRETER`.
    pub fn tag(&self) -> &'static str {
        match self {
            Interpreter::Python => "python",
            Interpreter::Shell => "bash",
            Interpreter::DirectExecutable => "executable",
        }
    }
}

impl fmt::Display for Interpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Decision of the inclusion filter. Set once at discovery and never changed.
/// 包含过滤器的决定。在发现阶段设置一次，之后不再改变。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InclusionStatus {
    NotRun,
    Excluded,
}

/// Execution status of a test.
/// 测试的执行状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestStatus {
    NotRun,
    Excluded,
    Skipped,
    Pass,
    Fail,
    Error,
}

impl TestStatus {
    /// `true` for statuses that make the overall run fail.
    pub fn is_failure(&self) -> bool {
        matches!(self, TestStatus::Fail | TestStatus::Error)
    }

    /// `true` once the executor has recorded a result.
    pub fn is_settled(&self) -> bool {
        !matches!(self, TestStatus::NotRun)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::NotRun => "not run",
            TestStatus::Excluded => "----",
            TestStatus::Skipped => "skipped",
            TestStatus::Pass => "pass",
            TestStatus::Fail => "FAIL",
            TestStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named unit under the packages root. Immutable for the run's duration.
/// 包根目录下的一个命名单元。在运行期间不可变。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub name: String,
    /// Source directory under the packages root / 包根目录下的源目录
    pub in_dir: PathBuf,
    /// Absolute working-copy directory for this run / 本次运行的绝对工作副本目录
    pub out_dir: PathBuf,
    /// Absolute regression archive directory for this run / 本次运行的绝对回归归档目录
    pub regress_dir: PathBuf,
    pub version: String,
}

/// One discovered test file within a package.
/// 包内一个被发现的测试文件。
#[derive(Debug, Clone)]
pub struct TestPlanEntry {
    pub file: String,
    pub interpreter: Interpreter,
    pub inclusion: InclusionStatus,
    pub package: Arc<Package>,
    /// Base URL of the upstream package repositories.
    pub packages_repo: String,
}

impl TestPlanEntry {
    /// `<package>/<file>`, the path the inclusion filter matches against.
    pub fn package_path(&self) -> String {
        format!("{}/{}", self.package.name, self.file)
    }

    /// Path of the test file inside the package working copy.
    pub fn out_path(&self) -> PathBuf {
        self.package.out_dir.join(&self.file)
    }

    /// Per-test log file: the full file name with `.log` appended.
    /// 每个测试的日志文件：完整文件名后追加 `.log`。
    pub fn log_path(&self) -> PathBuf {
        self.package.out_dir.join(format!("{}.log", self.file))
    }

    /// Location where a test may write its machine-readable sub-report.
    /// 测试可以写入其机器可读子报告的位置。
    pub fn sub_report_path(&self) -> PathBuf {
        self.package.out_dir.join(format!("{}.json", self.file))
    }

    /// The `TESTR_*` variables exposing this entry's fields to the running test.
    ///
    /// 通过 `TESTR_*` 环境变量向正在运行的测试暴露此条目的字段。
    pub fn env_vars(&self, status: TestStatus) -> Vec<(String, String)> {
        let fields = [
            ("file", self.file.clone()),
            ("status", status.as_str().to_string()),
            ("interpreter", self.interpreter.tag().to_string()),
            ("package", self.package.name.clone()),
            ("package_version", self.package.version.clone()),
            ("out_dir", self.package.out_dir.display().to_string()),
            ("regress_dir", self.package.regress_dir.display().to_string()),
            ("packages_repo", self.packages_repo.clone()),
        ];
        fields
            .into_iter()
            .map(|(key, value)| (format!("TESTR_{}", key.to_uppercase()), value))
            .collect()
    }
}

/// The execution record of a test plan entry.
///
/// Starts as `not-run` (or `excluded`) and is settled exactly once by the
/// executor; a second attempt is rejected.
///
/// 测试计划条目的执行记录。初始为 `not-run`（或 `excluded`），
/// 由执行器恰好设置一次；第二次尝试会被拒绝。
#[derive(Debug, Clone, PartialEq)]
pub struct TestOutcome {
    pub status: TestStatus,
    /// Skip reason, failure or error text / 跳过原因、失败或错误文本
    pub message: Option<String>,
    pub t_start: Option<DateTime<Local>>,
    pub t_stop: Option<DateTime<Local>>,
    pub log: Option<PathBuf>,
    pub sub_report: Option<PathBuf>,
}

impl TestOutcome {
    pub fn new(inclusion: InclusionStatus) -> Self {
        let status = match inclusion {
            InclusionStatus::NotRun => TestStatus::NotRun,
            InclusionStatus::Excluded => TestStatus::Excluded,
        };
        Self {
            status,
            message: None,
            t_start: None,
            t_stop: None,
            log: None,
            sub_report: None,
        }
    }

    /// Records a terminal status for a test that has not run yet.
    /// 为尚未运行的测试记录终止状态。
    pub fn settle(
        &mut self,
        file: &str,
        status: TestStatus,
        message: Option<String>,
    ) -> Result<()> {
        if self.status != TestStatus::NotRun || !status.is_settled() {
            return Err(TestrError::OutcomeAlreadySettled(file.to_string()));
        }
        self.status = status;
        self.message = message;
        Ok(())
    }
}

/// A discovered entry paired with its outcome.
#[derive(Debug, Clone)]
pub struct PlannedTest {
    pub entry: TestPlanEntry,
    pub outcome: TestOutcome,
}

impl PlannedTest {
    pub fn new(entry: TestPlanEntry) -> Self {
        let outcome = TestOutcome::new(entry.inclusion);
        Self { entry, outcome }
    }

    pub fn is_runnable(&self) -> bool {
        self.entry.inclusion == InclusionStatus::NotRun
    }
}

/// All tests of one package, in discovery order.
/// 一个包的所有测试，按发现顺序排列。
#[derive(Debug, Clone)]
pub struct PackagePlan {
    pub package: Arc<Package>,
    pub tests: Vec<PlannedTest>,
}

impl PackagePlan {
    pub fn runnable_count(&self) -> usize {
        self.tests.iter().filter(|t| t.is_runnable()).count()
    }
}

/// The whole discovered plan: packages sorted by name.
/// 完整的发现计划：按名称排序的包。
#[derive(Debug, Clone, Default)]
pub struct TestPlan {
    pub packages: Vec<PackagePlan>,
}

impl TestPlan {
    pub fn test_count(&self) -> usize {
        self.packages.iter().map(|p| p.tests.len()).sum()
    }
}
