//! # Report Aggregation Module / 报告聚合模块
//!
//! Folds the settled outcomes of a run into a hierarchical [`Report`]: one
//! suite per package, one case per test (or per case of a test's own
//! sub-report), plus run-level metadata. The report is serialized once, after
//! every package has run.
//!
//! 将一次运行中已确定的结果汇总为分层的 [`Report`]：每个包一个测试套件，
//! 每个测试一个用例（或测试自身子报告中的每个用例），以及运行级元数据。
//! 报告在所有包运行完成后只序列化一次。

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use crate::core::config::RunContext;
use crate::core::models::{PackagePlan, PlannedTest, TestPlan, TestStatus};
use crate::infra::fs::{relative_to, slash_path};
use crate::infra::host::HostInfo;

/// Status of a report case. Restricted to this three-way taxonomy plus `error`.
/// 报告用例的状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    Pass,
    Fail,
    Skipped,
    Error,
}

impl CaseStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, CaseStatus::Fail | CaseStatus::Error)
    }
}

/// Message attached to a failing, erroring or skipped case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl CaseDetail {
    fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            output: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub name: String,
    /// Test file, relative to the log directory.
    pub file: String,
    pub timestamp: Option<DateTime<Local>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
    pub status: CaseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<CaseDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped: Option<CaseDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CaseDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteProperties {
    #[serde(flatten)]
    pub host: HostInfo,
    pub package: String,
    pub package_version: String,
    pub t_start: Option<DateTime<Local>>,
    pub t_stop: Option<DateTime<Local>>,
    pub out_dir: String,
    pub regress_dir: String,
}

/// All cases of one package.
/// 一个包的所有用例。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSuite {
    pub name: String,
    pub package: String,
    pub timestamp: Option<DateTime<Local>>,
    pub properties: SuiteProperties,
    pub test_cases: Vec<TestCase>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
    pub date: DateTime<Local>,
    pub argv: Vec<String>,
    pub command_line: String,
    pub testr_version: String,
    pub test_spec: Option<String>,
    /// Earliest test start across all suites.
    pub t_start: Option<DateTime<Local>>,
    /// Latest test stop across all suites.
    pub t_stop: Option<DateTime<Local>>,
    pub architecture: Vec<String>,
    pub hostname: Vec<String>,
    pub system: Vec<String>,
    pub platform: Vec<String>,
    pub package_versions: BTreeMap<String, String>,
}

/// The persisted result of a run (`all_tests.json`).
/// 一次运行的持久化结果（`all_tests.json`）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub run_info: RunInfo,
    pub test_suites: Vec<TestSuite>,
}

/// Case counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportCounts {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl Report {
    pub fn counts(&self) -> ReportCounts {
        let mut counts = ReportCounts::default();
        for case in self.test_suites.iter().flat_map(|s| &s.test_cases) {
            counts.total += 1;
            match case.status {
                CaseStatus::Pass => counts.passed += 1,
                CaseStatus::Fail => counts.failed += 1,
                CaseStatus::Skipped => counts.skipped += 1,
                CaseStatus::Error => counts.errors += 1,
            }
        }
        counts
    }

    pub fn has_failures(&self) -> bool {
        self.test_suites
            .iter()
            .flat_map(|s| &s.test_cases)
            .any(|c| c.status.is_failure())
    }

    /// Writes the report as pretty-printed JSON.
    /// 将报告写为格式化的 JSON。
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize report")?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
        Ok(())
    }

    pub fn read_json(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read report: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse report: {}", path.display()))
    }
}

/// Machine-readable results a test may write next to its log.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubReport {
    #[serde(default)]
    pub test_cases: Vec<SubReportCase>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubReportCase {
    pub name: String,
    pub status: CaseStatus,
    #[serde(default)]
    pub failure: Option<CaseDetail>,
    #[serde(default)]
    pub skipped: Option<CaseDetail>,
    #[serde(default)]
    pub error: Option<CaseDetail>,
    #[serde(default)]
    pub stdout: Option<String>,
}

impl SubReport {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read sub-report: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse sub-report: {}", path.display()))
    }
}

/// Builds the report of a finished (or collect-only) run.
///
/// 构建已完成（或仅收集）运行的报告。
pub fn build_report(ctx: &RunContext, plan: &TestPlan) -> Report {
    let test_suites: Vec<TestSuite> = plan
        .packages
        .iter()
        .map(|package| build_suite(ctx, package))
        .collect();
    let run_info = build_run_info(ctx, &test_suites);
    Report {
        run_info,
        test_suites,
    }
}

fn build_run_info(ctx: &RunContext, suites: &[TestSuite]) -> RunInfo {
    let argv = ctx.options.argv.clone();
    let command_line = shlex::try_join(argv.iter().map(String::as_str))
        .unwrap_or_else(|_| argv.join(" "));

    RunInfo {
        date: ctx.started,
        argv,
        command_line,
        testr_version: env!("CARGO_PKG_VERSION").to_string(),
        test_spec: ctx.test_spec.as_ref().map(|p| p.display().to_string()),
        t_start: suites.iter().filter_map(|s| s.properties.t_start).min(),
        t_stop: suites.iter().filter_map(|s| s.properties.t_stop).max(),
        architecture: unique_facts(ctx, suites, |h| h.architecture.as_str()),
        hostname: unique_facts(ctx, suites, |h| h.hostname.as_str()),
        system: unique_facts(ctx, suites, |h| h.system.as_str()),
        platform: unique_facts(ctx, suites, |h| h.platform.as_str()),
        package_versions: suites
            .iter()
            .map(|s| (s.package.clone(), s.properties.package_version.clone()))
            .collect(),
    }
}

/// Sorted, de-duplicated host facts across suites.
fn unique_facts(ctx: &RunContext, suites: &[TestSuite], field: fn(&HostInfo) -> &str) -> Vec<String> {
    suites
        .iter()
        .map(|s| field(&s.properties.host))
        .chain(std::iter::once(field(&ctx.host)))
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn build_suite(ctx: &RunContext, plan: &PackagePlan) -> TestSuite {
    let package = &plan.package;
    let t_start = plan.tests.iter().filter_map(|t| t.outcome.t_start).min();
    let t_stop = plan.tests.iter().filter_map(|t| t.outcome.t_stop).max();

    let test_cases = plan
        .tests
        .iter()
        .flat_map(|test| build_cases(ctx, test))
        .collect();

    TestSuite {
        name: package.name.clone(),
        package: package.name.clone(),
        timestamp: t_start,
        properties: SuiteProperties {
            host: ctx.host.clone(),
            package: package.name.clone(),
            package_version: package.version.clone(),
            t_start,
            t_stop,
            out_dir: package.out_dir.display().to_string(),
            regress_dir: package.regress_dir.display().to_string(),
        },
        test_cases,
    }
}

/// Cases for one test: its sub-report cases when readable, else a single
/// synthesized case. A failing test always yields at least one failing case.
fn build_cases(ctx: &RunContext, test: &PlannedTest) -> Vec<TestCase> {
    let file = slash_path(&relative_to(&test.entry.out_path(), &ctx.log_dir));
    let log = test
        .outcome
        .log
        .as_ref()
        .filter(|p| p.exists())
        .map(|p| slash_path(&relative_to(p, &ctx.log_dir)));

    let mut cases = match test.outcome.sub_report.as_deref().map(SubReport::load) {
        Some(Ok(sub)) => sub
            .test_cases
            .into_iter()
            .map(|c| TestCase {
                name: c.name,
                file: file.clone(),
                timestamp: test.outcome.t_start,
                log: log.clone(),
                status: c.status,
                stdout: c.stdout,
                failure: c.failure,
                skipped: c.skipped,
                error: c.error,
            })
            .collect(),
        Some(Err(e)) => {
            let error = format!("{e:#}");
            tracing::warn!(file = %test.entry.file, %error, "ignoring unreadable sub-report");
            Vec::new()
        }
        None => Vec::new(),
    };

    let hidden_failure =
        test.outcome.status.is_failure() && !cases.iter().any(|c| c.status.is_failure());
    if cases.is_empty() || hidden_failure {
        cases.push(synthesize_case(ctx, test, file, log));
    }
    cases
}

fn synthesize_case(
    ctx: &RunContext,
    test: &PlannedTest,
    file: String,
    log: Option<String>,
) -> TestCase {
    let entry = &test.entry;
    let outcome = &test.outcome;
    let mut case = TestCase {
        name: entry.file.clone(),
        file,
        timestamp: outcome.t_start,
        log,
        status: CaseStatus::Skipped,
        stdout: None,
        failure: None,
        skipped: None,
        error: None,
    };

    match outcome.status {
        TestStatus::Pass => case.status = CaseStatus::Pass,
        TestStatus::Fail => {
            case.status = CaseStatus::Fail;
            case.failure = Some(CaseDetail {
                message: Some(format!("{} failed", entry.file)),
                output: outcome.message.clone(),
            });
        }
        TestStatus::Error => {
            case.status = CaseStatus::Error;
            case.error = Some(CaseDetail::message(
                outcome
                    .message
                    .clone()
                    .unwrap_or_else(|| format!("{} errored", entry.file)),
            ));
        }
        TestStatus::Skipped => {
            case.skipped = Some(CaseDetail {
                message: outcome.message.clone(),
                output: None,
            });
        }
        TestStatus::Excluded => {
            case.skipped = Some(CaseDetail::message(format!("{} excluded", entry.file)));
        }
        TestStatus::NotRun => {
            let message = if ctx.options.collect_only {
                format!("{} not run (collect-only)", entry.file)
            } else {
                format!("{} not run", entry.file)
            };
            case.skipped = Some(CaseDetail::message(message));
        }
    }

    if ctx.options.include_stdout {
        case.stdout = outcome
            .log
            .as_ref()
            .and_then(|p| fs::read(p).ok())
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned());
    }
    case
}
