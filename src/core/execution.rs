//! # Test Execution Engine Module / 测试执行引擎模块
//!
//! Runs the tests of one package: materializes a fresh working copy, applies
//! skip rules, injects the `TESTR_*` environment, dispatches on the interpreter
//! and classifies each outcome by exit status. Tests run one at a time in
//! discovery order and are never retried.
//!
//! 运行单个包的测试：创建新的工作副本、应用跳过规则、注入 `TESTR_*` 环境变量、
//! 按解释器分派并根据退出状态对每个结果分类。测试按发现顺序逐个运行，且从不重试。

use anyhow::Result;
use chrono::Local;
use colored::*;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        error::TestrError,
        models::{Interpreter, PackagePlan, PlannedTest, TestPlanEntry, TestStatus},
        skip::{EvalContext, SkipSpec},
    },
    infra::{
        command::{self, ProcessEnd},
        logging::console,
        fs::materialize_dir,
        t,
    },
    reporting::console::{box_output, print_package_summary},
};

/// Prompt printed before every traced shell line (`Bash-HH:MM:SS> `).
pub const SHELL_TRACE_PROMPT: &str = "Bash-\\t> ";

/// Settings shared by every package execution of a run.
/// 一次运行中所有包执行共享的设置。
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    /// Replace a pre-existing package output directory / 替换已存在的包输出目录
    pub overwrite: bool,
    /// Program used for Python tests / 用于 Python 测试的程序
    pub python: String,
    pub timeout: Option<Duration>,
    /// Relay test output to the console / 将测试输出转发到控制台
    pub echo: bool,
    pub eval: EvalContext,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            overwrite: false,
            python: "python3".to_string(),
            timeout: None,
            echo: true,
            eval: EvalContext::current(),
        }
    }
}

/// Runs the tests of packages one after another.
pub struct Executor {
    settings: ExecutorSettings,
    cancel: CancellationToken,
}

impl Executor {
    pub fn new(settings: ExecutorSettings, cancel: CancellationToken) -> Self {
        Self { settings, cancel }
    }

    /// Executes every runnable test of `plan`, settling each outcome once.
    ///
    /// A package without runnable tests is left untouched: no working copy is
    /// made. An invalid `skip.toml` aborts only this package, recording each
    /// runnable test as `error`. A pre-existing output directory without
    /// overwrite permission is returned as an error and aborts the run.
    ///
    /// 执行 `plan` 中每个可运行的测试，每个结果只设置一次。
    /// 没有可运行测试的包不会被处理，也不会创建工作副本。
    /// 无效的 `skip.toml` 只会中止此包，并将其每个可运行测试记录为 `error`。
    /// 在没有覆盖权限时已存在的输出目录会作为错误返回并中止运行。
    pub async fn run_package(&self, plan: &mut PackagePlan) -> Result<()> {
        let package = plan.package.clone();

        if plan.runnable_count() == 0 {
            box_output(
                &[t!("run.package_no_tests", name = &package.name).to_string()],
                40,
            );
            return Ok(());
        }
        box_output(&[t!("run.package_header", name = &package.name).to_string()], 40);

        let skip_spec = match SkipSpec::load(&package.in_dir) {
            Ok(spec) => spec,
            Err(e) => {
                console(t!("run.package_aborted", name = &package.name, error = &e).red());
                abort_package(plan, &e)?;
                print_package_summary(plan);
                return Ok(());
            }
        };

        console(t!(
            "run.copying_inputs",
            from = package.in_dir.display(),
            to = package.out_dir.display()
        ));
        materialize_dir(&package.in_dir, &package.out_dir, self.settings.overwrite)?;

        for test in plan.tests.iter_mut().filter(|t| t.is_runnable()) {
            if self.cancel.is_cancelled() {
                let reason = t!("run.cancelled_reason").to_string();
                test.outcome
                    .settle(&test.entry.file, TestStatus::Skipped, Some(reason))?;
                continue;
            }

            if let Some(reason) = skip_spec.check(&test.entry.file, &self.settings.eval) {
                console(
                    t!("run.skipping_test", file = &test.entry.file, reason = &reason).yellow(),
                );
                test.outcome
                    .settle(&test.entry.file, TestStatus::Skipped, Some(reason))?;
                continue;
            }

            self.run_test(test).await?;
        }

        print_package_summary(plan);
        Ok(())
    }

    /// Runs a single test and records its outcome.
    /// 运行单个测试并记录其结果。
    async fn run_test(&self, test: &mut PlannedTest) -> Result<()> {
        let entry = &test.entry;
        let log_path = entry.log_path();

        console(
            t!(
                "run.running_test",
                interpreter = entry.interpreter,
                file = &entry.file
            )
            .blue(),
        );

        let started = Local::now();
        let result = match build_command(entry, &self.settings) {
            Ok(cmd) => {
                command::spawn_and_tee(
                    cmd,
                    &log_path,
                    self.settings.echo,
                    self.settings.timeout,
                    &self.cancel,
                )
                .await
            }
            Err(e) => Err(e),
        };
        let stopped = Local::now();

        let (status, message) = classify(entry, result);
        tracing::debug!(file = %entry.file, status = %status, "test finished");

        match status {
            TestStatus::Pass => console(t!("run.test_passed", file = &entry.file).green()),
            _ => console(t!("run.test_failed", file = &entry.file, status = status).red()),
        }

        let outcome = &mut test.outcome;
        outcome.settle(&entry.file, status, message)?;
        outcome.t_start = Some(started);
        outcome.t_stop = Some(stopped);
        outcome.log = log_path.exists().then_some(log_path);
        let sub_report = entry.sub_report_path();
        outcome.sub_report = sub_report.exists().then_some(sub_report);
        Ok(())
    }
}

/// Records every runnable test of an aborted package as `error`.
fn abort_package(plan: &mut PackagePlan, error: &TestrError) -> Result<()> {
    let message = error.to_string();
    for test in plan.tests.iter_mut().filter(|t| t.is_runnable()) {
        test.outcome
            .settle(&test.entry.file, TestStatus::Error, Some(message.clone()))?;
    }
    Ok(())
}

/// Maps a process result onto a test status: exit zero is `pass`, any other
/// exit is `fail`, and a process that could not run or had to be killed is
/// `error`.
///
/// 将进程结果映射为测试状态：退出码为零为 `pass`，其他退出码为 `fail`，
/// 无法运行或必须被终止的进程为 `error`。
pub fn classify(
    entry: &TestPlanEntry,
    result: std::io::Result<ProcessEnd>,
) -> (TestStatus, Option<String>) {
    match result {
        Ok(ProcessEnd::Exited(status)) if status.success() => (TestStatus::Pass, None),
        Ok(ProcessEnd::Exited(status)) => (
            TestStatus::Fail,
            Some(match status.code() {
                Some(code) => format!("{} failed with exit code {}", entry.file, code),
                None => format!("{} was terminated by a signal", entry.file),
            }),
        ),
        Ok(ProcessEnd::TimedOut(limit)) => (
            TestStatus::Error,
            Some(format!(
                "{} timed out after {} s",
                entry.file,
                limit.as_secs()
            )),
        ),
        Ok(ProcessEnd::Cancelled) => (
            TestStatus::Error,
            Some(format!("{} cancelled", entry.file)),
        ),
        Err(e) => (
            TestStatus::Error,
            Some(format!("{} could not be run: {}", entry.file, e)),
        ),
    }
}

/// Prefixes shell source with the trace setup. PS4 is assigned inside the
/// script because bash ignores an inherited PS4 when running as root.
pub fn traced_shell_source(source: &str) -> String {
    format!("PS4='{SHELL_TRACE_PROMPT}'; set -x\n{source}")
}

/// Builds the command for a test according to its interpreter.
///
/// Python tests run as `<python> <file>`. Shell tests have their source read
/// and executed inline by `bash -e -c` after `set -x`, so each line is traced with a
/// `Bash-HH:MM:SS>` prompt and the first failing line ends the test. Other
/// tests are executed directly.
///
/// 根据解释器为测试构建命令。Python 测试以 `<python> <file>` 运行。
/// Shell 测试读取其源码并在 `set -x` 之后由 `bash -e -c` 内联执行，每一行都带有
/// `Bash-HH:MM:SS>` 提示符追踪，第一个失败的行会结束测试。其他测试直接执行。
pub fn build_command(
    entry: &TestPlanEntry,
    settings: &ExecutorSettings,
) -> std::io::Result<Command> {
    let out_dir = &entry.package.out_dir;

    let mut cmd = match entry.interpreter {
        Interpreter::Python => {
            let mut cmd = Command::new(&settings.python);
            cmd.arg(&entry.file);
            cmd
        }
        Interpreter::Shell => {
            let source = fs::read_to_string(entry.out_path())?;
            let mut cmd = Command::new("bash");
            cmd.arg("-e").arg("-c").arg(traced_shell_source(&source));
            cmd
        }
        Interpreter::DirectExecutable => Command::new(absolute_test_path(entry)),
    };

    cmd.current_dir(out_dir)
        .envs(entry.env_vars(TestStatus::NotRun));
    Ok(cmd)
}

fn absolute_test_path(entry: &TestPlanEntry) -> PathBuf {
    let path = entry.out_path();
    std::path::absolute(&path).unwrap_or(path)
}
