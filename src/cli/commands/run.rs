//! # Run Command Module / 运行命令模块
//!
//! This module implements the `run` command of the testr CLI: it discovers the
//! packages' tests, runs them package by package and writes the aggregated
//! report.
//!
//! 此模块实现了 testr CLI 的 `run` 命令：发现各包的测试，逐包运行，
//! 并写入汇总报告。

use anyhow::{Context, Result};
use colored::*;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        config::{RunContext, RunOptions},
        discovery,
        execution::{Executor, ExecutorSettings},
        models::TestPlan,
        skip::EvalContext,
    },
    infra::{
        fs::make_run_dir,
        host::HostInfo,
        logging::{RunLog, console},
        t,
    },
    reporting::{
        console::print_results_table,
        html::write_html_report,
        report::{Report, build_report},
    },
};

/// Executes the run command with the provided options.
///
/// # Returns
/// `Ok(())` if every executed test passed; an error if the configuration is
/// invalid, the run was aborted or any test failed.
pub async fn execute(options: RunOptions) -> Result<()> {
    let ctx = RunContext::resolve(options, HostInfo::detect())?;
    let mut plan = discovery::discover(&ctx)?;
    let reusing = make_run_dir(&ctx.log_dir)?;
    // Console output from here on is mirrored into `<log dir>/test.log`.
    let _run_log = RunLog::open(&ctx.log_dir)?;

    console(t!("run.packages_root", path = ctx.packages_dir.display()));
    if let Some(spec) = &ctx.test_spec {
        console(t!("run.using_test_spec", path = spec.display()));
    }
    console(
        t!(
            "run.discovered",
            tests = plan.test_count(),
            packages = plan.packages.len()
        )
        .cyan(),
    );
    if reusing {
        console(t!("run.reusing_log_dir", path = ctx.log_dir.display()).yellow());
    }
    console(t!("run.log_dir", path = ctx.log_dir.display()));

    let run_result = if ctx.options.collect_only {
        console(t!("run.collect_only").yellow());
        Ok(())
    } else {
        run_packages(&ctx, &mut plan, setup_signal_handler()).await
    };
    // The report is written even when the run aborts half-way.
    let report = write_reports(&ctx, &plan)?;
    run_result?;

    print_results_table(&plan, &report);
    if report.has_failures() {
        anyhow::bail!(t!("run.tests_failed").to_string());
    }
    Ok(())
}

async fn run_packages(
    ctx: &RunContext,
    plan: &mut TestPlan,
    cancel: CancellationToken,
) -> Result<()> {
    let settings = ExecutorSettings {
        overwrite: ctx.options.overwrite,
        python: ctx.options.python.clone(),
        timeout: ctx.options.timeout,
        echo: true,
        eval: EvalContext::current(),
    };
    let executor = Executor::new(settings, cancel);

    for package in plan.packages.iter_mut() {
        executor
            .run_package(package)
            .await
            .with_context(|| format!("Failed to run package '{}'", package.package.name))?;
    }
    Ok(())
}

fn write_reports(ctx: &RunContext, plan: &TestPlan) -> Result<Report> {
    let report = build_report(ctx, plan);
    let report_path = ctx.report_path();
    report.write_json(&report_path)?;
    console(t!("run.report_written", path = report_path.display()));

    if let Some(html_path) = &ctx.options.html {
        console(t!("run.html_report_generating", path = html_path.display()));
        if let Err(e) = write_html_report(&report, html_path) {
            eprintln!("{} {:#}", t!("run.html_report_failed").red(), e);
        }
    }
    Ok(report)
}

/// Sets up a signal handler for graceful shutdown.
fn setup_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl-C");
            return;
        }
        console(format!("\n{}", t!("run.shutdown_signal").yellow()));
        token_clone.cancel();
    });

    token
}
