//! # Run Pipeline Integration Tests / 运行流水线集成测试
//!
//! Drives discovery, the executor and report aggregation over temporary
//! package trees. `.py` tests are plain shell run with `python = "sh"`, so no
//! Python installation is needed; shell tests need `bash`.
//!
//! 在临时包目录树上驱动发现、执行器和报告汇总。`.py` 测试是用
//! `python = "sh"` 运行的普通 shell 脚本，因此不需要安装 Python；shell 测试需要 `bash`。

#![cfg(unix)]

mod common;

use common::Workspace;
use std::fs;
use std::time::Duration;
use testr::core::config::{RunContext, RunOptions};
use testr::core::discovery::discover;
use testr::core::execution::{Executor, ExecutorSettings};
use testr::core::models::{TestPlan, TestStatus};
use testr::core::skip::EvalContext;
use testr::infra::fs::make_run_dir;
use testr::infra::host::HostInfo;
use testr::reporting::html::render_html;
use testr::reporting::report::{CaseStatus, Report, build_report};
use tokio_util::sync::CancellationToken;

fn settings() -> ExecutorSettings {
    ExecutorSettings {
        python: "sh".to_string(),
        echo: false,
        eval: EvalContext {
            os: "linux".to_string(),
            pointer_width: 64,
        },
        ..ExecutorSettings::default()
    }
}

fn context(options: RunOptions) -> RunContext {
    RunContext::resolve(options, HostInfo::detect()).unwrap()
}

async fn run_with(
    ctx: &RunContext,
    settings: ExecutorSettings,
    cancel: CancellationToken,
) -> anyhow::Result<TestPlan> {
    make_run_dir(&ctx.log_dir)?;
    let mut plan = discover(ctx)?;
    let executor = Executor::new(settings, cancel);
    for package in plan.packages.iter_mut() {
        executor.run_package(package).await?;
    }
    Ok(plan)
}

async fn run_all(ctx: &RunContext) -> TestPlan {
    run_with(ctx, settings(), CancellationToken::new())
        .await
        .unwrap()
}

fn statuses(plan: &TestPlan, package: &str) -> Vec<(String, TestStatus)> {
    plan.packages
        .iter()
        .find(|p| p.package.name == package)
        .unwrap()
        .tests
        .iter()
        .map(|t| (t.entry.file.clone(), t.outcome.status))
        .collect()
}

#[tokio::test]
async fn test_pass_and_fail_are_classified_by_exit_status() {
    let ws = Workspace::new();
    ws.demo_package();
    let ctx = context(ws.run_options());

    let plan = run_all(&ctx).await;

    assert_eq!(
        statuses(&plan, "demo"),
        vec![
            ("test_basic.py".to_string(), TestStatus::Pass),
            ("test_broken.py".to_string(), TestStatus::Fail),
        ]
    );

    let report = build_report(&ctx, &plan);
    assert_eq!(report.test_suites.len(), 1);
    let suite = &report.test_suites[0];
    assert_eq!(suite.name, "demo");
    assert_eq!(suite.properties.package_version, "1.2.3");

    let cases = &suite.test_cases;
    assert_eq!(cases.len(), 2);
    assert_eq!(cases[0].status, CaseStatus::Pass);
    assert_eq!(cases[0].file, "demo/test_basic.py");
    assert_eq!(cases[0].log.as_deref(), Some("demo/test_basic.py.log"));
    assert_eq!(cases[1].status, CaseStatus::Fail);
    assert_eq!(
        cases[1].failure.as_ref().and_then(|f| f.message.as_deref()),
        Some("test_broken.py failed")
    );
    assert!(report.has_failures());

    let log = fs::read_to_string(ctx.log_dir.join("demo/test_basic.py.log")).unwrap();
    assert!(log.contains("basic ran"));
}

#[tokio::test]
async fn test_excluded_tests_are_reported_as_skipped() {
    let ws = Workspace::new();
    ws.demo_package();
    let ctx = context(RunOptions {
        excludes: vec!["demo/test_broken*".to_string()],
        ..ws.run_options()
    });

    let plan = run_all(&ctx).await;
    assert_eq!(
        statuses(&plan, "demo"),
        vec![
            ("test_basic.py".to_string(), TestStatus::Pass),
            ("test_broken.py".to_string(), TestStatus::Excluded),
        ]
    );

    let report = build_report(&ctx, &plan);
    let broken = &report.test_suites[0].test_cases[1];
    assert_eq!(broken.status, CaseStatus::Skipped);
    assert_eq!(
        broken.skipped.as_ref().and_then(|s| s.message.as_deref()),
        Some("test_broken.py excluded")
    );
    assert!(broken.log.is_none());
    assert!(!report.has_failures());
}

#[tokio::test]
async fn test_skip_rule_suppresses_execution() {
    let ws = Workspace::new();
    ws.demo_package();
    ws.write(
        "demo",
        "skip.toml",
        r#"
[[skip]]
files = "test_basic.py"
check = "not is_windows"
reason = "only runs off Windows"
"#,
    );
    let ctx = context(ws.run_options());

    let plan = run_all(&ctx).await;
    let basic = &plan.packages[0].tests[0];
    assert_eq!(basic.outcome.status, TestStatus::Skipped);
    assert_eq!(basic.outcome.message.as_deref(), Some("only runs off Windows"));
    assert!(!ctx.log_dir.join("demo/test_basic.py.log").exists());

    let report = build_report(&ctx, &plan);
    let case = &report.test_suites[0].test_cases[0];
    assert_eq!(case.status, CaseStatus::Skipped);
    assert_eq!(
        case.skipped.as_ref().and_then(|s| s.message.as_deref()),
        Some("only runs off Windows")
    );
}

#[tokio::test]
async fn test_unknown_predicate_aborts_only_that_package() {
    let ws = Workspace::new();
    ws.demo_package();
    ws.write("bad", "test_a.sh", "exit 0\n");
    ws.write("bad", "skip.toml", "[[skip]]\nfiles = \"*\"\ncheck = \"is_amiga\"\n");
    let ctx = context(ws.run_options());

    let plan = run_all(&ctx).await;
    assert_eq!(
        statuses(&plan, "bad"),
        vec![("test_a.sh".to_string(), TestStatus::Error)]
    );
    assert!(!ctx.log_dir.join("bad").exists());
    assert_eq!(statuses(&plan, "demo")[0].1, TestStatus::Pass);

    let message = plan.packages[0].tests[0].outcome.message.clone().unwrap();
    assert!(message.contains("is_amiga"), "{message}");
}

#[tokio::test]
async fn test_package_without_runnable_tests_is_not_copied() {
    let ws = Workspace::new();
    ws.demo_package();
    let ctx = context(RunOptions {
        excludes: vec!["demo/".to_string()],
        ..ws.run_options()
    });

    let plan = run_all(&ctx).await;
    assert!(!ctx.log_dir.join("demo").exists());

    let report = build_report(&ctx, &plan);
    let suite = &report.test_suites[0];
    assert_eq!(suite.test_cases.len(), 2);
    assert!(suite
        .test_cases
        .iter()
        .all(|c| c.status == CaseStatus::Skipped));
}

#[tokio::test]
async fn test_every_entry_is_reported_exactly_once() {
    let ws = Workspace::new();
    ws.demo_package();
    ws.write("other", "test_a.sh", "exit 0\n");
    ws.write("other", "post_b.sh", "exit 0\n");
    ws.write("other", "skip.toml", "[[skip]]\nfiles = \"post_*\"\ncheck = \"is_linux\"\n");
    let ctx = context(RunOptions {
        excludes: vec!["demo/test_basic".to_string()],
        ..ws.run_options()
    });

    let plan = run_all(&ctx).await;
    let report = build_report(&ctx, &plan);

    let mut reported: Vec<String> = report
        .test_suites
        .iter()
        .flat_map(|s| s.test_cases.iter().map(|c| c.file.clone()))
        .collect();
    reported.sort();
    assert_eq!(
        reported,
        vec![
            "demo/test_basic.py",
            "demo/test_broken.py",
            "other/post_b.sh",
            "other/test_a.sh"
        ]
    );
    assert!(plan
        .packages
        .iter()
        .flat_map(|p| &p.tests)
        .all(|t| t.outcome.status.is_settled()));
}

#[tokio::test]
async fn test_shell_tests_are_traced_and_stop_at_first_failure() {
    let ws = Workspace::new();
    ws.write("sh", "test_trace.sh", "echo first\nfalse\necho never\n");
    let ctx = context(ws.run_options());

    let plan = run_all(&ctx).await;
    assert_eq!(plan.packages[0].tests[0].outcome.status, TestStatus::Fail);

    let log = fs::read_to_string(ctx.log_dir.join("sh/test_trace.sh.log")).unwrap();
    assert!(log.lines().any(|l| l.starts_with("Bash-") && l.ends_with("> echo first")), "{log}");
    assert!(!log.lines().any(|l| l.starts_with("+ ")), "{log}");
    assert!(log.lines().any(|l| l == "first"));
    assert!(!log.lines().any(|l| l == "never"), "{log}");
}

#[tokio::test]
async fn test_environment_is_injected_and_cwd_is_out_dir() {
    let ws = Workspace::new();
    ws.write("envpkg", "VERSION", "0.9\n");
    ws.write(
        "envpkg",
        "test_env.sh",
        "echo \"$TESTR_PACKAGE $TESTR_PACKAGE_VERSION $TESTR_FILE $TESTR_INTERPRETER\" > env.txt\npwd > cwd.txt\n",
    );
    let ctx = context(ws.run_options());

    run_all(&ctx).await;
    let out_dir = ctx.log_dir.join("envpkg");
    assert_eq!(
        fs::read_to_string(out_dir.join("env.txt")).unwrap().trim(),
        "envpkg 0.9 test_env.sh bash"
    );
    assert_eq!(
        fs::canonicalize(fs::read_to_string(out_dir.join("cwd.txt")).unwrap().trim()).unwrap(),
        fs::canonicalize(&out_dir).unwrap()
    );
}

#[tokio::test]
async fn test_direct_executables_and_spawn_errors() {
    let ws = Workspace::new();
    ws.write_executable("exe", "test_run", "#!/bin/sh\necho exe ran\n");
    ws.write("exe", "test_noperm", "#!/bin/sh\necho nope\n");
    let ctx = context(ws.run_options());

    let plan = run_all(&ctx).await;
    let tests = &plan.packages[0].tests;
    let noperm = tests.iter().find(|t| t.entry.file == "test_noperm").unwrap();
    let run = tests.iter().find(|t| t.entry.file == "test_run").unwrap();

    assert_eq!(run.outcome.status, TestStatus::Pass);
    assert_eq!(noperm.outcome.status, TestStatus::Error);
    assert!(
        noperm
            .outcome
            .message
            .as_deref()
            .unwrap()
            .contains("could not be run")
    );
}

#[tokio::test]
async fn test_missing_interpreter_is_an_error() {
    let ws = Workspace::new();
    ws.demo_package();
    let ctx = context(ws.run_options());
    let settings = ExecutorSettings {
        python: "testr-no-such-python-interpreter".to_string(),
        ..settings()
    };

    let plan = run_with(&ctx, settings, CancellationToken::new())
        .await
        .unwrap();
    assert!(plan.packages[0]
        .tests
        .iter()
        .all(|t| t.outcome.status == TestStatus::Error));
}

#[tokio::test]
async fn test_timeout_kills_the_test() {
    let ws = Workspace::new();
    ws.write("slow", "test_sleep.sh", "sleep 30\n");
    let ctx = context(ws.run_options());
    let settings = ExecutorSettings {
        timeout: Some(Duration::from_secs(1)),
        ..settings()
    };

    let plan = tokio::time::timeout(
        Duration::from_secs(20),
        run_with(&ctx, settings, CancellationToken::new()),
    )
    .await
    .expect("executor did not honour the timeout")
    .unwrap();

    let outcome = &plan.packages[0].tests[0].outcome;
    assert_eq!(outcome.status, TestStatus::Error);
    assert_eq!(
        outcome.message.as_deref(),
        Some("test_sleep.sh timed out after 1 s")
    );
}

#[tokio::test]
async fn test_background_job_holding_output_is_bound_by_timeout() {
    let ws = Workspace::new();
    ws.write("bg", "test_background.sh", "echo started\nsleep 8 &\n");
    let ctx = context(ws.run_options());
    let settings = ExecutorSettings {
        timeout: Some(Duration::from_secs(1)),
        ..settings()
    };

    let started = std::time::Instant::now();
    let plan = tokio::time::timeout(
        Duration::from_secs(6),
        run_with(&ctx, settings, CancellationToken::new()),
    )
    .await
    .expect("executor waited on the background job")
    .unwrap();
    assert!(started.elapsed() < Duration::from_secs(6));

    let outcome = &plan.packages[0].tests[0].outcome;
    assert_eq!(outcome.status, TestStatus::Error);
    assert_eq!(
        outcome.message.as_deref(),
        Some("test_background.sh timed out after 1 s")
    );
    let log = fs::read_to_string(ctx.log_dir.join("bg/test_background.sh.log")).unwrap();
    assert!(log.lines().any(|l| l == "started"), "{log}");
}

#[tokio::test]
async fn test_cancelled_run_skips_remaining_tests() {
    let ws = Workspace::new();
    ws.demo_package();
    let ctx = context(ws.run_options());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let plan = run_with(&ctx, settings(), cancel).await.unwrap();
    for test in &plan.packages[0].tests {
        assert_eq!(test.outcome.status, TestStatus::Skipped);
        assert_eq!(test.outcome.message.as_deref(), Some("run cancelled"));
    }
}

#[tokio::test]
async fn test_existing_output_dir_requires_overwrite() {
    let ws = Workspace::new();
    ws.demo_package();
    let ctx = context(ws.run_options());
    fs::create_dir_all(ctx.log_dir.join("demo")).unwrap();
    fs::write(ctx.log_dir.join("demo/stale.txt"), "old").unwrap();

    let err = run_with(&ctx, settings(), CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("already exists"), "{err:#}");

    let settings = ExecutorSettings {
        overwrite: true,
        ..settings()
    };
    run_with(&ctx, settings, CancellationToken::new())
        .await
        .unwrap();
    assert!(!ctx.log_dir.join("demo/stale.txt").exists());
}

#[tokio::test]
async fn test_sub_reports_are_merged() {
    let ws = Workspace::new();
    ws.write(
        "sub",
        "test_cases.sh",
        r#"cat > "$TESTR_OUT_DIR/$TESTR_FILE.json" <<'JSON'
{"test_cases": [
  {"name": "case_one", "status": "pass"},
  {"name": "case_two", "status": "skipped", "skipped": {"message": "not today"}}
]}
JSON
"#,
    );
    ws.write(
        "sub",
        "test_hidden.sh",
        r#"echo '{"test_cases": [{"name": "looks_fine", "status": "pass"}]}' > "$TESTR_OUT_DIR/$TESTR_FILE.json"
exit 3
"#,
    );
    ws.write(
        "sub",
        "test_garbled.sh",
        "echo 'not json' > \"$TESTR_OUT_DIR/$TESTR_FILE.json\"\n",
    );
    let ctx = context(ws.run_options());

    let plan = run_all(&ctx).await;
    let report = build_report(&ctx, &plan);
    let cases = &report.test_suites[0].test_cases;
    let names: Vec<(&str, &str, CaseStatus)> = cases
        .iter()
        .map(|c| (c.name.as_str(), c.file.as_str(), c.status))
        .collect();

    assert_eq!(
        names,
        vec![
            ("case_one", "sub/test_cases.sh", CaseStatus::Pass),
            ("case_two", "sub/test_cases.sh", CaseStatus::Skipped),
            ("test_garbled.sh", "sub/test_garbled.sh", CaseStatus::Pass),
            ("looks_fine", "sub/test_hidden.sh", CaseStatus::Pass),
            ("test_hidden.sh", "sub/test_hidden.sh", CaseStatus::Fail),
        ]
    );
}

#[tokio::test]
async fn test_include_stdout_embeds_logs() {
    let ws = Workspace::new();
    ws.demo_package();
    let ctx = context(RunOptions {
        include_stdout: true,
        ..ws.run_options()
    });

    let plan = run_all(&ctx).await;
    let report = build_report(&ctx, &plan);
    let stdout = report.test_suites[0].test_cases[0].stdout.clone().unwrap();
    assert!(stdout.contains("basic ran"));
}

#[tokio::test]
async fn test_collect_only_reports_without_running() {
    let ws = Workspace::new();
    ws.demo_package();
    let ctx = context(RunOptions {
        collect_only: true,
        ..ws.run_options()
    });

    let plan = discover(&ctx).unwrap();
    let report = build_report(&ctx, &plan);
    let cases = &report.test_suites[0].test_cases;
    assert_eq!(cases.len(), 2);
    assert_eq!(cases[0].status, CaseStatus::Skipped);
    assert_eq!(
        cases[0].skipped.as_ref().and_then(|s| s.message.as_deref()),
        Some("test_basic.py not run (collect-only)")
    );
    assert!(report.run_info.t_start.is_none());
    assert!(!ctx.log_dir.join("demo").exists());
}

#[tokio::test]
async fn test_report_metadata_and_serialization() {
    let ws = Workspace::new();
    ws.demo_package();
    ws.write("other", "VERSION", "2.0\n");
    ws.write("other", "test_a.sh", "exit 0\n");
    let ctx = context(RunOptions {
        argv: vec![
            "testr".to_string(),
            "run".to_string(),
            "--include".to_string(),
            "demo/ other/".to_string(),
        ],
        ..ws.run_options()
    });

    let plan = run_all(&ctx).await;
    let report = build_report(&ctx, &plan);
    let info = &report.run_info;

    assert_eq!(shlex::split(&info.command_line), Some(info.argv.clone()));
    assert_eq!(info.package_versions["demo"], "1.2.3");
    assert_eq!(info.package_versions["other"], "2.0");
    assert_eq!(info.hostname, vec![ctx.host.hostname.clone()]);
    let (start, stop) = (info.t_start.unwrap(), info.t_stop.unwrap());
    assert!(start <= stop);
    for suite in &report.test_suites {
        assert!(suite.properties.t_start.unwrap() >= start);
        assert!(suite.properties.t_stop.unwrap() <= stop);
    }

    report.write_json(&ctx.report_path()).unwrap();
    let parsed = Report::read_json(&ctx.report_path()).unwrap();
    assert_eq!(parsed, report);

    let raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(ctx.report_path()).unwrap()).unwrap();
    assert_eq!(raw["test_suites"][0]["test_cases"][1]["status"], "fail");
    assert_eq!(raw["test_suites"][0]["properties"]["package"], "demo");
    assert!(raw["test_suites"][0]["properties"]["hostname"].is_string());

    let html = render_html(&report).into_string();
    assert!(html.contains("test_broken.py"));
    assert!(html.contains("<!DOCTYPE html>"));
}
