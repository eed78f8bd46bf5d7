//! # Console Reporting Module / 控制台报告模块
//!
//! This module prints the boxed per-package summaries shown while a run
//! progresses and the final results table.
//!
//! 此模块打印运行过程中显示的每包方框摘要，以及最终的结果表格。

use colored::*;

use crate::core::models::{PackagePlan, TestPlan, TestStatus};
use crate::infra::{logging::console, t};
use crate::reporting::report::{CaseStatus, Report};

/// Formats `lines` inside a `*` box at least `min_width` characters wide.
///
/// ```text
/// ****************************************
/// *** package demo                     ***
/// ****************************************
/// ```
pub fn format_box(lines: &[String], min_width: usize) -> Vec<String> {
    let longest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let width = min_width.max(8 + longest);
    let border = "*".repeat(width);

    let mut out = Vec::with_capacity(lines.len() + 2);
    out.push(border.clone());
    for line in lines {
        out.push(format!("*** {:<inner$} ***", line, inner = width - 8));
    }
    out.push(border);
    out
}

/// Prints `lines` inside a `*` box followed by a blank line.
/// 在 `*` 方框中打印 `lines`，后跟一个空行。
pub fn box_output(lines: &[String], min_width: usize) {
    for line in format_box(lines, min_width) {
        console(line.cyan());
    }
    console("");
}

/// Prints the boxed summary of one package after all its tests completed.
/// 在一个包的所有测试完成后打印其方框摘要。
pub fn print_package_summary(plan: &PackagePlan) {
    let mut lines = vec![t!("summary.package_title", name = &plan.package.name).to_string()];
    lines.extend(
        plan.tests
            .iter()
            .map(|test| format!("{:<20} {}", test.entry.file, test.outcome.status)),
    );
    box_output(&lines, 40);
}

/// Prints the final `Package | Script | Status` table over every test of
/// the run, then the overall verdict taken from `report`, so failing cases of
/// a sub-report count even when their test exited with 0.
///
/// 打印覆盖本次运行所有测试的最终 `Package | Script | Status` 表格，
/// 然后打印取自 `report` 的总体结论。
pub fn print_results_table(plan: &TestPlan, report: &Report) {
    let rows: Vec<(&str, &str, TestStatus)> = plan
        .packages
        .iter()
        .flat_map(|p| {
            p.tests
                .iter()
                .map(move |t| (p.package.name.as_str(), t.entry.file.as_str(), t.outcome.status))
        })
        .collect();

    if rows.is_empty() {
        console(t!("summary.no_tests").yellow());
        return;
    }

    let header = (
        t!("summary.header_package").to_string(),
        t!("summary.header_script").to_string(),
        t!("summary.header_status").to_string(),
    );
    let pkg_width = rows
        .iter()
        .map(|r| r.0.chars().count())
        .chain(std::iter::once(header.0.chars().count()))
        .max()
        .unwrap_or(0);
    let file_width = rows
        .iter()
        .map(|r| r.1.chars().count())
        .chain(std::iter::once(header.1.chars().count()))
        .max()
        .unwrap_or(0);

    let mut lines = vec![
        format!("{:<pkg_width$} {:<file_width$} {}", header.0, header.1, header.2),
        format!(
            "{} {} {}",
            "-".repeat(pkg_width),
            "-".repeat(file_width),
            "-".repeat(header.2.chars().count().max(7))
        ),
    ];
    lines.extend(
        rows.iter()
            .map(|(pkg, file, status)| format!("{pkg:<pkg_width$} {file:<file_width$} {status}")),
    );
    box_output(&lines, 40);

    let failures: Vec<_> = report
        .test_suites
        .iter()
        .flat_map(|suite| {
            suite
                .test_cases
                .iter()
                .filter(|c| c.status.is_failure())
                .map(move |c| (suite.name.as_str(), c))
        })
        .collect();
    if failures.is_empty() {
        console(t!("summary.overall_success").green().bold());
        return;
    }
    console(t!("summary.failed_tests").red().bold());
    for (suite, case) in failures {
        let status = match case.status {
            CaseStatus::Error => "ERROR",
            _ => "FAIL",
        };
        console(format!("  - {}/{} ({})", suite, case.name, status.red().bold()));
    }
    console(t!("summary.overall_failure").red().bold());
}
