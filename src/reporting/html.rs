//! # HTML Reporting Module / HTML 报告模块
//!
//! This module renders a [`Report`] as a single self-contained HTML page:
//! summary counts followed by one results table per suite, with failure,
//! error and skip messages shown inline.
//!
//! 此模块将 [`Report`] 渲染为单个自包含的 HTML 页面：
//! 先是汇总计数，然后是每个测试套件的结果表格，失败、错误和跳过信息内联显示。

use anyhow::{Context, Result};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::fs;
use std::path::Path;

use crate::infra::t;
use crate::reporting::report::{CaseStatus, Report, TestCase};

/// Embedded CSS styles for HTML reports / HTML 报告的嵌入式 CSS 样式
const HTML_STYLE: &str = r#"
body { font-family: -apple-system, "Segoe UI", Helvetica, Arial, sans-serif; margin: 2em; color: #24292e; }
h1 { border-bottom: 1px solid #e1e4e8; padding-bottom: .3em; }
.run-info { color: #586069; font-size: .9em; }
.summary-container { display: flex; gap: 1.5em; margin: 1.5em 0; }
.summary-item { display: flex; flex-direction: column; align-items: center; padding: .8em 1.2em; border: 1px solid #e1e4e8; border-radius: 6px; }
.summary-item .count { font-size: 1.8em; font-weight: 600; }
.summary-item .label { color: #586069; }
table { border-collapse: collapse; width: 100%; margin-bottom: 2em; }
th, td { border: 1px solid #e1e4e8; padding: .4em .8em; text-align: left; vertical-align: top; }
th { background: #f6f8fa; }
.pass { color: #22863a; }
.fail, .error { color: #cb2431; font-weight: 600; }
.skipped { color: #b08800; }
pre { margin: 0; white-space: pre-wrap; font-size: .85em; }
"#;

fn status_class(status: CaseStatus) -> &'static str {
    match status {
        CaseStatus::Pass => "pass",
        CaseStatus::Fail => "fail",
        CaseStatus::Skipped => "skipped",
        CaseStatus::Error => "error",
    }
}

/// Text shown in the details column of a case.
fn case_details(case: &TestCase) -> String {
    [&case.failure, &case.error, &case.skipped]
        .into_iter()
        .flatten()
        .flat_map(|d| [d.message.as_deref(), d.output.as_deref()])
        .flatten()
        .collect::<Vec<_>>()
        .join("\n")
}

fn summary_item(count: usize, label: &str, class: &str) -> Markup {
    html! {
        div class="summary-item" {
            span class={ "count " (class) } { (count) }
            span class="label" { (label) }
        }
    }
}

/// Renders the report page.
/// 渲染报告页面。
pub fn render_html(report: &Report) -> Markup {
    let counts = report.counts();
    let info = &report.run_info;

    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { (t!("html_report.title")) }
                style { (PreEscaped(HTML_STYLE)) }
            }
            body {
                h1 { (t!("html_report.main_header")) }
                div class="run-info" {
                    p { (t!("html_report.run_date")) ": " (info.date.format("%Y-%m-%d %H:%M:%S").to_string()) }
                    p { (t!("html_report.command_line")) ": " code { (info.command_line) } }
                    p { (t!("html_report.host")) ": " (info.hostname.join(", ")) " (" (info.platform.join(", ")) ")" }
                }
                div class="summary-container" {
                    (summary_item(counts.total, &t!("html_report.summary.total"), ""))
                    (summary_item(counts.passed, &t!("html_report.summary.passed"), "pass"))
                    (summary_item(counts.failed, &t!("html_report.summary.failed"), "fail"))
                    (summary_item(counts.errors, &t!("html_report.summary.errors"), "error"))
                    (summary_item(counts.skipped, &t!("html_report.summary.skipped"), "skipped"))
                }
                @for suite in &report.test_suites {
                    h2 { (suite.name) " " small { "(" (suite.properties.package_version) ")" } }
                    table {
                        thead {
                            tr {
                                th { (t!("html_report.table.name")) }
                                th { (t!("html_report.table.file")) }
                                th { (t!("html_report.table.status")) }
                                th { (t!("html_report.table.details")) }
                            }
                        }
                        tbody {
                            @for case in &suite.test_cases {
                                tr {
                                    td { (case.name) }
                                    td {
                                        @if let Some(log) = &case.log {
                                            a href=(log) { (case.file) }
                                        } @else {
                                            (case.file)
                                        }
                                    }
                                    td class=(status_class(case.status)) { (status_class(case.status)) }
                                    td { pre { (case_details(case)) } }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Writes the HTML rendering of `report` to `output_path`.
///
/// # Errors / 错误
/// Returns an error if the file cannot be written.
/// 如果无法写入文件则返回错误。
pub fn write_html_report(report: &Report, output_path: &Path) -> Result<()> {
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(output_path, render_html(report).into_string())
        .with_context(|| format!("Failed to write HTML report: {}", output_path.display()))?;
    Ok(())
}
