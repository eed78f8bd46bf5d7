//! # Reporting Module / 报告模块
//!
//! This module aggregates test outcomes into the structured JSON report and
//! displays results: boxed console summaries and an optional HTML page.
//!
//! 此模块将测试结果汇总为结构化的 JSON 报告并展示结果：
//! 控制台方框摘要以及可选的 HTML 页面。

pub mod console;
pub mod html;
pub mod report;

// Re-export common reporting functions
pub use console::{box_output, print_results_table};
pub use html::write_html_report;
pub use report::{Report, build_report};
