//! # Config Module Unit Tests / Config 模块单元测试
//!
//! Tests for test-spec parsing, run id generation and run context resolution.
//!
//! 测试测试规格文件解析、运行 ID 生成以及运行上下文解析。

mod common;

use chrono::{Local, TimeZone};
use common::Workspace;
use std::fs;
use std::path::PathBuf;
use testr::core::config::{RunContext, RunOptions, TestSpec, make_run_id};
use testr::core::error::TestrError;
use testr::infra::host::{HostInfo, system_name};

fn host() -> HostInfo {
    HostInfo {
        system: "Linux".to_string(),
        architecture: "x86_64".to_string(),
        hostname: "build-host".to_string(),
        platform: "Linux-6.1-x86_64".to_string(),
    }
}

#[cfg(test)]
mod test_spec_tests {
    use super::*;

    #[test]
    fn test_parse_includes_excludes_and_comments() {
        let spec = TestSpec::parse("# nightly\n\ndemo/\n-demo/test_broken\n  other/test_a  \n");
        assert_eq!(spec.includes, vec!["demo/", "other/test_a"]);
        assert_eq!(spec.excludes, vec!["demo/test_broken"]);
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(TestSpec::parse(""), TestSpec::default());
    }
}

#[cfg(test)]
mod run_id_tests {
    use super::*;

    #[test]
    fn test_run_id_has_no_colons() {
        let started = Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        let id = make_run_id(&host(), started);
        assert_eq!(
            id,
            format!("Linux_2024-03-05T14-07-09_{}_build-host", env!("CARGO_PKG_VERSION"))
        );
        assert!(!id.contains(':'));
    }

    #[test]
    fn test_system_name_mapping() {
        assert_eq!(system_name("linux"), "Linux");
        assert_eq!(system_name("macos"), "Darwin");
        assert_eq!(system_name("windows"), "Windows");
        assert_eq!(system_name("freebsd"), "freebsd");
    }

    #[test]
    fn test_detected_host_is_populated() {
        let host = HostInfo::detect();
        assert!(!host.system.is_empty());
        assert!(!host.architecture.is_empty());
        assert!(!host.hostname.is_empty());
    }
}

#[cfg(test)]
mod run_context_tests {
    use super::*;

    #[test]
    fn test_layout_is_resolved_once() {
        let ws = Workspace::new();
        let started = Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        let ctx = RunContext::resolve_at(ws.run_options(), host(), started).unwrap();

        assert!(ctx.log_dir.is_absolute());
        assert_eq!(ctx.packages_dir, ctx.root.join("packages"));
        assert_eq!(ctx.log_dir, ctx.outputs_dir.join("logs").join(&ctx.run_id));
        assert_eq!(ctx.regress_dir, ctx.outputs_dir.join("regress").join(&ctx.run_id));
        assert_eq!(ctx.report_path(), ctx.log_dir.join("all_tests.json"));
        assert_eq!(ctx.includes, vec!["*"]);
        assert!(ctx.test_spec.is_none());
    }

    #[test]
    fn test_test_spec_relative_to_root() {
        let ws = Workspace::new();
        fs::write(ws.root().join("nightly.txt"), "demo/\n-demo/test_broken\n").unwrap();

        let options = RunOptions {
            test_spec: Some(PathBuf::from("nightly.txt")),
            includes: vec!["other/".to_string()],
            ..ws.run_options()
        };
        let ctx = RunContext::resolve(options, host()).unwrap();

        assert_eq!(ctx.includes, vec!["other/", "demo/"]);
        assert_eq!(ctx.excludes, vec!["demo/test_broken"]);
        assert!(ctx.regress_dir.ends_with("nightly.txt"));
        assert!(ctx.filter.is_included("demo", "test_basic.py"));
        assert!(!ctx.filter.is_included("demo", "test_broken.py"));
        assert!(!ctx.filter.is_included("third", "test_basic.py"));
    }

    #[test]
    fn test_missing_test_spec_is_an_error() {
        let ws = Workspace::new();
        let options = RunOptions {
            test_spec: Some(PathBuf::from("does-not-exist.txt")),
            ..ws.run_options()
        };
        let err = RunContext::resolve(options, host()).unwrap_err();
        assert!(matches!(err, TestrError::TestSpecMissing(_)));
    }
}
