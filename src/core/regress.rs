//! # Regression Capture Module / 回归捕获模块
//!
//! Snapshots selected output files of a test run into the regression archive,
//! normalizing run-specific noise (timestamps, paths) with per-file clean
//! rules. Relative paths are preserved between the output directory and the
//! archive, so the archive can be diffed against a baseline.
//!
//! 将测试运行的选定输出文件快照到回归归档中，并使用每个文件的清理规则
//! 规范化与运行相关的噪声（时间戳、路径）。输出目录与归档之间保留相对路径，
//! 因此归档可以与基线进行比较。
//!
//! ```toml
//! files = ["test_unit.py.log", "plots/*.png"]
//!
//! [clean]
//! "test_unit.py.log" = [['^Run at .*', ''], ['^Bash-\d\d:\d\d:\d\d', 'Bash-HH:MM:SS']]
//! ```

use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::{Result, TestrError};
use crate::infra::fs::expand_glob;

/// Conventional name of a package's regression spec file.
pub const REGRESS_FILE: &str = "regress.toml";

/// Lines matching this are always ignored by [`check_files`].
pub const DEFAULT_ALLOW: &str = r"^Bash-\d\d";

/// Which files to capture and how to clean them.
/// 要捕获哪些文件以及如何清理它们。
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RegressionSpec {
    /// Relative paths or globs below the output directory.
    #[serde(default)]
    pub files: Vec<String>,
    /// File name -> ordered `(pattern, replacement)` pairs.
    #[serde(default)]
    pub clean: BTreeMap<String, Vec<(String, String)>>,
}

impl RegressionSpec {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| TestrError::io(path, e))?;
        Self::parse(&content, path)
    }

    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|source| TestrError::InvalidRegressSpec {
            path: path.to_path_buf(),
            source,
        })
    }
}

struct CleanRule {
    pattern: Regex,
    replacement: String,
}

fn compile_rules(rules: &[(String, String)]) -> Result<Vec<CleanRule>> {
    rules
        .iter()
        .map(|(pattern, replacement)| {
            Ok(CleanRule {
                pattern: Regex::new(pattern).map_err(|source| TestrError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })?,
                replacement: replacement.clone(),
            })
        })
        .collect()
}

/// Applies every rule, in order, to each line of `text`. The line terminator
/// is set aside while the rules run, so `$` anchors at the end of the line.
fn clean_text(text: &str, rules: &[CleanRule]) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        let body = line
            .strip_suffix("\r\n")
            .or_else(|| line.strip_suffix('\n'))
            .unwrap_or(line);
        let mut cleaned = body.to_string();
        for rule in rules {
            cleaned = rule
                .pattern
                .replace_all(&cleaned, rule.replacement.as_str())
                .into_owned();
        }
        out.push_str(&cleaned);
        out.push_str(&line[body.len()..]);
    }
    out
}

/// Copies regression files from an output directory into the archive.
/// 将回归文件从输出目录复制到归档中。
#[derive(Debug, Clone)]
pub struct RegressionCapturer {
    out_dir: PathBuf,
    regress_dir: PathBuf,
}

impl RegressionCapturer {
    pub fn new(out_dir: impl Into<PathBuf>, regress_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            regress_dir: regress_dir.into(),
        }
    }

    /// Captures every file named by `spec`, returning the written archive
    /// paths in order.
    ///
    /// Each source is written to the same relative path below the regression
    /// directory, overwriting any previous copy. Files with clean rules
    /// registered under their relative path must be UTF-8 text and are
    /// cleaned line by line; other files are copied byte for byte. The
    /// regression directory exists afterwards even when nothing was captured.
    ///
    /// 捕获 `spec` 指定的每个文件，并按顺序返回写入的归档路径。
    /// 每个源文件写入回归目录下相同的相对路径，覆盖之前的副本。
    /// 注册了清理规则的文件必须是 UTF-8 文本并逐行清理；其他文件按字节原样复制。
    pub fn capture(&self, spec: &RegressionSpec) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.regress_dir).map_err(|e| TestrError::io(&self.regress_dir, e))?;
        let mut written = Vec::new();
        for pattern in &spec.files {
            for rel in expand_glob(&self.out_dir, pattern)? {
                let rules = compile_rules(spec.clean.get(&rel).map(Vec::as_slice).unwrap_or(&[]))?;
                written.push(self.capture_file(&rel, &rules)?);
            }
        }
        Ok(written)
    }

    fn capture_file(&self, rel: &str, rules: &[CleanRule]) -> Result<PathBuf> {
        let source = self.out_dir.join(rel);
        if !source.is_file() {
            return Err(TestrError::RegressSourceMissing(source));
        }
        let bytes = fs::read(&source).map_err(|e| TestrError::io(&source, e))?;
        let contents = if rules.is_empty() {
            bytes
        } else {
            let text = String::from_utf8(bytes)
                .map_err(|_| TestrError::RegressSourceNotText(source.clone()))?;
            clean_text(&text, rules).into_bytes()
        };

        let dest = self.regress_dir.join(rel);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| TestrError::io(parent, e))?;
        }
        fs::write(&dest, contents).map_err(|e| TestrError::io(&dest, e))?;
        tracing::debug!(from = %source.display(), to = %dest.display(), "captured regression file");
        Ok(dest)
    }
}

fn case_insensitive(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| TestrError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}

/// Scans the files matched by `glob` below `out_dir` for forbidden lines.
///
/// A line is reported once per `checks` pattern it matches, unless it matches
/// an `allows` pattern or [`DEFAULT_ALLOW`]. Matching is case-insensitive.
/// Returns [`TestrError::CheckFilesMatched`] listing every reported line.
///
/// 在 `out_dir` 下扫描由 `glob` 匹配的文件以查找禁止的行。
/// 一行对其匹配的每个 `checks` 模式各报告一次，除非它匹配 `allows` 模式或
/// [`DEFAULT_ALLOW`]。匹配不区分大小写。
pub fn check_files(out_dir: &Path, glob: &str, checks: &[String], allows: &[String]) -> Result<()> {
    let checks = checks
        .iter()
        .map(|c| Ok((c.as_str(), case_insensitive(c)?)))
        .collect::<Result<Vec<_>>>()?;
    let allows = allows
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(DEFAULT_ALLOW))
        .map(case_insensitive)
        .collect::<Result<Vec<_>>>()?;

    let mut matches = Vec::new();
    for rel in expand_glob(out_dir, glob)? {
        let path = out_dir.join(&rel);
        let bytes = fs::read(&path).map_err(|e| TestrError::io(&path, e))?;
        let text = String::from_utf8_lossy(&bytes);
        for (index, line) in text.lines().enumerate() {
            if allows.iter().any(|a| a.is_match(line)) {
                continue;
            }
            for (check, _) in checks.iter().filter(|(_, re)| re.is_match(line)) {
                matches.push(format!("'{}' matched at {}:{} :: {}", check, rel, index + 1, line));
            }
        }
    }

    if matches.is_empty() {
        Ok(())
    } else {
        Err(TestrError::CheckFilesMatched(matches))
    }
}

