//! # Error Types Module / 错误类型模块
//!
//! Typed errors raised by the orchestration core. Configuration errors abort the
//! run (or, for skip rules, the package); capture errors fail the capture step.
//! Command-level code wraps these in `anyhow` with extra context.
//!
//! 编排核心抛出的类型化错误。配置错误会中止运行（对于跳过规则，则中止该包）；
//! 捕获错误会使捕获步骤失败。命令层代码使用 `anyhow` 为其添加上下文。

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TestrError {
    #[error("packages root {0} does not exist or is not a directory")]
    PackagesRootMissing(PathBuf),

    #[error("test spec file {0} does not exist")]
    TestSpecMissing(PathBuf),

    #[error("output directory {0} already exists (pass --overwrite to replace it)")]
    OutputDirExists(PathBuf),

    #[error("unknown skip predicate '{name}' in {path}")]
    UnknownPredicate { name: String, path: PathBuf },

    #[error("skip predicate '{name}' {expected}, got {got} argument(s)")]
    PredicateArity {
        name: String,
        expected: &'static str,
        got: usize,
    },

    #[error("invalid skip spec {path}: {source}")]
    InvalidSkipSpec {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid regression spec {path}: {source}")]
    InvalidRegressSpec {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("{0} is not set; pass it explicitly or run under testr")]
    MissingEnv(&'static str),

    #[error("regression source file {0} does not exist")]
    RegressSourceMissing(PathBuf),

    #[error("regression file {0} is not UTF-8 text and cannot be cleaned")]
    RegressSourceNotText(PathBuf),

    #[error("pattern '{pattern}' matched no files under {root}")]
    NoGlobMatches { pattern: String, root: PathBuf },

    #[error("found matches in check_files:\n{}", .0.join("\n"))]
    CheckFilesMatched(Vec<String>),

    #[error("outcome for {0} was already recorded")]
    OutcomeAlreadySettled(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TestrError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TestrError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, TestrError>;
