//! # Skip Rule Module / 跳过规则模块
//!
//! Loads a package's `skip.toml` and decides, per test file, whether a
//! declarative environment check suppresses execution. Predicates come from a
//! closed registry and are resolved (name and arity) when the file is loaded,
//! so an unknown check is a configuration error before anything runs.
//!
//! 加载包的 `skip.toml`，并针对每个测试文件判断声明式环境检查是否会跳过执行。
//! 谓词来自一个封闭的注册表，并在加载文件时解析（名称和参数个数），
//! 因此未知的检查会在任何测试运行之前成为配置错误。
//!
//! ```toml
//! [[skip]]
//! files = "test_basic.py"
//! check = "not is_windows"
//! reason = "only runs off Windows"
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::fs;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::error::{Result, TestrError};
use crate::core::filter::glob_match;

/// Name of the per-package skip specification.
pub const SKIP_FILE: &str = "skip.toml";

static NEGATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^not\s+").expect("valid regex"));

const NETWORK_TIMEOUT: Duration = Duration::from_secs(2);
const DEFAULT_NETWORK_PROBE: &str = "8.8.8.8:53";

/// Registry of boolean environment checks usable in skip rules.
/// 可在跳过规则中使用的布尔环境检查注册表。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    IsWindows,
    IsMac,
    IsLinux,
    Is32Bit,
    /// All paths exist / 所有路径均存在
    HasPaths,
    /// All paths exist and are directories / 所有路径均存在且为目录
    HasDirs,
    /// All environment variables are set / 所有环境变量均已设置
    HasEnv,
    /// Every `host:port` accepts a TCP connection / 每个 `host:port` 都接受 TCP 连接
    HasNetwork,
}

impl Predicate {
    pub const ALL: [Predicate; 8] = [
        Predicate::IsWindows,
        Predicate::IsMac,
        Predicate::IsLinux,
        Predicate::Is32Bit,
        Predicate::HasPaths,
        Predicate::HasDirs,
        Predicate::HasEnv,
        Predicate::HasNetwork,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Predicate::IsWindows => "is_windows",
            Predicate::IsMac => "is_mac",
            Predicate::IsLinux => "is_linux",
            Predicate::Is32Bit => "is_32_bit",
            Predicate::HasPaths => "has_paths",
            Predicate::HasDirs => "has_dirs",
            Predicate::HasEnv => "has_env",
            Predicate::HasNetwork => "has_network",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Rejects argument lists the check cannot use.
    fn check_arity(&self, got: usize) -> Result<()> {
        let expected = match self {
            Predicate::IsWindows | Predicate::IsMac | Predicate::IsLinux | Predicate::Is32Bit
                if got != 0 =>
            {
                "takes no arguments"
            }
            Predicate::HasPaths | Predicate::HasDirs | Predicate::HasEnv if got == 0 => {
                "needs at least one argument"
            }
            _ => return Ok(()),
        };
        Err(TestrError::PredicateArity {
            name: self.name().to_string(),
            expected,
            got,
        })
    }

    pub fn evaluate(&self, args: &[String], ctx: &EvalContext) -> bool {
        match self {
            Predicate::IsWindows => ctx.os == "windows",
            Predicate::IsMac => ctx.os == "macos",
            Predicate::IsLinux => ctx.os == "linux",
            Predicate::Is32Bit => ctx.pointer_width <= 32,
            Predicate::HasPaths => args.iter().all(|p| expand(p).is_some_and(|p| p.exists())),
            Predicate::HasDirs => args.iter().all(|p| expand(p).is_some_and(|p| p.is_dir())),
            Predicate::HasEnv => args.iter().all(|var| env::var_os(var).is_some()),
            Predicate::HasNetwork => {
                if args.is_empty() {
                    can_connect(DEFAULT_NETWORK_PROBE)
                } else {
                    args.iter().all(|addr| can_connect(addr))
                }
            }
        }
    }
}

/// Expands `~` and `$VAR` / `${VAR}` in a path argument.
fn expand(path: &str) -> Option<PathBuf> {
    shellexpand::full(path)
        .ok()
        .map(|p| PathBuf::from(p.into_owned()))
}

fn can_connect(addr: &str) -> bool {
    let Ok(addrs) = addr.to_socket_addrs() else {
        return false;
    };
    addrs
        .into_iter()
        .any(|a| TcpStream::connect_timeout(&a, NETWORK_TIMEOUT).is_ok())
}

/// Facts the platform predicates are evaluated against.
/// 平台谓词所依据的事实。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalContext {
    pub os: String,
    pub pointer_width: u32,
}

impl EvalContext {
    /// The context of the running host.
    pub fn current() -> Self {
        Self {
            os: env::consts::OS.to_string(),
            pointer_width: usize::BITS,
        }
    }
}

impl Default for EvalContext {
    fn default() -> Self {
        Self::current()
    }
}

#[derive(Debug, Deserialize)]
struct RawSkipSpec {
    #[serde(default)]
    skip: Vec<RawSkipRule>,
}

#[derive(Debug, Deserialize)]
struct RawSkipRule {
    files: String,
    check: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    negate: bool,
    reason: Option<String>,
}

/// A resolved skip rule.
/// 已解析的跳过规则。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipRule {
    /// fnmatch glob against the test's file name.
    pub files: String,
    /// The check as written, e.g. `not is_windows`.
    pub check: String,
    pub predicate: Predicate,
    pub args: Vec<String>,
    pub negate: bool,
    pub reason: Option<String>,
}

impl SkipRule {
    fn resolve(raw: RawSkipRule, path: &Path) -> Result<Self> {
        let check = raw.check.trim().to_string();
        let prefixed = NEGATION.is_match(&check);
        let name = NEGATION.replace(&check, "").trim().to_string();

        let predicate = Predicate::from_name(&name).ok_or_else(|| TestrError::UnknownPredicate {
            name: name.clone(),
            path: path.to_path_buf(),
        })?;
        predicate.check_arity(raw.args.len())?;

        Ok(Self {
            files: raw.files,
            check,
            predicate,
            args: raw.args,
            negate: raw.negate || prefixed,
            reason: raw.reason,
        })
    }

    /// The reason reported when no explicit one is given: `check('a', 'b')`.
    pub fn default_reason(&self) -> String {
        let args = self
            .args
            .iter()
            .map(|a| format!("'{a}'"))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{}({})", self.check, args)
    }
}

/// Ordered skip rules of one package.
/// 一个包的有序跳过规则。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipSpec {
    pub rules: Vec<SkipRule>,
}

impl SkipSpec {
    /// Loads `<package_dir>/skip.toml`; a missing file means no rules.
    ///
    /// 加载 `<package_dir>/skip.toml`；文件不存在表示没有规则。
    pub fn load(package_dir: &Path) -> Result<Self> {
        let path = package_dir.join(SKIP_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path).map_err(|e| TestrError::io(&path, e))?;
        Self::parse(&content, &path)
    }

    /// Parses skip rules from TOML; `path` is only used in error messages.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let raw: RawSkipSpec = toml::from_str(content).map_err(|source| {
            TestrError::InvalidSkipSpec {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let rules = raw
            .skip
            .into_iter()
            .map(|rule| SkipRule::resolve(rule, path))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Returns the skip reason if `file` should be skipped.
    ///
    /// Only the first rule whose glob matches is evaluated.
    ///
    /// 如果应跳过 `file`，则返回跳过原因。只评估第一个通配符匹配的规则。
    pub fn check(&self, file: &str, ctx: &EvalContext) -> Option<String> {
        let rule = self.rules.iter().find(|r| glob_match(&r.files, file, false))?;
        let result = rule.predicate.evaluate(&rule.args, ctx);
        if result != rule.negate {
            Some(rule.reason.clone().unwrap_or_else(|| rule.default_reason()))
        } else {
            None
        }
    }
}
