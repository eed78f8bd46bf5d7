//! # Logging Module / 日志模块
//!
//! Installs the global `tracing` subscriber with two layers. Diagnostics go to
//! stderr so they never interleave with relayed test output on stdout. The
//! console transcript of a run (boxed summaries, skip and copy messages, the
//! results table) is mirrored into `<log dir>/test.log` while a [`RunLog`] is
//! open.
//!
//! 安装带有两个层的全局 `tracing` 订阅器。诊断信息输出到 stderr，
//! 因此不会与 stdout 上转发的测试输出交错。在 [`RunLog`] 打开期间，
//! 一次运行的控制台记录（方框摘要、跳过与复制消息、结果表格）会同步写入
//! `<log dir>/test.log`。

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Display;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use tracing::Level;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// File name of the run-level transcript inside the log directory.
pub const RUN_LOG_FILE: &str = "test.log";

/// Target of the events that carry console output.
const CONSOLE_TARGET: &str = "testr::console";

static RUN_LOG: Lazy<Mutex<Option<File>>> = Lazy::new(|| Mutex::new(None));

static ANSI_ESCAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1b\[[0-9;]*m").expect("valid regex"));

/// Initialises the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise the diagnostic level is `debug` with
/// `verbose` and `warn` without. Only the first call takes effect.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let mut env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    if let Ok(directive) = format!("{CONSOLE_TARGET}=off").parse() {
        env_filter = env_filter.add_directive(directive);
    }

    let diagnostics = fmt::layer()
        .with_target(false)
        .with_writer(io::stderr)
        .with_filter(env_filter);
    let transcript = fmt::layer()
        .with_ansi(false)
        .without_time()
        .with_level(false)
        .with_target(false)
        .with_writer(|| RunLogWriter)
        .with_filter(Targets::new().with_target(CONSOLE_TARGET, Level::INFO));

    tracing_subscriber::registry()
        .with(diagnostics)
        .with(transcript)
        .try_init()
        .ok();
}

/// Prints a line of user-facing output and records it in the open run log,
/// without color codes.
///
/// 打印一行面向用户的输出，并以去除颜色代码的形式记录到已打开的运行日志中。
pub fn console(message: impl Display) {
    let text = message.to_string();
    println!("{text}");
    tracing::info!(target: CONSOLE_TARGET, "{}", ANSI_ESCAPE.replace_all(&text, ""));
}

/// Keeps `<log dir>/test.log` open for the console transcript; closing
/// happens on drop.
///
/// 为控制台记录保持 `<log dir>/test.log` 打开；在 drop 时关闭。
#[derive(Debug)]
pub struct RunLog {
    _private: (),
}

impl RunLog {
    /// Opens (appending to) the transcript file in `log_dir`.
    pub fn open(log_dir: &Path) -> Result<Self> {
        let path = log_dir.join(RUN_LOG_FILE);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open run log: {}", path.display()))?;
        replace_run_log(Some(file));
        Ok(Self { _private: () })
    }
}

impl Drop for RunLog {
    fn drop(&mut self) {
        replace_run_log(None);
    }
}

fn replace_run_log(file: Option<File>) {
    let mut guard = RUN_LOG.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(mut old) = guard.take() {
        let _ = old.flush();
    }
    *guard = file;
}

/// Writes into the open run log, or discards when none is open.
struct RunLogWriter;

impl Write for RunLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = RUN_LOG.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_mut() {
            Some(file) => file.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = RUN_LOG.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}
