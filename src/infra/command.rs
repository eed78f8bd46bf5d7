//! # Command Execution Module / 命令执行模块
//!
//! Spawns a test process, tees its merged stdout/stderr into a log file while
//! relaying every line to the console, and waits for it to exit, time out or be
//! cancelled.
//!
//! 派生测试进程，将其合并的 stdout/stderr 写入日志文件，同时将每一行转发到控制台，
//! 并等待进程退出、超时或被取消。

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::Command;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::SplitStream;
use tokio_util::sync::CancellationToken;

/// How a spawned process ended.
/// 派生进程的结束方式。
#[derive(Debug)]
pub enum ProcessEnd {
    /// The process exited on its own / 进程自行退出
    Exited(ExitStatus),
    /// The process outlived its timeout and was killed / 进程超时并被终止
    TimedOut(Duration),
    /// The run was cancelled and the process was killed / 运行被取消，进程被终止
    Cancelled,
}

/// Spawns `cmd`, writing its combined output to `log_path`.
///
/// Every output line is appended to the log file and, when `echo` is set,
/// printed to stdout as it arrives. After the process exits, output is
/// drained until the pipes close, still within `timeout` and `cancel`. The
/// returned `Err` covers failures to create the log file, to spawn the
/// process or to wait for it.
///
/// 派生 `cmd`，将其合并输出写入 `log_path`。
/// 每一行输出都会追加到日志文件中；设置 `echo` 时还会实时打印到 stdout。
///
/// # Arguments
/// * `cmd` - The `tokio::process::Command` to execute.
/// * `log_path` - File receiving combined stdout and stderr.
/// * `echo` - Relay output lines to the console.
/// * `timeout` - Optional limit on the process run time.
/// * `cancel` - Token that kills the process when cancelled.
pub async fn spawn_and_tee(
    mut cmd: Command,
    log_path: &Path,
    echo: bool,
    timeout: Option<Duration>,
    cancel: &CancellationToken,
) -> std::io::Result<ProcessEnd> {
    let log = File::create(log_path).await?;

    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| std::io::Error::other("failed to capture stdout"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| std::io::Error::other("failed to capture stderr"))?;

    let lines = SplitStream::new(BufReader::new(stdout).split(b'\n'))
        .merge(SplitStream::new(BufReader::new(stderr).split(b'\n')));
    let stop = CancellationToken::new();
    let mut pump = tokio::spawn(pump_lines(lines, BufWriter::new(log), echo, stop.clone()));

    let deadline = async {
        match timeout {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(deadline);

    let mut ended = tokio::select! {
        status = child.wait() => ProcessEnd::Exited(status?),
        _ = &mut deadline => ProcessEnd::TimedOut(timeout.unwrap_or_default()),
        _ = cancel.cancelled() => ProcessEnd::Cancelled,
    };

    if let ProcessEnd::Exited(_) = ended {
        // Background jobs of the test may still hold the pipes open; draining
        // them stays bound by the same deadline and cancellation.
        ended = tokio::select! {
            joined = &mut pump => {
                joined.map_err(std::io::Error::other)??;
                return Ok(ended);
            }
            _ = &mut deadline => ProcessEnd::TimedOut(timeout.unwrap_or_default()),
            _ = cancel.cancelled() => ProcessEnd::Cancelled,
        };
    } else {
        child.kill().await?;
    }

    // Keep what was captured so far; grandchildren are not waited on.
    stop.cancel();
    pump.await.map_err(std::io::Error::other)??;
    Ok(ended)
}

async fn pump_lines<S>(
    mut lines: S,
    mut log: BufWriter<File>,
    echo: bool,
    stop: CancellationToken,
) -> std::io::Result<()>
where
    S: tokio_stream::Stream<Item = std::io::Result<Vec<u8>>> + Unpin,
{
    loop {
        let next = tokio::select! {
            next = lines.next() => next,
            _ = stop.cancelled() => break,
        };
        let Some(line) = next else { break };
        let mut line = line?;
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        if echo {
            println!("{}", String::from_utf8_lossy(&line));
        }
        log.write_all(&line).await?;
        log.write_all(b"\n").await?;
    }
    log.flush().await
}
