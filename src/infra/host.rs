//! Host facts recorded in the report and used to name run directories.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInfo {
    /// `Linux`, `Darwin`, `Windows`, ...
    pub system: String,
    pub architecture: String,
    pub hostname: String,
    pub platform: String,
}

impl HostInfo {
    pub fn detect() -> Self {
        let system = system_name(env::consts::OS);
        let architecture = env::consts::ARCH.to_string();
        let hostname = detect_hostname();
        let platform = match kernel_release() {
            Some(release) => format!("{system}-{release}-{architecture}"),
            None => format!("{system}-{architecture}-{}", env::consts::FAMILY),
        };
        Self {
            system,
            architecture,
            hostname,
            platform,
        }
    }
}

/// Maps a Rust OS name onto the conventional system name.
pub fn system_name(os: &str) -> String {
    match os {
        "linux" => "Linux".to_string(),
        "macos" => "Darwin".to_string(),
        "windows" => "Windows".to_string(),
        other => other.to_string(),
    }
}

fn detect_hostname() -> String {
    ["HOSTNAME", "COMPUTERNAME"]
        .iter()
        .find_map(|var| env::var(var).ok())
        .or_else(|| read_trimmed("/proc/sys/kernel/hostname"))
        .or_else(|| read_trimmed("/etc/hostname"))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn kernel_release() -> Option<String> {
    read_trimmed("/proc/sys/kernel/osrelease")
}

fn read_trimmed(path: &str) -> Option<String> {
    fs::read_to_string(path).ok().map(|s| s.trim().to_string())
}
