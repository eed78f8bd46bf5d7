// Shared test helpers for integration tests
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{TempDir, tempdir};
use testr::core::config::RunOptions;

/// A temporary project root with a `packages/` tree and an `outputs/` dir.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempdir().expect("Failed to create temporary directory");
        fs::create_dir_all(dir.path().join("packages")).expect("Failed to create packages dir");
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn outputs(&self) -> PathBuf {
        self.root().join("outputs")
    }

    pub fn package_dir(&self, name: &str) -> PathBuf {
        self.root().join("packages").join(name)
    }

    /// Writes `content` to `packages/<package>/<file>`, creating the package.
    pub fn write(&self, package: &str, file: &str, content: &str) -> PathBuf {
        let path = self.package_dir(package).join(file);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create package dir");
        }
        fs::write(&path, content).expect("Failed to write package file");
        path
    }

    /// Like [`Workspace::write`], and marks the file executable.
    pub fn write_executable(&self, package: &str, file: &str, content: &str) -> PathBuf {
        let path = self.write(package, file, content);
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
                .expect("Failed to set permissions");
        }
        path
    }

    /// The `demo` package of the end-to-end scenarios: one passing and one
    /// failing "Python" test. The tests are plain shell so they can be run
    /// with `python = "sh"` on machines without Python.
    pub fn demo_package(&self) {
        self.write("demo", "VERSION", "1.2.3\n");
        self.write("demo", "test_basic.py", "echo basic ran\nexit 0\n");
        self.write("demo", "test_broken.py", "echo broken ran\nexit 1\n");
    }

    /// Run options rooted at this workspace, running `.py` tests with `sh`.
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            root: self.root().to_path_buf(),
            outputs_dir: self.outputs(),
            python: "sh".to_string(),
            argv: vec!["testr".to_string(), "run".to_string()],
            ..RunOptions::default()
        }
    }

    /// The single run directory below `outputs/logs`.
    pub fn log_dir(&self) -> PathBuf {
        let logs = self.outputs().join("logs");
        fs::read_dir(&logs)
            .expect("Failed to read logs dir")
            .map(|e| e.expect("Failed to read dir entry").path())
            .find(|p| p.is_dir() && !p.ends_with("last"))
            .expect("No run directory found")
    }
}
