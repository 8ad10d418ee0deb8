//! Helpers for building hook callers over the sample projects.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use pyhooks::interpreter::find_python;
use pyhooks::{
    BackendRef, BuildSystem, HookCaller, HookCallerConfig, QuietRunner, RunnerCommand,
    RunnerError, SubprocessRunner,
};

/// Directory holding the sample projects.
pub fn samples_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("samples")
}

/// Directory holding the sample backends, used as `PYTHONPATH`.
pub fn buildsys_pkgs() -> PathBuf {
    samples_dir().join("buildsys_pkgs")
}

/// Path of a sample project.
pub fn sample(pkg: &str) -> PathBuf {
    samples_dir().join(pkg)
}

/// Check if a Python interpreter can be run.
pub fn is_python_available() -> bool {
    static AVAILABLE: OnceLock<bool> = OnceLock::new();
    *AVAILABLE.get_or_init(|| {
        find_python(None)
            .ok()
            .and_then(|python| Command::new(python).arg("--version").output().ok())
            .map(|o| o.status.success())
            .unwrap_or(false)
    })
}

/// Caller configuration with the sample backends importable.
pub fn config() -> HookCallerConfig {
    config_with_pythonpath(&buildsys_pkgs())
}

/// Caller configuration with an explicit `PYTHONPATH`.
pub fn config_with_pythonpath(pythonpath: &Path) -> HookCallerConfig {
    HookCallerConfig::default().env("PYTHONPATH", pythonpath)
}

/// Hook caller for a sample project, using the backend its `pyproject.toml` declares.
pub fn get_hooks(pkg: &str) -> HookCaller {
    get_hooks_with_config(pkg, config())
}

/// Hook caller for a sample project with a custom configuration.
pub fn get_hooks_with_config(pkg: &str, config: HookCallerConfig) -> HookCaller {
    let source_dir = sample(pkg);
    let backend = BuildSystem::from_path(&source_dir)
        .and_then(|build_system| build_system.backend_ref())
        .expect("Failed to load sample build system");
    HookCaller::with_config(source_dir, backend, config).expect("Failed to create hook caller")
}

/// Hook caller for a sample project with an explicit backend declaration.
pub fn hooks_with_backend(pkg: &str, backend: &str) -> HookCaller {
    let backend: BackendRef = backend.parse().expect("Invalid backend declaration");
    HookCaller::with_config(sample(pkg), backend, config()).expect("Failed to create hook caller")
}

/// Quiet runner that counts how often it is used.
#[derive(Debug, Default)]
pub struct CountingRunner {
    calls: AtomicUsize,
}

impl CountingRunner {
    /// Returns the number of calls since the last reset and resets it.
    pub fn take_calls(&self) -> usize {
        self.calls.swap(0, Ordering::SeqCst)
    }
}

impl SubprocessRunner for CountingRunner {
    fn run(&self, cmd: &RunnerCommand) -> Result<(), RunnerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        QuietRunner.run(cmd)
    }
}
