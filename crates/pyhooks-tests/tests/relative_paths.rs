//! Relative output directories resolve against the caller's working
//! directory, not the project directory the hook runs in.
//!
//! These tests change the process working directory, so they live in their
//! own test binary and hold a lock while they do.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use pyhooks_tests::harness::{get_hooks, is_python_available};

fn cwd_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

/// Changes the working directory until dropped.
struct WorkingDirectory {
    previous: PathBuf,
}

impl WorkingDirectory {
    fn enter(dir: &Path) -> Self {
        let previous = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir).unwrap();
        Self { previous }
    }
}

impl Drop for WorkingDirectory {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.previous);
    }
}

#[test]
fn test_build_wheel_relpath() {
    if !is_python_available() {
        println!("Python not available, skipping");
        return;
    }

    let _lock = cwd_lock().lock().unwrap_or_else(|e| e.into_inner());
    let hooks = get_hooks("pkg1");
    let build_dir = tempfile::tempdir().unwrap();

    let whl_file = {
        let _cwd = WorkingDirectory::enter(build_dir.path());
        hooks.build_wheel(Path::new("."), None, None).unwrap()
    };

    assert!(whl_file.ends_with(".whl"));
    assert!(!whl_file.contains(std::path::MAIN_SEPARATOR));
    assert!(build_dir.path().join(&whl_file).is_file());
    assert!(!hooks.source_dir().join(&whl_file).exists());
}

#[test]
fn test_build_sdist_relpath() {
    if !is_python_available() {
        println!("Python not available, skipping");
        return;
    }

    let _lock = cwd_lock().lock().unwrap_or_else(|e| e.into_inner());
    let hooks = get_hooks("pkg1");
    let work_dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(work_dir.path().join("dist")).unwrap();

    let sdist = {
        let _cwd = WorkingDirectory::enter(work_dir.path());
        hooks.build_sdist(Path::new("dist"), None).unwrap()
    };

    assert!(sdist.ends_with(".tar.gz"));
    assert!(work_dir.path().join("dist").join(&sdist).is_file());
    assert!(!hooks.source_dir().join("dist").exists());
}
