//! Python interpreter discovery.

use std::path::PathBuf;

use crate::error::{HookError, HookResult};

/// Environment variable naming the interpreter to run hooks with.
pub const PYTHON_ENV: &str = "PYHOOKS_PYTHON";

/// Finds the interpreter used to run the driver.
///
/// Checks, in order: an explicit `configured` path, `PYHOOKS_PYTHON`, then
/// `python3` and `python` on `PATH`. An explicit path is returned as given so
/// callers can point at interpreters (or wrappers) that `PATH` lookup would
/// not find.
pub fn find_python(configured: Option<&PathBuf>) -> HookResult<PathBuf> {
    if let Some(path) = configured {
        return Ok(path.clone());
    }

    if let Some(path) = std::env::var_os(PYTHON_ENV).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }

    let names = if cfg!(windows) {
        ["python.exe", "python3.exe"]
    } else {
        ["python3", "python"]
    };
    for name in names {
        if let Ok(path) = which::which(name) {
            return Ok(path);
        }
    }

    Err(HookError::InterpreterNotFound)
}
