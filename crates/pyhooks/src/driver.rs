//! The in-process driver.
//!
//! The driver is a small Python program that runs inside the spawned
//! interpreter: it imports the backend, resolves the requested hook (falling
//! back to built-in defaults for optional hooks) and writes exactly one result
//! envelope. It is embedded in the library and written next to the envelopes
//! for every call, unless the caller points at a copy on disk.

use std::path::{Path, PathBuf};

use crate::error::HookResult;

/// Source of the driver script.
pub const DRIVER_SOURCE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/python/in_process.py"
));

/// File name the embedded driver is written under.
pub const DRIVER_FILE_NAME: &str = "_pyhooks_in_process.py";

/// Environment variable naming the backend for the driver.
pub const BACKEND_ENV: &str = "_PYHOOKS_BUILD_BACKEND";

/// Environment variable listing in-tree backend directories for the driver.
pub const BACKEND_PATH_ENV: &str = "_PYHOOKS_BACKEND_PATH";

/// Marker the driver leaves in a metadata directory after building a wheel
/// only to extract its metadata.
pub const WHEEL_BUILT_MARKER: &str = "PYHOOKS_ALREADY_BUILT_WHEEL";

/// Where the driver script for a call comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DriverSource {
    /// Write the embedded script into the call's control directory.
    #[default]
    Embedded,
    /// Use an existing script on disk.
    Path(PathBuf),
}

impl DriverSource {
    /// Returns a path to a runnable driver script, writing the embedded copy
    /// into `dir` if needed.
    pub fn materialize(&self, dir: &Path) -> HookResult<PathBuf> {
        match self {
            DriverSource::Embedded => {
                let path = dir.join(DRIVER_FILE_NAME);
                std::fs::write(&path, DRIVER_SOURCE)?;
                Ok(path)
            }
            DriverSource::Path(path) => Ok(path.clone()),
        }
    }
}
