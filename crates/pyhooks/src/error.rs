//! Error types for hook calls.
//!
//! Every outcome the driver can report maps to its own [`HookError`] variant
//! so callers can pick a fallback per failure kind (for example, building a
//! full wheel when metadata preparation is not implemented).

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::hooks::Hook;
use crate::pyproject::PyprojectError;

/// Result type for hook calls.
pub type HookResult<T> = Result<T, HookError>;

/// Errors that can occur while calling a backend hook.
#[derive(Debug, Error)]
pub enum HookError {
    /// The backend module could not be imported in the subprocess.
    #[error("Backend '{backend}' is unavailable:\n{traceback}")]
    BackendUnavailable { backend: String, traceback: String },

    /// An in-tree backend was loaded from outside its declared backend path.
    #[error("Backend '{backend}' is invalid: {message}")]
    BackendInvalid { backend: String, message: String },

    /// The backend does not define a hook that has no default.
    #[error("Backend does not implement hook '{hook}'")]
    HookMissing { hook: Hook },

    /// The backend refused the request.
    #[error("Operation not supported by backend{}", suffix(.message.as_deref()))]
    UnsupportedOperation { message: Option<String> },

    /// The hook raised an unexpected exception inside the backend.
    #[error("Hook '{hook}' failed in the backend:\n{traceback}")]
    BackendFailed { hook: Hook, traceback: String },

    /// No Python interpreter could be located.
    #[error("Python interpreter not found. Install python3, put it on PATH, or set PYHOOKS_PYTHON")]
    InterpreterNotFound,

    /// A keyword argument could not be represented as JSON.
    #[error("Argument '{name}' is not JSON-representable: {reason}")]
    InvalidArgument { name: String, reason: String },

    /// The hook returned a JSON value of the wrong shape.
    #[error("Hook '{hook}' returned an unexpected value {value}: {source}")]
    UnexpectedReturn {
        hook: Hook,
        value: serde_json::Value,
        #[source]
        source: serde_json::Error,
    },

    /// The subprocess could not be run to a successful exit.
    #[error(transparent)]
    Runner(#[from] RunnerError),

    /// The result envelope was missing or malformed.
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    /// The build-system declaration could not be loaded.
    #[error(transparent)]
    Pyproject(#[from] PyprojectError),

    /// IO error while preparing the call.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HookError {
    /// Creates a new invalid argument error.
    pub fn invalid_argument(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a new unsupported operation error.
    pub fn unsupported(message: Option<impl Into<String>>) -> Self {
        Self::UnsupportedOperation {
            message: message.map(Into::into),
        }
    }

    /// Stable identifier for this kind of failure.
    pub fn code(&self) -> &'static str {
        match self {
            HookError::BackendUnavailable { .. } => "HOOK_001",
            HookError::BackendInvalid { .. } => "HOOK_002",
            HookError::HookMissing { .. } => "HOOK_003",
            HookError::UnsupportedOperation { .. } => "HOOK_004",
            HookError::BackendFailed { .. } => "HOOK_005",
            HookError::InterpreterNotFound => "HOOK_006",
            HookError::InvalidArgument { .. } => "HOOK_007",
            HookError::UnexpectedReturn { .. } => "HOOK_008",
            HookError::Runner(_) => "HOOK_009",
            HookError::Envelope(_) => "HOOK_010",
            HookError::Io(_) => "HOOK_011",
            HookError::Pyproject(_) => "HOOK_012",
        }
    }

    /// Whether a frontend can reasonably react to this failure, e.g. by
    /// installing the backend or falling back to another hook.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            HookError::BackendUnavailable { .. }
                | HookError::HookMissing { .. }
                | HookError::UnsupportedOperation { .. }
        )
    }
}

fn suffix(detail: Option<&str>) -> String {
    detail.map(|d| format!(": {d}")).unwrap_or_default()
}

/// Errors raised by a [`SubprocessRunner`](crate::runner::SubprocessRunner).
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Failed to spawn the process.
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed while waiting for the process.
    #[error("Failed to wait for '{program}': {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The process exited with a non-zero status.
    #[error("'{program}' exited with status {code}{}", suffix(Some(.output.as_str()).filter(|o| !o.is_empty())))]
    NonZeroExit {
        program: String,
        code: i32,
        output: String,
    },

    /// The process exceeded its timeout and was killed.
    #[error("'{program}' timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },
}

impl RunnerError {
    /// Creates a new non-zero exit error.
    pub fn non_zero_exit(program: impl Into<String>, code: i32, output: impl Into<String>) -> Self {
        Self::NonZeroExit {
            program: program.into(),
            code,
            output: output.into(),
        }
    }
}

/// Errors reading the result envelope back from the driver.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The driver exited without writing a result.
    #[error("Hook subprocess exited without writing a result to {path}")]
    Missing { path: PathBuf },

    /// The result file could not be read.
    #[error("Failed to read hook result from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The result file is not valid JSON.
    #[error("Failed to parse hook result: {0}")]
    Parse(#[source] serde_json::Error),

    /// The request document could not be written.
    #[error("Failed to write hook arguments to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The result is JSON but not a recognized envelope.
    #[error("Unrecognized hook result: {0}")]
    Unrecognized(String),
}
