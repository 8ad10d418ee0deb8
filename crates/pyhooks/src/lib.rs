//! pyhooks
//!
//! Calls Python build-backend hooks (PEP 517 / PEP 660) without loading the
//! backend into the calling process.
//!
//! # Architecture
//!
//! The crate uses a two-part architecture:
//!
//! 1. **Rust caller** - [`HookCaller`] writes the call's arguments, spawns a
//!    Python interpreter through a [`SubprocessRunner`] and classifies the
//!    result.
//! 2. **Python driver** - runs inside that interpreter, imports the backend,
//!    calls the hook (or its built-in default) and reports the outcome.
//!
//! Communication happens via JSON files in a per-call temp directory:
//! - `input.json` holds `{"kwargs": {...}}`
//! - `output.json` holds exactly one result envelope
//!
//! # Hooks
//!
//! | Hook | Missing from backend |
//! |------|----------------------|
//! | `get_requires_for_build_{wheel,sdist,editable}` | `[]` |
//! | `prepare_metadata_for_build_{wheel,editable}` | [`HookError::HookMissing`], or metadata from a full build when allowed |
//! | `build_wheel`, `build_sdist` | [`HookError::HookMissing`] |
//! | `build_editable` | [`HookError::HookMissing`] |
//!
//! # Example
//!
//! ```ignore
//! use pyhooks::HookCaller;
//! use std::path::Path;
//!
//! let hooks = HookCaller::from_project("path/to/project")?;
//! let requires = hooks.get_requires_for_build_wheel(None)?;
//! let wheel = hooks.build_wheel(Path::new("dist"), None, None)?;
//! println!("Built dist/{wheel} (needed {requires:?})");
//! ```
//!
//! # Python Requirements
//!
//! The interpreter is found through:
//!
//! 1. [`HookCallerConfig::python`]
//! 2. `PYHOOKS_PYTHON` environment variable
//! 3. `python3` / `python` on PATH
//!
//! # Crate Structure
//!
//! - [`caller`] - The hook caller
//! - [`scope`] - Scoped runner overrides
//! - [`runner`] - Subprocess execution strategies
//! - [`codec`] - Request/result envelopes
//! - [`driver`] - The embedded Python driver
//! - [`hooks`] - The hook table
//! - [`backend`] - Backend references
//! - [`pyproject`] - `[build-system]` loading
//! - [`interpreter`] - Interpreter discovery
//! - [`error`] - Error types

pub mod backend;
pub mod caller;
pub mod codec;
pub mod driver;
pub mod error;
pub mod hooks;
pub mod interpreter;
pub mod pyproject;
pub mod runner;
pub mod scope;

// Re-export main types at crate root
pub use backend::{BackendRef, InvalidBackend, LEGACY_BACKEND};
pub use caller::{HookCaller, HookCallerConfig};
pub use codec::{CallRequest, ConfigSettings, HookOutcome};
pub use driver::DriverSource;
pub use error::{EnvelopeError, HookError, HookResult, RunnerError};
pub use hooks::{DefaultBehavior, Hook};
pub use pyproject::{BuildSystem, PyprojectError};
pub use runner::{QuietRunner, RunnerCommand, SubprocessRunner, VerboseRunner};
pub use scope::RunnerOverride;
