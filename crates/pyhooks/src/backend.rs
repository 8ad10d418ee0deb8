//! Backend references.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Backend used when a project declares no `build-backend`.
pub const LEGACY_BACKEND: &str = "setuptools.build_meta:__legacy__";

/// Which code implements the hooks.
///
/// Written as `module.path` or `module.path:object.path`, optionally with
/// in-tree directories that are put in front of the backend's import path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendRef {
    module: String,
    object: Option<String>,
    backend_path: Vec<PathBuf>,
}

/// Error returned when a backend declaration is malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid build backend '{declaration}': {reason}")]
pub struct InvalidBackend {
    pub declaration: String,
    pub reason: &'static str,
}

impl BackendRef {
    /// Creates a reference to a module.
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            object: None,
            backend_path: Vec::new(),
        }
    }

    /// Sets the dotted object path inside the module.
    pub fn with_object(mut self, object: impl Into<String>) -> Self {
        self.object = Some(object.into());
        self
    }

    /// Sets the in-tree directories searched before the rest of `sys.path`.
    pub fn with_backend_path<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.backend_path = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the module name.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Returns the object path, if any.
    pub fn object(&self) -> Option<&str> {
        self.object.as_deref()
    }

    /// Returns the in-tree directories.
    pub fn backend_path(&self) -> &[PathBuf] {
        &self.backend_path
    }

    /// Returns the in-tree directories made absolute against `root`.
    pub fn backend_path_in(&self, root: &Path) -> Vec<PathBuf> {
        self.backend_path
            .iter()
            .map(|p| if p.is_absolute() { p.clone() } else { root.join(p) })
            .collect()
    }

    /// Returns the declaration text handed to the driver.
    pub fn declaration(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for BackendRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.object {
            Some(object) => write!(f, "{}:{}", self.module, object),
            None => f.write_str(&self.module),
        }
    }
}

impl FromStr for BackendRef {
    type Err = InvalidBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| InvalidBackend {
            declaration: s.to_string(),
            reason,
        };

        let s = s.trim();
        let (module, object) = match s.split_once(':') {
            Some((module, object)) => (module.trim(), Some(object.trim())),
            None => (s, None),
        };

        if !is_dotted_identifier(module) {
            return Err(invalid("module must be a dotted Python identifier"));
        }
        let mut backend = BackendRef::new(module);
        if let Some(object) = object {
            if !is_dotted_identifier(object) {
                return Err(invalid("object must be a dotted Python identifier"));
            }
            backend = backend.with_object(object);
        }
        Ok(backend)
    }
}

fn is_dotted_identifier(s: &str) -> bool {
    !s.is_empty()
        && s.split('.').all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c == '_' || c.is_alphabetic())
                && chars.all(|c| c == '_' || c.is_alphanumeric())
        })
}
