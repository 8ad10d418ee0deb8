//! The `[build-system]` table of `pyproject.toml`.
//!
//! Only the keys needed to locate a backend are read; the rest of the file is
//! ignored.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::backend::{BackendRef, InvalidBackend, LEGACY_BACKEND};

/// File name of the build-system declaration.
pub const PYPROJECT_TOML: &str = "pyproject.toml";

/// Errors loading a build-system declaration.
#[derive(Debug, thiserror::Error)]
pub enum PyprojectError {
    /// The file could not be read.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or has the wrong shape.
    #[error("Failed to parse pyproject.toml: {0}")]
    Parse(#[from] toml::de::Error),

    /// `build-backend` is malformed.
    #[error(transparent)]
    Backend(#[from] InvalidBackend),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct PyProjectToml {
    build_system: Option<BuildSystem>,
}

/// The `[build-system]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BuildSystem {
    /// Requirements needed to import the backend.
    #[serde(default)]
    pub requires: Vec<String>,
    /// The backend declaration, e.g. `flit_core.buildapi`.
    pub build_backend: Option<String>,
    /// In-tree backend directories, relative to the project root.
    pub backend_path: Option<Vec<PathBuf>>,
}

impl BuildSystem {
    /// Parses the `[build-system]` table from TOML text.
    ///
    /// A file without the table yields the default (legacy setuptools) build
    /// system.
    pub fn from_toml_str(content: &str) -> Result<Self, PyprojectError> {
        let pyproject: PyProjectToml = toml::from_str(content)?;
        Ok(pyproject.build_system.unwrap_or_default())
    }

    /// Loads the table from a project directory or a `pyproject.toml` path.
    pub fn from_path(path: &Path) -> Result<Self, PyprojectError> {
        let path = if path.is_dir() {
            path.join(PYPROJECT_TOML)
        } else {
            path.to_path_buf()
        };
        let content = std::fs::read_to_string(&path)
            .map_err(|source| PyprojectError::Read { path, source })?;
        Self::from_toml_str(&content)
    }

    /// Returns the declared backend, or the legacy setuptools backend.
    pub fn backend_ref(&self) -> Result<BackendRef, PyprojectError> {
        let declared = self.build_backend.as_deref().unwrap_or(LEGACY_BACKEND);
        let backend: BackendRef = declared.parse()?;
        Ok(match &self.backend_path {
            Some(paths) => backend.with_backend_path(paths.iter().cloned()),
            None => backend,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_build_system() {
        let build_system = BuildSystem::from_toml_str(
            r#"
            [build-system]
            requires = ["eg_buildsys"]
            build-backend = "buildsys"

            [project]
            name = "pkg1"
            "#,
        )
        .unwrap();
        assert_eq!(build_system.requires, vec!["eg_buildsys".to_string()]);
        assert_eq!(
            build_system.backend_ref().unwrap(),
            BackendRef::new("buildsys")
        );
    }

    #[test]
    fn test_missing_table_uses_legacy_backend() {
        let build_system = BuildSystem::from_toml_str("[project]\nname = \"x\"\n").unwrap();
        assert_eq!(build_system, BuildSystem::default());
        assert_eq!(
            build_system.backend_ref().unwrap().declaration(),
            LEGACY_BACKEND
        );
    }

    #[test]
    fn test_in_tree_backend() {
        let build_system = BuildSystem::from_toml_str(
            r#"
            [build-system]
            requires = []
            build-backend = "intree_backend:hooks"
            backend-path = ["backend"]
            "#,
        )
        .unwrap();
        let backend = build_system.backend_ref().unwrap();
        assert_eq!(backend.object(), Some("hooks"));
        assert_eq!(backend.backend_path(), &[PathBuf::from("backend")]);
    }

    #[test]
    fn test_bad_declarations() {
        assert!(matches!(
            BuildSystem::from_toml_str("[build-system]\nrequires = \"nope\"\n"),
            Err(PyprojectError::Parse(_))
        ));
        let build_system =
            BuildSystem::from_toml_str("[build-system]\nbuild-backend = \"not a module\"\n")
                .unwrap();
        assert!(matches!(
            build_system.backend_ref(),
            Err(PyprojectError::Backend(_))
        ));
    }

    #[test]
    fn test_from_path_accepts_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(PYPROJECT_TOML),
            "[build-system]\nbuild-backend = \"buildsys\"\n",
        )
        .unwrap();
        let from_dir = BuildSystem::from_path(dir.path()).unwrap();
        let from_file = BuildSystem::from_path(&dir.path().join(PYPROJECT_TOML)).unwrap();
        assert_eq!(from_dir, from_file);
        assert!(matches!(
            BuildSystem::from_path(&dir.path().join("missing")),
            Err(PyprojectError::Read { .. })
        ));
    }
}
