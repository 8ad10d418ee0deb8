//! The hook caller.
//!
//! [`HookCaller`] owns a project's source directory and backend reference and
//! exposes one method per hook. Every call follows the same steps: create a
//! control directory, write the driver and the request envelope, run the
//! driver through the active [`SubprocessRunner`], read the result envelope
//! back and turn it into a value or a [`HookError`].

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::backend::BackendRef;
use crate::codec::{CallRequest, ConfigSettings, ControlDir, HookOutcome};
use crate::driver::{DriverSource, BACKEND_ENV, BACKEND_PATH_ENV};
use crate::error::{HookError, HookResult};
use crate::hooks::Hook;
use crate::interpreter::find_python;
use crate::pyproject::BuildSystem;
use crate::runner::{QuietRunner, RunnerCommand, SubprocessRunner};

/// Configuration for a [`HookCaller`].
#[derive(Debug, Clone, Default)]
pub struct HookCallerConfig {
    /// Interpreter to run the driver with; discovered when `None`.
    pub python: Option<PathBuf>,
    /// Where the driver script comes from.
    pub driver: DriverSource,
    /// Kill a hook subprocess after this long; wait forever when `None`.
    pub timeout: Option<Duration>,
    /// Extra environment variables for the hook subprocess.
    pub extra_env: BTreeMap<String, OsString>,
}

impl HookCallerConfig {
    /// Sets the Python interpreter.
    pub fn python(mut self, path: impl Into<PathBuf>) -> Self {
        self.python = Some(path.into());
        self
    }

    /// Uses a driver script on disk instead of the embedded one.
    pub fn driver_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.driver = DriverSource::Path(path.into());
        self
    }

    /// Sets the timeout duration.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the timeout in seconds.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Some(Duration::from_secs(secs));
        self
    }

    /// Adds an environment variable for the hook subprocess.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<OsString>) -> Self {
        self.extra_env.insert(key.into(), value.into());
        self
    }
}

/// Calls build-backend hooks in a subprocess.
///
/// Runner overrides borrow the caller mutably, so they always nest.
pub struct HookCaller {
    source_dir: PathBuf,
    backend: BackendRef,
    config: HookCallerConfig,
    runner: Arc<dyn SubprocessRunner>,
    saved_runners: Vec<Arc<dyn SubprocessRunner>>,
}

impl HookCaller {
    /// Creates a caller for the project at `source_dir`.
    ///
    /// `source_dir` is made absolute against the current directory.
    pub fn new(source_dir: impl AsRef<Path>, backend: BackendRef) -> HookResult<Self> {
        Self::with_config(source_dir, backend, HookCallerConfig::default())
    }

    /// Creates a caller with the given configuration.
    pub fn with_config(
        source_dir: impl AsRef<Path>,
        backend: BackendRef,
        config: HookCallerConfig,
    ) -> HookResult<Self> {
        Ok(Self {
            source_dir: std::path::absolute(source_dir.as_ref())?,
            backend,
            config,
            runner: Arc::new(QuietRunner),
            saved_runners: Vec::new(),
        })
    }

    /// Creates a caller from the project's `pyproject.toml`.
    pub fn from_project(source_dir: impl AsRef<Path>) -> HookResult<Self> {
        let build_system = BuildSystem::from_path(source_dir.as_ref())?;
        Self::new(source_dir, build_system.backend_ref()?)
    }

    /// Replaces the default runner.
    pub fn with_runner(mut self, runner: Arc<dyn SubprocessRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Returns the project source directory.
    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Returns the backend reference.
    pub fn backend(&self) -> &BackendRef {
        &self.backend
    }

    /// Returns the configuration.
    pub fn config(&self) -> &HookCallerConfig {
        &self.config
    }

    /// Returns the runner calls currently go through.
    pub fn runner(&self) -> Arc<dyn SubprocessRunner> {
        Arc::clone(&self.runner)
    }

    pub(crate) fn push_runner(&mut self, runner: Arc<dyn SubprocessRunner>) {
        let previous = std::mem::replace(&mut self.runner, runner);
        self.saved_runners.push(previous);
    }

    pub(crate) fn pop_runner(&mut self) {
        if let Some(previous) = self.saved_runners.pop() {
            self.runner = previous;
        }
    }

    /// Number of runner overrides currently active.
    pub fn override_depth(&self) -> usize {
        self.saved_runners.len()
    }

    /// Dependencies needed to build a wheel, beyond the build-system requirements.
    pub fn get_requires_for_build_wheel(
        &self,
        config_settings: Option<&ConfigSettings>,
    ) -> HookResult<Vec<String>> {
        let request = CallRequest::new().arg("config_settings", &config_settings)?;
        self.call_typed(Hook::GetRequiresForBuildWheel, &request)
    }

    /// Dependencies needed to build an sdist, beyond the build-system requirements.
    pub fn get_requires_for_build_sdist(
        &self,
        config_settings: Option<&ConfigSettings>,
    ) -> HookResult<Vec<String>> {
        let request = CallRequest::new().arg("config_settings", &config_settings)?;
        self.call_typed(Hook::GetRequiresForBuildSdist, &request)
    }

    /// Dependencies needed to build an editable wheel.
    pub fn get_requires_for_build_editable(
        &self,
        config_settings: Option<&ConfigSettings>,
    ) -> HookResult<Vec<String>> {
        let request = CallRequest::new().arg("config_settings", &config_settings)?;
        self.call_typed(Hook::GetRequiresForBuildEditable, &request)
    }

    /// Writes a `.dist-info` directory into `metadata_directory` and returns its name.
    ///
    /// If the backend lacks the hook and `allow_fallback` is set, a wheel is
    /// built and its metadata extracted instead; a later [`build_wheel`] given
    /// the returned directory reuses that wheel. Without the fallback a
    /// missing hook is [`HookError::HookMissing`].
    ///
    /// [`build_wheel`]: HookCaller::build_wheel
    pub fn prepare_metadata_for_build_wheel(
        &self,
        metadata_directory: &Path,
        config_settings: Option<&ConfigSettings>,
        allow_fallback: bool,
    ) -> HookResult<String> {
        let request = self.metadata_request(metadata_directory, config_settings, allow_fallback)?;
        self.call_typed(Hook::PrepareMetadataForBuildWheel, &request)
    }

    /// Editable counterpart of [`prepare_metadata_for_build_wheel`](HookCaller::prepare_metadata_for_build_wheel).
    pub fn prepare_metadata_for_build_editable(
        &self,
        metadata_directory: &Path,
        config_settings: Option<&ConfigSettings>,
        allow_fallback: bool,
    ) -> HookResult<String> {
        let request = self.metadata_request(metadata_directory, config_settings, allow_fallback)?;
        self.call_typed(Hook::PrepareMetadataForBuildEditable, &request)
    }

    /// Builds a wheel into `wheel_directory` and returns its file name.
    pub fn build_wheel(
        &self,
        wheel_directory: &Path,
        config_settings: Option<&ConfigSettings>,
        metadata_directory: Option<&Path>,
    ) -> HookResult<String> {
        let request = self.build_request(
            "wheel_directory",
            wheel_directory,
            config_settings,
            Some(metadata_directory),
        )?;
        self.call_typed(Hook::BuildWheel, &request)
    }

    /// Builds an editable wheel into `wheel_directory` and returns its file name.
    pub fn build_editable(
        &self,
        wheel_directory: &Path,
        config_settings: Option<&ConfigSettings>,
        metadata_directory: Option<&Path>,
    ) -> HookResult<String> {
        let request = self.build_request(
            "wheel_directory",
            wheel_directory,
            config_settings,
            Some(metadata_directory),
        )?;
        self.call_typed(Hook::BuildEditable, &request)
    }

    /// Builds an sdist into `sdist_directory` and returns its file name.
    pub fn build_sdist(
        &self,
        sdist_directory: &Path,
        config_settings: Option<&ConfigSettings>,
    ) -> HookResult<String> {
        let request =
            self.build_request("sdist_directory", sdist_directory, config_settings, None)?;
        self.call_typed(Hook::BuildSdist, &request)
    }

    /// Optional features the backend supports, e.g. `build_editable`.
    pub fn supported_features(&self) -> HookResult<Vec<String>> {
        self.call_typed(Hook::SupportedFeatures, &CallRequest::new())
    }

    fn metadata_request(
        &self,
        metadata_directory: &Path,
        config_settings: Option<&ConfigSettings>,
        allow_fallback: bool,
    ) -> HookResult<CallRequest> {
        CallRequest::new()
            .path_arg("metadata_directory", &std::path::absolute(metadata_directory)?)?
            .arg("config_settings", &config_settings)?
            .arg("_allow_fallback", &allow_fallback)
    }

    /// `metadata_directory` is `None` for hooks that do not take one.
    fn build_request(
        &self,
        output_name: &str,
        output_directory: &Path,
        config_settings: Option<&ConfigSettings>,
        metadata_directory: Option<Option<&Path>>,
    ) -> HookResult<CallRequest> {
        // The hook runs with the source directory as its cwd.
        let output_directory = std::path::absolute(output_directory)?;
        let mut request = CallRequest::new()
            .path_arg(output_name, &output_directory)?
            .arg("config_settings", &config_settings)?;
        if let Some(metadata_directory) = metadata_directory {
            let metadata_directory = metadata_directory.map(std::path::absolute).transpose()?;
            request =
                request.optional_path_arg("metadata_directory", metadata_directory.as_deref())?;
        }
        Ok(request)
    }

    fn call_typed<T: DeserializeOwned>(&self, hook: Hook, request: &CallRequest) -> HookResult<T> {
        let value = self.call_hook(hook, request)?;
        match T::deserialize(&value) {
            Ok(parsed) => Ok(parsed),
            Err(source) => Err(HookError::UnexpectedReturn {
                hook,
                value,
                source,
            }),
        }
    }

    /// Calls `hook` with the given arguments and returns its raw JSON result.
    #[instrument(skip_all, fields(hook = %hook, backend = %self.backend))]
    pub fn call_hook(&self, hook: Hook, request: &CallRequest) -> HookResult<Value> {
        let python = find_python(self.config.python.as_ref())?;
        let control = ControlDir::new()?;
        let driver = self.config.driver.materialize(control.path())?;
        control.encode(request)?;

        let cmd = self.command(python, &driver, hook, control.path())?;
        debug!("Calling `{}.{}()`", self.backend, hook);
        let ran = self.runner().run(&cmd);

        let outcome = match (ran, control.decode()) {
            (Ok(()), decoded) => decoded?,
            (Err(err), Ok(outcome)) => {
                debug!(error = %err, "Hook subprocess failed after writing a result");
                outcome
            }
            (Err(err), Err(_)) => return Err(err.into()),
        };
        self.reclassify(hook, outcome)
    }

    fn command(
        &self,
        python: PathBuf,
        driver: &Path,
        hook: Hook,
        control_dir: &Path,
    ) -> HookResult<RunnerCommand> {
        let mut cmd = RunnerCommand::new(python)
            .arg(driver)
            .arg(hook.name())
            .arg(control_dir)
            .cwd(&self.source_dir)
            .timeout(self.config.timeout);
        for (key, value) in &self.config.extra_env {
            cmd = cmd.env(key.clone(), value.clone());
        }

        cmd = cmd.env(BACKEND_ENV, self.backend.declaration());
        let backend_path = self.backend.backend_path_in(&self.source_dir);
        if !backend_path.is_empty() {
            let joined = std::env::join_paths(&backend_path)
                .map_err(|e| HookError::invalid_argument("backend-path", e))?;
            cmd = cmd.env(BACKEND_PATH_ENV, joined);
        }
        Ok(cmd)
    }

    fn reclassify(&self, hook: Hook, outcome: HookOutcome) -> HookResult<Value> {
        match outcome {
            HookOutcome::Returned(value) => Ok(value),
            HookOutcome::BackendUnavailable { traceback } => Err(HookError::BackendUnavailable {
                backend: self.backend.to_string(),
                traceback,
            }),
            HookOutcome::BackendInvalid { message } => Err(HookError::BackendInvalid {
                backend: self.backend.to_string(),
                message,
            }),
            HookOutcome::HookMissing => Err(HookError::HookMissing { hook }),
            HookOutcome::Unsupported { message } => Err(HookError::UnsupportedOperation { message }),
            HookOutcome::Failed { traceback } => Err(HookError::BackendFailed { hook, traceback }),
        }
    }
}

impl fmt::Debug for HookCaller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookCaller")
            .field("source_dir", &self.source_dir)
            .field("backend", &self.backend)
            .field("config", &self.config)
            .field("override_depth", &self.override_depth())
            .finish_non_exhaustive()
    }
}
