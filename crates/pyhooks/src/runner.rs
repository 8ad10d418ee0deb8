//! Subprocess runners.
//!
//! A runner executes one command to completion and fails if it exits
//! non-zero. [`QuietRunner`] captures the child's output and attaches it to
//! the error; [`VerboseRunner`] lets the child write straight to the parent's
//! stdout/stderr. Any `Fn(&RunnerCommand) -> Result<(), RunnerError>` is a
//! runner too, which is how tests observe calls.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::RunnerError;

/// Interval between exit checks while a timeout is armed.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A command for a runner to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerCommand {
    /// Executable to run.
    pub program: PathBuf,
    /// Arguments after the executable.
    pub args: Vec<OsString>,
    /// Working directory; the parent's when `None`.
    pub cwd: Option<PathBuf>,
    /// Variables merged over the inherited environment.
    pub extra_env: BTreeMap<String, OsString>,
    /// Kill the child after this long; wait forever when `None`.
    pub timeout: Option<Duration>,
}

impl RunnerCommand {
    /// Creates a command with no arguments.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            extra_env: BTreeMap::new(),
            timeout: None,
        }
    }

    /// Appends an argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Sets the working directory.
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Adds an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<OsString>) -> Self {
        self.extra_env.insert(key.into(), value.into());
        self
    }

    /// Sets the timeout.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the full argument vector, executable first.
    pub fn argv(&self) -> Vec<OsString> {
        std::iter::once(self.program.clone().into_os_string())
            .chain(self.args.iter().cloned())
            .collect()
    }

    /// Returns the executable for display.
    pub fn program_name(&self) -> String {
        self.program.display().to_string()
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }
        // `envs` merges over the inherited environment.
        cmd.envs(&self.extra_env);
        cmd.stdin(Stdio::null());
        cmd
    }
}

/// Strategy for executing a subprocess.
pub trait SubprocessRunner: Send + Sync {
    /// Runs the command to completion, failing on a non-zero exit.
    fn run(&self, cmd: &RunnerCommand) -> Result<(), RunnerError>;
}

impl<F> SubprocessRunner for F
where
    F: Fn(&RunnerCommand) -> Result<(), RunnerError> + Send + Sync,
{
    fn run(&self, cmd: &RunnerCommand) -> Result<(), RunnerError> {
        self(cmd)
    }
}

/// Captures stdout and stderr, reporting them only on failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuietRunner;

impl SubprocessRunner for QuietRunner {
    fn run(&self, cmd: &RunnerCommand) -> Result<(), RunnerError> {
        let program = cmd.program_name();
        debug!(program = %program, args = ?cmd.args, cwd = ?cmd.cwd, "Running hook subprocess (quiet)");

        let mut command = cmd.to_command();
        command.stdout(Stdio::piped()).stderr(Stdio::piped());
        let mut child = command.spawn().map_err(|source| RunnerError::Spawn {
            program: program.clone(),
            source,
        })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());
        // On timeout the drain threads are left to finish on their own.
        let status = wait_with_timeout(&mut child, cmd.timeout, &program)?;

        let mut output = collect(stdout);
        output.push_str(&collect(stderr));

        check_status(status, &program, output)
    }
}

/// Lets the child inherit the parent's stdout and stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct VerboseRunner;

impl SubprocessRunner for VerboseRunner {
    fn run(&self, cmd: &RunnerCommand) -> Result<(), RunnerError> {
        let program = cmd.program_name();
        debug!(program = %program, args = ?cmd.args, cwd = ?cmd.cwd, "Running hook subprocess (verbose)");

        let mut command = cmd.to_command();
        command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        let mut child = command.spawn().map_err(|source| RunnerError::Spawn {
            program: program.clone(),
            source,
        })?;

        let status = wait_with_timeout(&mut child, cmd.timeout, &program)?;
        check_status(status, &program, String::new())
    }
}

fn check_status(status: ExitStatus, program: &str, output: String) -> Result<(), RunnerError> {
    if status.success() {
        return Ok(());
    }
    let code = status.code().unwrap_or(-1);
    debug!(program, code, "Hook subprocess failed");
    Err(RunnerError::non_zero_exit(program, code, output))
}

/// Reads a child pipe to the end on a background thread so a full pipe
/// cannot stall the child.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|buf| String::from_utf8_lossy(&buf).into_owned())
        .unwrap_or_default()
}

/// Waits for a child process, killing it once `timeout` has elapsed.
fn wait_with_timeout(
    child: &mut Child,
    timeout: Option<Duration>,
    program: &str,
) -> Result<ExitStatus, RunnerError> {
    let wait_error = |source: std::io::Error| RunnerError::Wait {
        program: program.to_string(),
        source,
    };

    let Some(timeout) = timeout else {
        return child.wait().map_err(wait_error);
    };

    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {
                if start.elapsed() > timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(RunnerError::Timeout {
                        program: program.to_string(),
                        timeout,
                    });
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(e) => return Err(wait_error(e)),
        }
    }
}
