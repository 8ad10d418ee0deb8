//! Scoped runner overrides.
//!
//! [`HookCaller::subprocess_runner`] swaps the active runner until the
//! returned guard drops. The previous runner is restored on every exit from
//! the scope: normal return, `?`, or a panic unwinding through it.
//!
//! The guard holds the caller's mutable borrow, so a second override can only
//! be taken through the first guard and guards are released in LIFO order:
//!
//! ```compile_fail
//! use std::sync::Arc;
//! use pyhooks::{BackendRef, HookCaller, QuietRunner, VerboseRunner};
//!
//! let mut hooks = HookCaller::new(".", BackendRef::new("buildsys")).unwrap();
//! let outer = hooks.subprocess_runner(Arc::new(QuietRunner));
//! let inner = hooks.subprocess_runner(Arc::new(VerboseRunner));
//! drop(outer);
//! drop(inner);
//! ```

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::caller::HookCaller;
use crate::runner::SubprocessRunner;

/// Guard restoring the previous runner when dropped.
#[must_use = "the override ends as soon as the guard is dropped"]
pub struct RunnerOverride<'a> {
    caller: &'a mut HookCaller,
}

impl Deref for RunnerOverride<'_> {
    type Target = HookCaller;

    fn deref(&self) -> &HookCaller {
        self.caller
    }
}

impl DerefMut for RunnerOverride<'_> {
    fn deref_mut(&mut self) -> &mut HookCaller {
        self.caller
    }
}

impl Drop for RunnerOverride<'_> {
    fn drop(&mut self) {
        self.caller.pop_runner();
    }
}

impl HookCaller {
    /// Routes calls through `runner` until the returned guard is dropped.
    ///
    /// Overrides nest through the guard; each guard restores the runner that
    /// was active when it was created.
    pub fn subprocess_runner(&mut self, runner: Arc<dyn SubprocessRunner>) -> RunnerOverride<'_> {
        self.push_runner(runner);
        RunnerOverride { caller: self }
    }

    /// Runs `f` with `runner` active, restoring the previous runner afterwards.
    pub fn with_subprocess_runner<T>(
        &mut self,
        runner: Arc<dyn SubprocessRunner>,
        f: impl FnOnce(&mut HookCaller) -> T,
    ) -> T {
        let mut guard = self.subprocess_runner(runner);
        f(&mut *guard)
    }
}
