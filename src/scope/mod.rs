//! Isolation scopes.
//!
//! Every execution context owns its own [`Scope`], and with it its own
//! [`FlagBuffer`]. There is no process-wide buffer:
//!
//! - each thread lazily gets a root scope configured by [`init`];
//! - [`spawn`] hands a fork of the caller's scope to a new thread;
//! - [`isolated`] and [`spawn_task`] give a tokio task a forked scope that
//!   overrides the thread's scope for as long as the task runs;
//! - [`with_isolation_scope`] forks for the duration of a closure.
//!
//! Evaluations recorded after a fork are only visible in the scope that
//! recorded them.
//!
//! The functions here borrow the current scope through a `RefCell`, so
//! they must not be called from inside a [`configure_scope`] closure.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::buffer::FlagBuffer;
use crate::types::config::{FlagsConfig, DEFAULT_FLAG_CAPACITY};
use crate::types::flags::FlagsContext;
use crate::{FlagError, FlagResult};

static ROOT_CAPACITY: AtomicUsize = AtomicUsize::new(DEFAULT_FLAG_CAPACITY);
static ROOT_ENABLED: AtomicBool = AtomicBool::new(true);

thread_local! {
    static THREAD_SCOPE: RefCell<Scope> = RefCell::new(Scope::root());
}

tokio::task_local! {
    static TASK_SCOPE: RefCell<Scope>;
}

/// Sets the buffer settings used by root scopes created from now on.
///
/// Scopes that already exist, and forks of them, keep their settings.
pub fn init(config: &FlagsConfig) -> FlagResult<()> {
    if config.capacity == 0 {
        return Err(FlagError::InvalidCapacity(0));
    }

    ROOT_CAPACITY.store(config.capacity, Ordering::Relaxed);
    ROOT_ENABLED.store(config.enabled, Ordering::Relaxed);

    tracing::debug!(
        capacity = config.capacity,
        enabled = config.enabled,
        "Flag scopes configured"
    );
    Ok(())
}

/// The per-context state attached to reports: recent flag evaluations and
/// tags.
#[derive(Debug, Clone)]
pub struct Scope {
    flags: FlagBuffer,
    tags: BTreeMap<String, String>,
    enabled: bool,
}

impl Scope {
    /// Creates an empty scope whose buffer holds up to `capacity` flags.
    pub fn new(capacity: usize) -> FlagResult<Self> {
        Ok(Self {
            flags: FlagBuffer::new(capacity)?,
            tags: BTreeMap::new(),
            enabled: true,
        })
    }

    /// Creates an empty scope from configuration.
    pub fn from_config(config: &FlagsConfig) -> FlagResult<Self> {
        let mut scope = Self::new(config.capacity)?;
        scope.enabled = config.enabled;
        Ok(scope)
    }

    fn root() -> Self {
        let flags = FlagBuffer::new(ROOT_CAPACITY.load(Ordering::Relaxed))
            .unwrap_or_else(|_| FlagBuffer::with_default_capacity());
        Self {
            flags,
            tags: BTreeMap::new(),
            enabled: ROOT_ENABLED.load(Ordering::Relaxed),
        }
    }

    /// Records a flag evaluation. Does nothing when recording is disabled.
    pub fn record_evaluation(&self, name: &str, result: bool) {
        if self.enabled {
            self.flags.set(name, result);
        }
    }

    /// The scope's flag buffer.
    pub fn flags(&self) -> &FlagBuffer {
        &self.flags
    }

    /// Recorded evaluations, oldest first, as a report context.
    pub fn flags_context(&self) -> FlagsContext {
        self.flags.to_context()
    }

    /// Whether evaluations are recorded in this scope.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Sets a tag, replacing any previous value for `key`.
    pub fn set_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(key.into(), value.into());
    }

    /// Removes a tag and returns its value.
    pub fn remove_tag(&mut self, key: &str) -> Option<String> {
        self.tags.remove(key)
    }

    /// Tags copied into every report built from this scope.
    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    /// Independent copy of this scope: same flags in the same order, same
    /// tags and settings.
    pub fn fork(&self) -> Self {
        self.clone()
    }
}

fn in_task_scope() -> bool {
    TASK_SCOPE.try_with(|_| ()).is_ok()
}

/// Runs `f` with the current scope.
pub fn with_current<R>(f: impl FnOnce(&Scope) -> R) -> R {
    if in_task_scope() {
        TASK_SCOPE.with(|scope| f(&scope.borrow()))
    } else {
        THREAD_SCOPE.with(|scope| f(&scope.borrow()))
    }
}

/// Runs `f` with mutable access to the current scope.
pub fn configure_scope<R>(f: impl FnOnce(&mut Scope) -> R) -> R {
    if in_task_scope() {
        TASK_SCOPE.with(|scope| f(&mut scope.borrow_mut()))
    } else {
        THREAD_SCOPE.with(|scope| f(&mut scope.borrow_mut()))
    }
}

fn replace_current(scope: Scope) -> Scope {
    configure_scope(|current| std::mem::replace(current, scope))
}

/// A fork of the current scope.
pub fn fork_current() -> Scope {
    with_current(Scope::fork)
}

/// Records a flag evaluation in the current scope.
pub fn record_evaluation(name: &str, result: bool) {
    with_current(|scope| scope.record_evaluation(name, result));
}

/// Snapshot of the current scope's flags, oldest first.
pub fn build_flags_context() -> FlagsContext {
    with_current(Scope::flags_context)
}

/// Sets a tag on the current scope.
pub fn set_tag(key: impl Into<String>, value: impl Into<String>) {
    configure_scope(|scope| scope.set_tag(key, value));
}

struct RestoreScope(Option<Scope>);

impl Drop for RestoreScope {
    fn drop(&mut self) {
        if let Some(previous) = self.0.take() {
            replace_current(previous);
        }
    }
}

/// Runs `f` with `scope` installed as the current scope, then puts the
/// previous scope back, also on unwind.
pub fn with_scope<R>(scope: Scope, f: impl FnOnce() -> R) -> R {
    let _restore = RestoreScope(Some(replace_current(scope)));
    f()
}

/// Runs `f` in a fork of the current scope.
pub fn with_isolation_scope<R>(f: impl FnOnce() -> R) -> R {
    with_scope(fork_current(), f)
}

/// Spawns a thread that starts with a fork of the caller's scope.
pub fn spawn<F, T>(f: F) -> std::thread::JoinHandle<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let scope = fork_current();
    std::thread::spawn(move || with_scope(scope, f))
}

/// Wraps `future` so it runs in a fork of the caller's scope.
///
/// The fork is taken when `isolated` is called, not when the future is
/// first polled.
pub fn isolated<F: Future>(future: F) -> impl Future<Output = F::Output> {
    TASK_SCOPE.scope(RefCell::new(fork_current()), future)
}

/// Spawns a tokio task that runs in a fork of the caller's scope.
pub fn spawn_task<F>(future: F) -> tokio::task::JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(isolated(future))
}
