//! Logical-context scope stacks.
//!
//! Every logical flow of execution owns one [`ScopeStack`]. The ambient stack
//! is resolved in this order:
//!
//! 1. the stack installed for the current tokio task with
//!    [`ScopeStack::scope`], which follows the future across `.await` points
//!    and worker-thread hops but is not inherited by spawned tasks;
//! 2. inside any other tokio task, a stack keyed by the task's
//!    [`tokio::task::Id`], so sibling tasks on one worker stay apart and a
//!    task keeps its scopes when it moves to another worker;
//! 3. outside any task, the calling thread's own stack, created lazily on
//!    first use.
//!
//! Task-keyed stacks live in a process-wide table. An entry exists only while
//! its task has at least one scope open.

use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};
use tokio::task;

use crate::error::{DeferredLogError, DeferredResult};

tokio::task_local! {
    static TASK_SCOPES: ScopeStack;
}

thread_local! {
    static THREAD_SCOPES: ScopeStack = ScopeStack::new();
}

static TASK_KEYED: LazyLock<Mutex<HashMap<task::Id, Vec<Value>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

fn task_keyed() -> MutexGuard<'static, HashMap<task::Id, Vec<Value>>> {
    TASK_KEYED.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone)]
enum Storage {
    /// Stack owned by this handle and its clones.
    Shared(Arc<Mutex<Vec<Value>>>),
    /// Stack held in the task-keyed table for a tokio task.
    Task(task::Id),
}

/// Ordered stack of active scope states for one logical context, innermost last.
///
/// Cloning a `ScopeStack` yields another handle to the same context. Use
/// [`ScopeStack::fork`] to start an independent child context.
#[derive(Debug, Clone)]
pub struct ScopeStack {
    storage: Storage,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self {
            storage: Storage::Shared(Arc::default()),
        }
    }
}

impl ScopeStack {
    /// Create a new, empty logical context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The ambient stack for the calling task or thread.
    #[must_use]
    pub fn current() -> Self {
        if let Ok(stack) = TASK_SCOPES.try_with(Self::clone) {
            return stack;
        }
        if let Some(id) = task::try_id() {
            return Self {
                storage: Storage::Task(id),
            };
        }
        THREAD_SCOPES.try_with(Self::clone).unwrap_or_default()
    }

    /// Run `future` with this stack as its ambient logical context.
    pub async fn scope<F: Future>(self, future: F) -> F::Output {
        TASK_SCOPES.scope(self, future).await
    }

    /// Run `f` synchronously with this stack as the ambient logical context.
    pub fn sync_scope<R>(self, f: impl FnOnce() -> R) -> R {
        TASK_SCOPES.sync_scope(self, f)
    }

    /// Create an independent stack seeded with this stack's current states.
    ///
    /// Scopes begun on the fork are not visible here, and vice versa.
    #[must_use]
    pub fn fork(&self) -> Self {
        Self {
            storage: Storage::Shared(Arc::new(Mutex::new(self.snapshot()))),
        }
    }

    /// Push `state` and return the handle that releases it.
    ///
    /// # Errors
    ///
    /// Returns [`DeferredLogError::InvalidArgument`] if `state` is null.
    pub fn begin(&self, state: impl Into<Value>) -> DeferredResult<ScopeHandle> {
        let state = state.into();
        if state.is_null() {
            return Err(DeferredLogError::InvalidArgument(
                "scope state must not be null".to_string(),
            ));
        }
        self.with_states(|states| states.push(state.clone()));
        Ok(ScopeHandle {
            stack: self.clone(),
            state,
        })
    }

    /// Active scope states, outermost first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Value> {
        self.with_states(|states| states.clone())
    }

    /// Pop the innermost state, if any.
    ///
    /// The popped state is not checked against any handle; callers are
    /// expected to release scopes in reverse order of acquisition.
    pub fn release(&self) -> Option<Value> {
        self.with_states(Vec::pop)
    }

    /// Number of active scopes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.with_states(|states| states.len())
    }

    /// Whether no scope is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.with_states(|states| states.is_empty())
    }

    fn with_states<R>(&self, f: impl FnOnce(&mut Vec<Value>) -> R) -> R {
        match &self.storage {
            Storage::Shared(states) => {
                f(&mut states.lock().unwrap_or_else(PoisonError::into_inner))
            },
            Storage::Task(id) => {
                let mut table = task_keyed();
                let states = table.entry(*id).or_default();
                let out = f(states);
                if states.is_empty() {
                    table.remove(id);
                }
                out
            },
        }
    }
}

/// Run `future` inside a fresh, empty logical context.
pub async fn in_new_context<F: Future>(future: F) -> F::Output {
    ScopeStack::new().scope(future).await
}

/// An active scope. Dropping the handle releases the scope.
#[derive(Debug)]
#[must_use = "dropping a ScopeHandle immediately ends the scope"]
pub struct ScopeHandle {
    stack: ScopeStack,
    state: Value,
}

impl ScopeHandle {
    /// The state this scope was begun with.
    #[must_use]
    pub fn state(&self) -> &Value {
        &self.state
    }

    /// End the scope now.
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for ScopeHandle {
    fn drop(&mut self) {
        self.stack.release();
    }
}
