//! Interrupt registry: tagged, per-thread cooperative interrupts.
//!
//! Rust threads cannot be interrupted from the outside. Every thread that
//! takes part in an algorithm instead owns an [`InterruptFlag`], and blocking
//! work waits on that flag (see [`InterruptFlag::sleep`]). The registry maps
//! threads to their flags and additionally records *why* a thread was
//! interrupted, keyed by `(thread, reason)`. That record is what lets a
//! lifecycle tell its own deadline guard or shutdown apart from an interrupt
//! raised by somebody else.
//!
//! A raised flag stays raised until somebody clears it. Waking from
//! [`InterruptFlag::sleep`] does not consume it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::lifecycle::AlgorithmId;

/// Raised by interruptible waits when the waiting thread's flag is up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("thread was interrupted")]
pub struct Interrupted;

/// Why a thread was interrupted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InterruptReason {
    /// Shutdown of the algorithm with the given id.
    Shutdown(AlgorithmId),
    /// A deadline guard, identified by its sequence number.
    DeadlineGuard(u64),
    /// Caller-defined reason.
    Custom(String),
}

impl std::fmt::Display for InterruptReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shutdown(id) => write!(f, "shutdown of {id}"),
            Self::DeadlineGuard(seq) => write!(f, "deadline guard #{seq}"),
            Self::Custom(label) => write!(f, "{label}"),
        }
    }
}

/// An interrupt that has been issued but not yet resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interrupt {
    pub thread: ThreadId,
    pub reason: InterruptReason,
    pub issued_at: Instant,
}

#[derive(Debug, Default)]
struct FlagInner {
    raised: Mutex<bool>,
    wakeup: Condvar,
}

/// A thread's interrupt status.
///
/// Cloning yields another handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag {
    inner: Arc<FlagInner>,
}

impl InterruptFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_raised(&self) -> bool {
        *lock(&self.inner.raised)
    }

    /// Raise the flag and wake every thread sleeping on it.
    pub fn raise(&self) {
        let mut raised = lock(&self.inner.raised);
        *raised = true;
        self.inner.wakeup.notify_all();
    }

    /// Lower the flag. Returns whether it was raised.
    pub fn clear(&self) -> bool {
        std::mem::replace(&mut *lock(&self.inner.raised), false)
    }

    /// Fail fast if the flag is raised.
    ///
    /// # Errors
    ///
    /// Returns [`Interrupted`] if the flag is up.
    pub fn check(&self) -> Result<(), Interrupted> {
        if self.is_raised() {
            Err(Interrupted)
        } else {
            Ok(())
        }
    }

    /// Block for `duration`, returning early if the flag is raised.
    ///
    /// # Errors
    ///
    /// Returns [`Interrupted`] if the flag is up on entry or gets raised
    /// while waiting.
    pub fn sleep(&self, duration: Duration) -> Result<(), Interrupted> {
        let until = Instant::now() + duration;
        let mut raised = lock(&self.inner.raised);
        loop {
            if *raised {
                return Err(Interrupted);
            }
            let now = Instant::now();
            if now >= until {
                return Ok(());
            }
            let (guard, _) = self
                .inner
                .wakeup
                .wait_timeout(raised, until - now)
                .unwrap_or_else(PoisonError::into_inner);
            raised = guard;
        }
    }
}

/// Table of thread flags and unresolved tagged interrupts.
///
/// One process-wide instance is available through [`InterruptRegistry::global`];
/// tests construct private registries to stay isolated.
#[derive(Debug, Default)]
pub struct InterruptRegistry {
    flags: Mutex<HashMap<ThreadId, InterruptFlag>>,
    unresolved: Mutex<HashMap<(ThreadId, InterruptReason), Interrupt>>,
    issued: AtomicU64,
}

impl InterruptRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    #[must_use]
    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<InterruptRegistry>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Self::new())))
    }

    /// The flag of `thread`, created lowered on first use.
    #[must_use]
    pub fn flag_for(&self, thread: ThreadId) -> InterruptFlag {
        lock(&self.flags).entry(thread).or_default().clone()
    }

    /// The flag of the calling thread.
    #[must_use]
    pub fn current_flag(&self) -> InterruptFlag {
        self.flag_for(thread::current().id())
    }

    /// Interrupt `thread`, tagging the interrupt with `reason`.
    ///
    /// The tag is recorded before the flag goes up, so a woken thread always
    /// finds it.
    pub fn interrupt(&self, thread: ThreadId, reason: InterruptReason) {
        let record = Interrupt {
            thread,
            reason: reason.clone(),
            issued_at: Instant::now(),
        };
        lock(&self.unresolved).insert((thread, reason), record);
        self.issued.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(?thread, "tagged interrupt issued");
        self.flag_for(thread).raise();
    }

    /// Interrupt `thread` without a reason, as an outside party would.
    pub fn interrupt_untagged(&self, thread: ThreadId) {
        self.issued.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(?thread, "untagged interrupt issued");
        self.flag_for(thread).raise();
    }

    #[must_use]
    pub fn is_interrupted(&self, thread: ThreadId) -> bool {
        lock(&self.flags)
            .get(&thread)
            .is_some_and(InterruptFlag::is_raised)
    }

    /// Lower the flag of `thread`. Returns whether it was raised.
    pub fn clear_interrupt(&self, thread: ThreadId) -> bool {
        lock(&self.flags)
            .get(&thread)
            .is_some_and(InterruptFlag::clear)
    }

    /// Forget `thread` if nothing is pending on it: its flag is lowered and
    /// it has no unresolved interrupt. Returns whether the entry was removed.
    ///
    /// A later interrupt or [`InterruptRegistry::flag_for`] call creates a
    /// fresh flag, so callers must not keep waiting on a released one.
    pub fn release(&self, thread: ThreadId) -> bool {
        let unresolved = lock(&self.unresolved);
        if unresolved.keys().any(|(t, _)| *t == thread) {
            return false;
        }
        let mut flags = lock(&self.flags);
        match flags.get(&thread) {
            Some(flag) if !flag.is_raised() => {
                flags.remove(&thread);
                tracing::trace!(?thread, "thread released from interrupt registry");
                true
            }
            _ => false,
        }
    }

    /// Whether `thread` carries an unresolved interrupt tagged with `reason`.
    #[must_use]
    pub fn has_unresolved(&self, thread: ThreadId, reason: &InterruptReason) -> bool {
        lock(&self.unresolved).contains_key(&(thread, reason.clone()))
    }

    /// Mark the interrupt `(thread, reason)` as handled.
    ///
    /// Leaves the thread flag untouched; callers clear it themselves once
    /// they know no other interrupt is pending.
    pub fn resolve(&self, thread: ThreadId, reason: &InterruptReason) -> Option<Interrupt> {
        lock(&self.unresolved).remove(&(thread, reason.clone()))
    }

    /// All unresolved interrupts of `thread`, oldest first.
    #[must_use]
    pub fn unresolved_for(&self, thread: ThreadId) -> Vec<Interrupt> {
        let mut pending: Vec<Interrupt> = lock(&self.unresolved)
            .values()
            .filter(|i| i.thread == thread)
            .cloned()
            .collect();
        pending.sort_by_key(|i| i.issued_at);
        pending
    }

    /// Number of threads that currently own a flag in this registry.
    #[must_use]
    pub fn tracked_threads(&self) -> usize {
        lock(&self.flags).len()
    }

    /// Number of unresolved interrupts across all threads.
    #[must_use]
    pub fn unresolved_count(&self) -> usize {
        lock(&self.unresolved).len()
    }

    /// Total number of interrupts issued through this registry.
    #[must_use]
    pub fn issued_count(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
