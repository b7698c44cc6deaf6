//! Algorithm lifecycle: state machine, deadline, cancel and shutdown.
//!
//! # States
//!
//! ```text
//! Created --activate()--> Active --terminate()--> Inactive
//! ```
//!
//! `Inactive` is terminal; entering it again is a no-op.
//!
//! # Interruptible points
//!
//! Owners call [`AlgorithmLifecycle::check_and_conduct_termination`] wherever
//! the algorithm may stop. The checks run in a fixed order and the first match
//! wins: foreign interrupt, then timeout, then cancellation.
//!
//! # Cross-thread surface
//!
//! Only [`CancelHandle`] and the interrupt registry are shared between
//! threads. Everything else is owned by the driver thread.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use crate::config::LifecycleConfig;
use crate::error::{AlgorithmError, GuardedError, Interruption, LifecycleViolation};
use crate::guard::{DeadlineGuard, DeadlineTimer};
use crate::interrupt::{lock, InterruptFlag, InterruptReason, InterruptRegistry};

static NEXT_ALGORITHM: AtomicU64 = AtomicU64::new(0);

/// Process-unique algorithm identifier. Also keys the shutdown interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AlgorithmId(u64);

impl AlgorithmId {
    fn next() -> Self {
        Self(NEXT_ALGORITHM.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for AlgorithmId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "algorithm-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgorithmState {
    Created,
    Active,
    Inactive,
}

impl std::fmt::Display for AlgorithmState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Active => "active",
            Self::Inactive => "inactive",
        };
        f.write_str(name)
    }
}

/// Lifecycle transitions reported to the owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Initialized { algorithm: AlgorithmId },
    Finished { algorithm: AlgorithmId },
}

/// State shared with other threads.
#[derive(Debug)]
struct ControlBlock {
    id: AlgorithmId,
    registry: Arc<InterruptRegistry>,
    cancel_requested: AtomicBool,
    canceled_at: OnceLock<Instant>,
    shutdown_done: AtomicBool,
    active_threads: Mutex<Vec<ThreadId>>,
    /// Threads tagged by this algorithm's shutdown.
    interrupted: Mutex<Vec<ThreadId>>,
}

impl ControlBlock {
    fn shutdown_reason(&self) -> InterruptReason {
        InterruptReason::Shutdown(self.id)
    }

    fn cancel(&self) -> bool {
        self.canceled_at.get_or_init(Instant::now);
        if self.cancel_requested.swap(true, Ordering::SeqCst) {
            return false;
        }
        tracing::debug!(algorithm = %self.id, "cancel requested");
        self.shutdown();
        true
    }

    fn is_canceled(&self) -> bool {
        self.cancel_requested.load(Ordering::SeqCst)
    }

    fn shutdown(&self) -> bool {
        if self.shutdown_done.swap(true, Ordering::SeqCst) {
            return false;
        }
        let reason = self.shutdown_reason();
        let threads = lock(&self.active_threads).clone();
        tracing::debug!(algorithm = %self.id, threads = threads.len(), "shutting down");
        for thread in threads {
            self.interrupt_for_shutdown(thread, reason.clone());
        }
        true
    }

    fn interrupt_for_shutdown(&self, thread: ThreadId, reason: InterruptReason) {
        {
            let mut interrupted = lock(&self.interrupted);
            if !interrupted.contains(&thread) {
                interrupted.push(thread);
            }
        }
        self.registry.interrupt(thread, reason);
    }

    /// Resolve this algorithm's shutdown interrupt on `thread` and lower the
    /// flag if nothing else is pending there.
    fn withdraw_shutdown(&self, thread: ThreadId) {
        if self.registry.resolve(thread, &self.shutdown_reason()).is_some()
            && self.registry.unresolved_for(thread).is_empty()
        {
            self.registry.clear_interrupt(thread);
        }
    }
}

impl Drop for ControlBlock {
    fn drop(&mut self) {
        // Nobody can observe this algorithm's shutdown any more. Withdraw it
        // from threads that never acknowledged it, then release them.
        let interrupted = std::mem::take(&mut *lock(&self.interrupted));
        for thread in interrupted {
            self.withdraw_shutdown(thread);
            self.registry.release(thread);
        }
    }
}

/// Cancels an algorithm from any thread.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    control: Arc<ControlBlock>,
}

impl CancelHandle {
    /// Request cancellation. Returns `true` only for the first caller.
    pub fn cancel(&self) -> bool {
        self.control.cancel()
    }

    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.control.is_canceled()
    }

    #[must_use]
    pub fn algorithm(&self) -> AlgorithmId {
        self.control.id
    }
}

/// Execution lifecycle owned by one algorithm instance.
#[derive(Debug)]
pub struct AlgorithmLifecycle {
    config: LifecycleConfig,
    control: Arc<ControlBlock>,
    state: AlgorithmState,
    activated_at: Option<Instant>,
    deadline: Option<Instant>,
    timed_out_at: OnceLock<Instant>,
    /// Started by the first guarded call under a deadline.
    timer: OnceLock<DeadlineTimer>,
}

impl AlgorithmLifecycle {
    /// Lifecycle using the process-wide interrupt registry.
    #[must_use]
    pub fn new(config: LifecycleConfig) -> Self {
        Self::with_registry(config, InterruptRegistry::global())
    }

    #[must_use]
    pub fn with_registry(config: LifecycleConfig, registry: Arc<InterruptRegistry>) -> Self {
        Self {
            config,
            control: Arc::new(ControlBlock {
                id: AlgorithmId::next(),
                registry,
                cancel_requested: AtomicBool::new(false),
                canceled_at: OnceLock::new(),
                shutdown_done: AtomicBool::new(false),
                active_threads: Mutex::new(Vec::new()),
                interrupted: Mutex::new(Vec::new()),
            }),
            state: AlgorithmState::Created,
            activated_at: None,
            deadline: None,
            timed_out_at: OnceLock::new(),
            timer: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> AlgorithmId {
        self.control.id
    }

    #[must_use]
    pub fn state(&self) -> AlgorithmState {
        self.state
    }

    #[must_use]
    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<InterruptRegistry> {
        &self.control.registry
    }

    #[must_use]
    pub fn activated_at(&self) -> Option<Instant> {
        self.activated_at
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            control: Arc::clone(&self.control),
        }
    }

    /// `Created -> Active`. Registers the calling thread as the driver.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleViolation`] unless the lifecycle is `Created`.
    pub fn activate(&mut self) -> Result<LifecycleEvent, LifecycleViolation> {
        if self.state != AlgorithmState::Created {
            return Err(LifecycleViolation {
                operation: "activate",
                state: self.state,
            });
        }
        let now = Instant::now();
        self.activated_at = Some(now);
        self.deadline = self.config.effective_timeout().map(|t| now + t);
        self.register_active_thread();
        self.state = AlgorithmState::Active;
        tracing::debug!(algorithm = %self.id(), deadline_in = ?self.config.effective_timeout(), "activated");
        Ok(LifecycleEvent::Initialized {
            algorithm: self.id(),
        })
    }

    /// Enter `Inactive`. Returns the `Finished` event on the first call only.
    ///
    /// Runs shutdown so registered worker threads unwind, stops the deadline
    /// timer, and unregisters the calling thread.
    pub fn terminate(&mut self) -> Option<LifecycleEvent> {
        if self.state == AlgorithmState::Inactive {
            return None;
        }
        self.state = AlgorithmState::Inactive;
        self.unregister_active_thread();
        self.shutdown();
        drop(self.timer.take());
        tracing::debug!(algorithm = %self.id(), "terminated");
        Some(LifecycleEvent::Finished {
            algorithm: self.id(),
        })
    }

    /// Register the calling thread for shutdown interrupts.
    ///
    /// A thread registering after shutdown already ran is interrupted at once.
    pub fn register_active_thread(&self) {
        let me = thread::current().id();
        {
            let mut threads = lock(&self.control.active_threads);
            if !threads.contains(&me) {
                threads.push(me);
            }
        }
        if self.control.shutdown_done.load(Ordering::SeqCst) {
            self.control
                .interrupt_for_shutdown(me, self.control.shutdown_reason());
        }
    }

    /// Stop receiving shutdown interrupts on the calling thread.
    ///
    /// A pending shutdown interrupt of this algorithm is withdrawn, and the
    /// thread is released from the registry if nothing else is pending on it.
    pub fn unregister_active_thread(&self) {
        let me = thread::current().id();
        lock(&self.control.active_threads).retain(|t| *t != me);
        self.control.withdraw_shutdown(me);
        self.control.registry.release(me);
    }

    /// Whether the deadline has passed. The first positive answer is latched.
    pub fn is_timed_out(&self) -> bool {
        if self.timed_out_at.get().is_some() {
            return true;
        }
        match self.deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    self.timed_out_at.get_or_init(|| now);
                    true
                } else {
                    false
                }
            }
            None => false,
        }
    }

    /// The instant the timeout was first detected.
    #[must_use]
    pub fn timed_out_at(&self) -> Option<Instant> {
        self.timed_out_at.get().copied()
    }

    /// Time left until the deadline, or `None` without a deadline.
    #[must_use]
    pub fn remaining_time(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Request cancellation. Returns `true` only for the first caller.
    pub fn cancel(&self) -> bool {
        self.control.cancel()
    }

    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.control.is_canceled()
    }

    /// Interrupt every registered thread under this algorithm's shutdown
    /// reason. Returns `true` only for the first call.
    pub fn shutdown(&self) -> bool {
        self.control.shutdown()
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.control.shutdown_done.load(Ordering::SeqCst)
    }

    /// Raise the first pending termination signal, if any.
    ///
    /// # Errors
    ///
    /// - [`AlgorithmError::Interrupted`] if the calling thread carries an
    ///   interrupt this algorithm did not issue (the flag is cleared first)
    /// - [`AlgorithmError::Timeout`] if the deadline passed
    /// - [`AlgorithmError::Canceled`] if cancellation was requested
    pub fn check_and_conduct_termination(&self) -> Result<(), AlgorithmError> {
        let me = thread::current().id();
        let registry = &self.control.registry;
        let own = self.control.shutdown_reason();

        if registry.is_interrupted(me) && !registry.has_unresolved(me, &own) {
            registry.clear_interrupt(me);
            if self.config.shutdown_on_termination {
                self.shutdown();
            }
            tracing::debug!(algorithm = %self.id(), "foreign interrupt observed");
            return Err(AlgorithmError::Interrupted);
        }

        if self.is_timed_out() {
            if self.config.shutdown_on_termination {
                self.shutdown();
            }
            let overrun = self.overrun();
            tracing::debug!(algorithm = %self.id(), ?overrun, "timeout observed");
            return Err(AlgorithmError::Timeout { overrun });
        }

        if self.is_canceled() {
            self.control.withdraw_shutdown(me);
            let since_cancel = self
                .control
                .canceled_at
                .get()
                .map_or(Duration::ZERO, Instant::elapsed);
            tracing::debug!(algorithm = %self.id(), ?since_cancel, "cancellation observed");
            return Err(AlgorithmError::Canceled { since_cancel });
        }

        Ok(())
    }

    /// Run `work` under a deadline guard.
    ///
    /// The guard interrupts the calling thread `timeout_precaution_offset`
    /// before the deadline. `work` receives the calling thread's flag and is
    /// expected to report an interruption through its error type. The guard
    /// is disarmed on every exit path.
    ///
    /// # Errors
    ///
    /// - [`GuardedError::Terminated`] if the interruption came from the guard,
    ///   or if a termination signal is pending when `work` reports one
    /// - [`GuardedError::Work`] for any other failure of `work`, including an
    ///   interruption the lifecycle cannot attribute
    pub fn compute_timeout_aware<T, E, F>(&self, work: F) -> Result<T, GuardedError<E>>
    where
        F: FnOnce(&InterruptFlag) -> Result<T, E>,
        E: Interruption,
    {
        let me = thread::current().id();
        let flag = self.control.registry.flag_for(me);
        let guard = self.remaining_time().map(|remaining| {
            let delay = remaining.saturating_sub(self.config.timeout_precaution_offset);
            self.timer().arm(me, delay)
        });

        let result = match work(&flag) {
            Ok(value) => Ok(value),
            Err(err) if err.is_interruption() => Err(self.attribute_interrupt(me, guard.as_ref(), err)),
            Err(err) => Err(GuardedError::Work(err)),
        };
        drop(guard);
        result
    }

    fn timer(&self) -> &DeadlineTimer {
        self.timer
            .get_or_init(|| DeadlineTimer::spawn(Arc::clone(&self.control.registry)))
    }

    fn attribute_interrupt<E>(
        &self,
        me: ThreadId,
        guard: Option<&DeadlineGuard<'_>>,
        err: E,
    ) -> GuardedError<E> {
        let registry = &self.control.registry;
        if let Some(guard) = guard {
            if registry.resolve(me, guard.reason()).is_some() {
                if registry.unresolved_for(me).is_empty() {
                    registry.clear_interrupt(me);
                }
                // The guard fires ahead of the deadline; its firing is the moment of timeout.
                self.timed_out_at.get_or_init(Instant::now);
                tracing::debug!(algorithm = %self.id(), "guarded work stopped by deadline guard");
                return match self.check_and_conduct_termination() {
                    Err(signal) => GuardedError::Terminated(signal),
                    Ok(()) => GuardedError::Terminated(AlgorithmError::Timeout {
                        overrun: self.overrun(),
                    }),
                };
            }
        }
        match self.check_and_conduct_termination() {
            Err(signal) => GuardedError::Terminated(signal),
            Ok(()) => GuardedError::Work(err),
        }
    }

    fn overrun(&self) -> Duration {
        self.deadline
            .map_or(Duration::ZERO, |d| Instant::now().saturating_duration_since(d))
    }
}
