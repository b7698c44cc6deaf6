//! Deadline timer: one long-lived thread that delivers tagged deadline
//! interrupts.
//!
//! The timer keeps the armed deadlines and waits on its command channel until
//! the earliest one. [`DeadlineTimer::arm`] returns a [`DeadlineGuard`];
//! dropping the guard disarms it and waits for the timer to acknowledge, so a
//! disarmed guard never fires afterwards. Dropping the timer disconnects the
//! channel, which ends the thread, and joins it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};

use crate::interrupt::{InterruptReason, InterruptRegistry};

static NEXT_GUARD: AtomicU64 = AtomicU64::new(0);

#[derive(Debug)]
struct Armed {
    seq: u64,
    reason: InterruptReason,
    target: ThreadId,
    at: Instant,
}

#[derive(Debug)]
enum Command {
    Arm(Armed),
    Disarm { seq: u64, ack: Sender<()> },
}

/// Timer thread shared by every guard armed through it.
#[derive(Debug)]
pub struct DeadlineTimer {
    registry: Arc<InterruptRegistry>,
    commands: Option<Sender<Command>>,
    thread: Option<JoinHandle<()>>,
}

impl DeadlineTimer {
    /// Start a timer that interrupts through `registry`.
    #[must_use]
    pub fn spawn(registry: Arc<InterruptRegistry>) -> Self {
        let (commands, received) = unbounded();
        let thread = {
            let registry = Arc::clone(&registry);
            thread::spawn(move || run_timer(&registry, &received))
        };
        tracing::trace!("deadline timer started");
        Self {
            registry,
            commands: Some(commands),
            thread: Some(thread),
        }
    }

    /// Arm a guard that interrupts `target` after `delay`.
    #[must_use]
    pub fn arm(&self, target: ThreadId, delay: Duration) -> DeadlineGuard<'_> {
        let seq = NEXT_GUARD.fetch_add(1, Ordering::Relaxed);
        let reason = InterruptReason::DeadlineGuard(seq);
        let armed = Armed {
            seq,
            reason: reason.clone(),
            target,
            at: Instant::now() + delay,
        };
        let sent = self
            .commands
            .as_ref()
            .is_some_and(|commands| commands.send(Command::Arm(armed)).is_ok());
        if sent {
            tracing::trace!(%reason, ?delay, "deadline guard armed");
        } else {
            tracing::warn!(%reason, "deadline timer is gone, guard will not fire");
        }
        DeadlineGuard {
            timer: self,
            seq,
            reason,
            target,
        }
    }

    /// Id of the timer thread.
    #[must_use]
    pub fn thread_id(&self) -> Option<ThreadId> {
        self.thread.as_ref().map(|t| t.thread().id())
    }

    fn disarm(&self, seq: u64) {
        let Some(commands) = &self.commands else {
            return;
        };
        let (ack, acked) = bounded(1);
        if commands.send(Command::Disarm { seq, ack }).is_ok() && acked.recv().is_err() {
            tracing::warn!(seq, "deadline timer stopped before acknowledging disarm");
        }
    }
}

impl Drop for DeadlineTimer {
    fn drop(&mut self) {
        drop(self.commands.take());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("deadline timer panicked");
            }
        }
    }
}

fn run_timer(registry: &InterruptRegistry, commands: &Receiver<Command>) {
    let mut armed: Vec<Armed> = Vec::new();
    loop {
        let next = armed.iter().map(|a| a.at).min();
        let received = match next {
            Some(at) => commands.recv_deadline(at),
            None => commands.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match received {
            Ok(Command::Arm(entry)) => armed.push(entry),
            Ok(Command::Disarm { seq, ack }) => {
                armed.retain(|a| a.seq != seq);
                ack.send(()).ok();
            }
            Err(RecvTimeoutError::Timeout) => {
                let now = Instant::now();
                let (due, pending): (Vec<_>, Vec<_>) =
                    armed.into_iter().partition(|a| a.at <= now);
                armed = pending;
                for fired in due {
                    tracing::debug!(reason = %fired.reason, "deadline guard fired");
                    registry.interrupt(fired.target, fired.reason);
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    tracing::trace!("deadline timer stopped");
}

/// A scheduled interrupt of one thread, disarmed on drop.
#[derive(Debug)]
pub struct DeadlineGuard<'t> {
    timer: &'t DeadlineTimer,
    seq: u64,
    reason: InterruptReason,
    target: ThreadId,
}

impl DeadlineGuard<'_> {
    /// The reason tag this guard interrupts with.
    #[must_use]
    pub fn reason(&self) -> &InterruptReason {
        &self.reason
    }

    /// Whether the guard fired and its interrupt is still unresolved.
    #[must_use]
    pub fn has_fired(&self) -> bool {
        self.timer.registry.has_unresolved(self.target, &self.reason)
    }
}

impl Drop for DeadlineGuard<'_> {
    fn drop(&mut self) {
        self.timer.disarm(self.seq);
        // The timer may have fired after the guarded work already returned.
        // Withdraw that interrupt, and lower the flag unless someone else
        // still has an interrupt pending on the thread.
        let registry = &self.timer.registry;
        if registry.resolve(self.target, &self.reason).is_some()
            && registry.unresolved_for(self.target).is_empty()
        {
            registry.clear_interrupt(self.target);
        }
    }
}
