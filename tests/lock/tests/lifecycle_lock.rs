//! Lifecycle lock tests.
//!
//! Proves:
//! 1. Transitions are one-way and illegal ones are rejected
//! 2. Shutdown interrupts each registered thread exactly once, however often
//!    and from however many threads it is requested
//! 3. The deadline guard stops blocking work close to the deadline
//! 4. Interrupts the lifecycle did not issue surface as `Interrupted`
//! 5. Cancellation is observed at the next checkpoint

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use rollout_lifecycle::{
    AlgorithmError, AlgorithmLifecycle, AlgorithmState, GuardedError, InterruptReason,
    InterruptRegistry, Interrupted, LifecycleConfig, LifecycleEvent,
};

fn lifecycle(config: LifecycleConfig) -> AlgorithmLifecycle {
    AlgorithmLifecycle::with_registry(config, Arc::new(InterruptRegistry::new()))
}

// ---------------------------------------------------------------------------
// 1. Transitions
// ---------------------------------------------------------------------------

#[test]
fn lifecycle_moves_forward_only() {
    let mut lc = lifecycle(LifecycleConfig::default());
    assert_eq!(lc.state(), AlgorithmState::Created);

    let id = lc.id();
    assert_eq!(lc.activate(), Ok(LifecycleEvent::Initialized { algorithm: id }));
    let violation = lc.activate().unwrap_err();
    assert_eq!(violation.operation, "activate");
    assert_eq!(violation.state, AlgorithmState::Active);

    assert_eq!(lc.terminate(), Some(LifecycleEvent::Finished { algorithm: id }));
    assert_eq!(lc.terminate(), None, "Finished is reported once");
    assert_eq!(lc.state(), AlgorithmState::Inactive);
    assert!(lc.activate().is_err());
}

#[test]
fn terminating_a_created_lifecycle_is_allowed() {
    let mut lc = lifecycle(LifecycleConfig::default());
    assert!(lc.terminate().is_some());
    assert_eq!(lc.state(), AlgorithmState::Inactive);
}

#[test]
fn oversized_precaution_offset_is_rejected() {
    let config = LifecycleConfig {
        timeout: Some(Duration::from_millis(10)),
        timeout_precaution_offset: Duration::from_millis(10),
        ..LifecycleConfig::default()
    };
    assert!(config.validate().is_err());
    assert!(LifecycleConfig::with_timeout(Duration::from_secs(1)).validate().is_ok());
}

// ---------------------------------------------------------------------------
// 2. Shutdown idempotence
// ---------------------------------------------------------------------------

#[test]
fn concurrent_shutdown_interrupts_each_worker_once() {
    const WORKERS: usize = 4;
    const CALLERS: usize = 8;

    let registry = Arc::new(InterruptRegistry::new());
    let lc = Arc::new(AlgorithmLifecycle::with_registry(
        LifecycleConfig::default(),
        Arc::clone(&registry),
    ));

    let registered = Arc::new(Barrier::new(WORKERS + 1));
    let workers: Vec<_> = (0..WORKERS)
        .map(|_| {
            let lc = Arc::clone(&lc);
            let registered = Arc::clone(&registered);
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                lc.register_active_thread();
                registered.wait();
                let woke = registry.current_flag().sleep(Duration::from_secs(10));
                woke == Err(Interrupted)
            })
        })
        .collect();
    registered.wait();

    let start = Arc::new(Barrier::new(CALLERS));
    let callers: Vec<_> = (0..CALLERS)
        .map(|_| {
            let lc = Arc::clone(&lc);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                lc.shutdown()
            })
        })
        .collect();

    let first_calls = callers
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|&first| first)
        .count();
    assert_eq!(first_calls, 1, "exactly one shutdown call does the work");

    for worker in workers {
        assert!(worker.join().unwrap(), "worker was not woken by shutdown");
    }
    assert_eq!(registry.issued_count(), WORKERS as u64);
    assert!(lc.is_shut_down());
}

#[test]
fn late_registration_after_shutdown_is_interrupted_at_once() {
    let registry = Arc::new(InterruptRegistry::new());
    let lc = Arc::new(AlgorithmLifecycle::with_registry(
        LifecycleConfig::default(),
        Arc::clone(&registry),
    ));
    assert!(lc.shutdown());

    let worker = {
        let lc = Arc::clone(&lc);
        let registry = Arc::clone(&registry);
        thread::spawn(move || {
            lc.register_active_thread();
            registry.current_flag().check()
        })
    };
    assert_eq!(worker.join().unwrap(), Err(Interrupted));
}

// ---------------------------------------------------------------------------
// 3. Deadline respect
// ---------------------------------------------------------------------------

#[test]
fn guard_stops_blocking_work_before_the_deadline_passes_by_much() {
    let timeout = Duration::from_millis(200);
    let offset = Duration::from_millis(50);
    let mut lc = lifecycle(LifecycleConfig {
        timeout: Some(timeout),
        timeout_precaution_offset: offset,
        ..LifecycleConfig::default()
    });
    lc.activate().unwrap();

    let result = lc.compute_timeout_aware(|flag| flag.sleep(Duration::from_secs(10)));
    let elapsed = lc.activated_at().unwrap().elapsed();

    assert!(
        matches!(result, Err(GuardedError::Terminated(AlgorithmError::Timeout { .. }))),
        "got {result:?}"
    );
    assert!(elapsed >= timeout - offset, "guard fired early: {elapsed:?}");
    assert!(elapsed < timeout + Duration::from_millis(500), "guard fired late: {elapsed:?}");
    assert!(lc.timed_out_at().is_some());
    assert!(lc.is_shut_down(), "timeout runs shutdown");
    assert!(matches!(
        lc.check_and_conduct_termination(),
        Err(AlgorithmError::Timeout { .. })
    ));

    lc.terminate();
    let me = thread::current().id();
    assert!(!lc.registry().is_interrupted(me), "interrupts were not withdrawn");
    assert!(lc.registry().unresolved_for(me).is_empty());
}

#[test]
fn fast_work_under_a_deadline_is_untouched() {
    let mut lc = lifecycle(LifecycleConfig::with_timeout(Duration::from_secs(5)));
    lc.activate().unwrap();
    let value: Result<u32, GuardedError<Interrupted>> = lc.compute_timeout_aware(|_| Ok(7));
    assert_eq!(value.unwrap(), 7);
    assert_eq!(lc.check_and_conduct_termination(), Ok(()));
    lc.terminate();
}

// ---------------------------------------------------------------------------
// 4. Interrupt disambiguation
// ---------------------------------------------------------------------------

#[test]
fn foreign_interrupt_is_reported_as_interrupted() {
    let registry = Arc::new(InterruptRegistry::new());
    let config = LifecycleConfig {
        shutdown_on_termination: false,
        ..LifecycleConfig::default()
    };
    let mut lc = AlgorithmLifecycle::with_registry(config, Arc::clone(&registry));
    lc.activate().unwrap();

    let me = thread::current().id();
    registry.interrupt(me, InterruptReason::Custom("operator".into()));
    assert_eq!(lc.check_and_conduct_termination(), Err(AlgorithmError::Interrupted));
    assert!(!registry.is_interrupted(me), "flag is cleared once reported");
    assert!(!lc.is_shut_down());
    // The foreign interrupt stays on record for whoever issued it.
    assert_eq!(registry.unresolved_for(me).len(), 1);
    lc.terminate();
}

#[test]
fn foreign_interrupt_triggers_shutdown_when_configured() {
    let registry = Arc::new(InterruptRegistry::new());
    let mut lc =
        AlgorithmLifecycle::with_registry(LifecycleConfig::default(), Arc::clone(&registry));
    lc.activate().unwrap();

    registry.interrupt_untagged(thread::current().id());
    assert_eq!(lc.check_and_conduct_termination(), Err(AlgorithmError::Interrupted));
    assert!(lc.is_shut_down());
    lc.terminate();
}

#[test]
fn untagged_interrupt_during_guarded_work_is_not_a_timeout() {
    let registry = Arc::new(InterruptRegistry::new());
    let mut lc = AlgorithmLifecycle::with_registry(
        LifecycleConfig::with_timeout(Duration::from_secs(30)),
        Arc::clone(&registry),
    );
    lc.activate().unwrap();

    let me = thread::current().id();
    let interrupter = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            registry.interrupt_untagged(me);
        })
    };
    let result = lc.compute_timeout_aware(|flag| flag.sleep(Duration::from_secs(10)));
    interrupter.join().unwrap();

    assert!(
        matches!(result, Err(GuardedError::Terminated(AlgorithmError::Interrupted))),
        "got {result:?}"
    );
    assert!(lc.timed_out_at().is_none());
    lc.terminate();
}

// ---------------------------------------------------------------------------
// 5. Cancellation
// ---------------------------------------------------------------------------

#[test]
fn cancel_handle_is_observed_at_the_next_checkpoint() {
    let mut lc = lifecycle(LifecycleConfig::default());
    lc.activate().unwrap();
    let handle = lc.cancel_handle();
    assert_eq!(handle.algorithm(), lc.id());

    let canceler = thread::spawn(move || (handle.cancel(), handle.cancel()));
    assert_eq!(canceler.join().unwrap(), (true, false));

    assert!(matches!(
        lc.check_and_conduct_termination(),
        Err(AlgorithmError::Canceled { .. })
    ));
    let me = thread::current().id();
    assert!(
        !lc.registry().is_interrupted(me),
        "own shutdown interrupt is withdrawn on cancel"
    );
    lc.terminate();
}
