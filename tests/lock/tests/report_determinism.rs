//! Run report determinism lock tests.
//!
//! Proves:
//! 1. Same world, seed and budget give byte-identical canonical reports
//! 2. The digest binds the world parameters
//! 3. Canonical bytes are sorted-key compact JSON that parses back to the report
//! 4. The fixture binary prints the same lines across cwd and env variants

use std::process::Command;
use std::sync::Arc;

use lock_tests::isolated;
use rollout_harness::worlds::{BinaryTree, BoundedCounter};
use rollout_harness::{run_search, ucb_engine, RunBudget, RunReportV1, RunTermination};
use rollout_lifecycle::InterruptRegistry;
use rollout_search::EngineConfig;

fn counter_report(seed: u64) -> RunReportV1 {
    let world = BoundedCounter::new(13, 30, 8);
    let mut engine = isolated(ucb_engine(world, seed, EngineConfig::new(100.0)).unwrap());
    run_search(&mut engine, &RunBudget::steps(64)).unwrap()
}

// ---------------------------------------------------------------------------
// 1. In-process determinism
// ---------------------------------------------------------------------------

#[test]
fn repeated_runs_produce_identical_bytes() {
    let baseline = counter_report(5);
    for _ in 0..5 {
        let again = counter_report(5);
        assert_eq!(baseline.canonical_bytes(), again.canonical_bytes());
        assert_eq!(baseline.digest(), again.digest());
    }
}

#[test]
fn engines_on_separate_threads_agree() {
    let handles: Vec<_> = (0..4)
        .map(|_| {
            std::thread::spawn(|| {
                let mut engine = ucb_engine(BinaryTree::new(6), 3, EngineConfig::new(0.0))
                    .unwrap()
                    .with_interrupt_registry(Arc::new(InterruptRegistry::new()));
                run_search(&mut engine, &RunBudget::unlimited()).unwrap().digest()
            })
        })
        .collect();
    let digests: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(digests.windows(2).all(|w| w[0] == w[1]), "{digests:?}");
}

// ---------------------------------------------------------------------------
// 2. Digest binding
// ---------------------------------------------------------------------------

#[test]
fn digest_covers_world_parameters() {
    let run = |levels| {
        let mut engine =
            isolated(ucb_engine(BinaryTree::new(levels), 1, EngineConfig::new(0.0)).unwrap());
        run_search(&mut engine, &RunBudget::steps(1)).unwrap()
    };
    let small = run(4);
    let large = run(5);
    assert_eq!(small.termination, RunTermination::StepBudget);
    assert_ne!(small.digest(), large.digest());
}

// ---------------------------------------------------------------------------
// 3. Canonical form
// ---------------------------------------------------------------------------

#[test]
fn canonical_bytes_are_compact_sorted_json() {
    let report = counter_report(8);
    let bytes = report.canonical_bytes();
    let text = String::from_utf8(bytes.clone()).unwrap();
    assert!(text.starts_with(r#"{"best":"#), "keys are not sorted: {text}");
    assert!(!text.contains('\n'));

    let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(parsed, report.to_json());
    assert!(report.digest().starts_with("sha256:"));
}

// ---------------------------------------------------------------------------
// 4. Cross-process determinism
// ---------------------------------------------------------------------------

fn run_fixture(cwd: &str, extra_env: &[(&str, &str)]) -> String {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_report_fixture"));
    cmd.current_dir(cwd);
    cmd.env_remove("LC_ALL");
    cmd.env_remove("LC_COLLATE");
    cmd.env_remove("LANG");
    cmd.env_remove("LANGUAGE");
    cmd.env_remove("RUST_LOG");
    for (key, value) in extra_env {
        cmd.env(key, value);
    }
    let output = cmd.output().expect("failed to spawn report_fixture");
    assert!(
        output.status.success(),
        "report_fixture failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("fixture output is UTF-8")
}

#[test]
fn fixture_output_is_stable_across_processes() {
    let root = env!("CARGO_MANIFEST_DIR");
    let baseline = run_fixture(root, &[]);

    assert!(baseline.contains("binary_tree.termination=exhausted"));
    assert!(baseline.contains("binary_tree.solutions=16"));
    assert!(baseline.contains("binary_tree.digest=sha256:"));
    assert!(baseline.contains("bounded_counter.digest=sha256:"));

    let alt_cwd = std::env::temp_dir();
    let variant_cwd = run_fixture(&alt_cwd.to_string_lossy(), &[]);
    assert_eq!(baseline, variant_cwd, "output differs when cwd changes");

    let variant_locale = run_fixture(root, &[("LC_ALL", "C"), ("LANG", "C")]);
    assert_eq!(baseline, variant_locale, "output differs under LC_ALL=C LANG=C");

    let variant_noise = run_fixture(
        root,
        &[
            ("ROLLOUT_NOISE", "should_not_matter"),
            ("TZ", "America/New_York"),
        ],
    );
    assert_eq!(baseline, variant_noise, "output differs with spurious env vars");
}

#[test]
fn fixture_digest_matches_in_process_run() {
    let output = run_fixture(env!("CARGO_MANIFEST_DIR"), &[]);
    let expected = format!("bounded_counter.digest={}", counter_report(5).digest());
    assert!(
        output.lines().any(|line| line == expected),
        "fixture digest differs from in-process run"
    );
}
