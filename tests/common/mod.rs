#![allow(dead_code)]

use sched_sim::{PolicyKind, Scenario, SimFormat, Simulator, Trace};

/// Initialize tracing from `RUST_LOG`.
///
/// `try_init()` is idempotent: first call in the process succeeds,
/// subsequent calls are silently ignored.
pub fn setup_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .event_format(SimFormat)
        .with_test_writer()
        .try_init();
}

/// Run `scenario` under `kind` and check that no invariant broke.
pub fn run(kind: PolicyKind, scenario: &Scenario) -> Trace {
    let trace = Simulator::new(kind.build())
        .run(scenario)
        .unwrap_or_else(|e| panic!("{kind} failed to start: {e}"));
    assert!(!trace.has_fault(), "{kind}: {}", trace.exit_kind());
    trace
}

/// The timeline as process names, `-` for idle ticks.
pub fn names<'a>(scenario: &'a Scenario, trace: &Trace) -> Vec<&'a str> {
    trace
        .timeline()
        .into_iter()
        .map(|slot| match slot {
            Some(pid) => scenario
                .process(pid)
                .map_or("?", |def| def.name.as_str()),
            None => "-",
        })
        .collect()
}

/// Expand "a*2 b c*3" into ["a", "a", "b", "c", "c", "c"].
pub fn expand(pattern: &str) -> Vec<&str> {
    pattern
        .split_whitespace()
        .flat_map(|tok| match tok.split_once('*') {
            Some((name, n)) => vec![name; n.parse().expect("bad repeat count")],
            None => vec![tok],
        })
        .collect()
}
