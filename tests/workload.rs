mod common;

use std::fs;

use tempfile::TempDir;

use sched_sim::*;

use common::{run, setup_test};

const MIXED: &str = r#"{
    "max_ticks": 500,
    "processes": [
        { "name": "editor", "lifespan": 7, "priority": 3,
          "resources": [ { "resource": 0, "at": 0, "duration": 4 },
                         { "resource": 1, "at": 1, "duration": 2 } ] },
        { "name": "compiler", "arrival": 1, "lifespan": 9, "priority": 6,
          "resources": [ { "resource": 0, "at": 2, "duration": 3 } ] },
        { "name": "indexer", "arrival": 1, "lifespan": 5, "priority": 2,
          "resources": [ { "resource": 1, "at": 0, "duration": 3 } ] },
        { "name": "shell", "arrival": 3, "lifespan": 2, "priority": 8 },
        { "name": "backup", "arrival": 4, "lifespan": 6, "priority": 1,
          "resources": [ { "resource": 2, "at": 1, "duration": 5 } ] }
    ]
}"#;

fn write_workload(dir: &TempDir, json: &str) -> std::path::PathBuf {
    let path = dir.path().join("workload.json");
    fs::write(&path, json).unwrap();
    path
}

#[test]
fn test_load_workload_file() {
    setup_test();
    let dir = TempDir::new().unwrap();
    let scenario = Scenario::from_file(&write_workload(&dir, MIXED)).unwrap();

    assert_eq!(scenario.max_ticks, 500);
    assert_eq!(scenario.processes.len(), 5);
    assert_eq!(scenario.pid_of("editor"), Some(Pid(0)));
    assert_eq!(scenario.pid_of("backup"), Some(Pid(4)));
    let editor = scenario.process(Pid(0)).unwrap();
    assert_eq!(editor.resources.len(), 2);
    assert_eq!(editor.resources[1].release_at(), 3);
}

#[test]
fn test_missing_workload_file() {
    let dir = TempDir::new().unwrap();
    let err = Scenario::from_file(&dir.path().join("nope.json")).unwrap_err();
    assert!(matches!(err, ScenarioError::Io(_)), "{err}");
}

#[test]
fn test_invalid_workload_file() {
    let dir = TempDir::new().unwrap();
    let json = r#"{ "processes": [ { "name": "bad", "lifespan": 2, "priority": 101 } ] }"#;
    let err = Scenario::from_file(&write_workload(&dir, json)).unwrap_err();
    assert!(
        matches!(&err, ScenarioError::InvalidValue { process, .. } if process == "bad"),
        "{err}"
    );
}

/// Every policy completes the mixed workload without breaking an
/// invariant: at most one process RUNNING, and each process in at most one
/// container, checked after every tick.
#[test]
fn test_every_policy_keeps_invariants() {
    setup_test();
    let scenario = Scenario::from_json(MIXED).unwrap();
    let total: Tick = scenario.processes.iter().map(|d| d.lifespan).sum();

    for kind in PolicyKind::ALL {
        let trace = run(kind, &scenario);
        assert_eq!(trace.exit_kind(), &ExitKind::Normal, "{kind}");
        for def in &scenario.processes {
            assert_eq!(trace.runtime(def.pid), def.lifespan, "{kind}: {}", def.name);
            assert!(trace.exit_tick(def.pid).is_some(), "{kind}: {}", def.name);
        }
        // Never idle while work is pending: every process arrives by tick 4
        // and the CPU is busy from tick 0.
        assert_eq!(trace.total_ticks(), total, "{kind}");
        assert!(trace.timeline().iter().all(Option::is_some), "{kind}");
    }
}

#[test]
fn test_tick_limit_override() {
    setup_test();
    let mut scenario = Scenario::from_json(MIXED).unwrap();
    scenario.max_ticks = 10;
    let trace = run(PolicyKind::RoundRobin, &scenario);
    assert_eq!(trace.exit_kind(), &ExitKind::TickLimit);
    assert_eq!(trace.timeline().len(), 10);
}
