mod common;

use sched_sim::*;

use common::setup_test;

/// Takes the ready head every tick without putting the previous process
/// back anywhere.
struct Leaky;

impl Scheduler for Leaky {
    fn name(&self) -> &'static str {
        "leaky"
    }

    fn arbitration(&self) -> Arbitration {
        Arbitration::Fcfs
    }

    fn schedule(&mut self, ctx: &mut SchedContext) -> Option<Pid> {
        let next = ctx.ready().front()?;
        ctx.take_ready(next);
        Some(next)
    }
}

/// Claims a buffer it never fills, so a requeued process shows up twice.
struct DoubleBooked;

impl Scheduler for DoubleBooked {
    fn name(&self) -> &'static str {
        "double-booked"
    }

    fn arbitration(&self) -> Arbitration {
        Arbitration::Fcfs
    }

    fn schedule(&mut self, ctx: &mut SchedContext) -> Option<Pid> {
        if let Some(cur) = ctx.runnable_current() {
            ctx.enqueue_ready(cur);
        }
        ctx.pop_ready()
    }

    fn requeued(&self) -> Vec<Pid> {
        vec![Pid(1)]
    }
}

/// Refuses to start.
struct Broken;

impl Scheduler for Broken {
    fn name(&self) -> &'static str {
        "broken"
    }

    fn arbitration(&self) -> Arbitration {
        Arbitration::Fcfs
    }

    fn initialize(&mut self, _ctx: &mut SchedContext) -> Result<(), SchedError> {
        Err(SchedError::InitFailed {
            policy: "broken",
            reason: "not today".into(),
        })
    }

    fn schedule(&mut self, _ctx: &mut SchedContext) -> Option<Pid> {
        None
    }
}

fn two_jobs() -> Scenario {
    Scenario::builder()
        .process("a", 0, 3, 0)
        .process("b", 0, 3, 0)
        .build()
}

#[test]
fn test_dropped_process_is_a_fault() {
    setup_test();
    let trace = Simulator::new(Leaky).run(&two_jobs()).unwrap();
    assert!(trace.has_fault());
    assert_eq!(
        trace.exit_kind(),
        &ExitKind::Fault(InvariantViolation::MultipleRunning(vec![Pid(0), Pid(1)]).to_string())
    );
    // Stopped right after the tick that broke it.
    assert_eq!(trace.total_ticks(), 2);
    assert_eq!(trace.timeline(), vec![Some(Pid(0)), Some(Pid(1))]);
}

#[test]
fn test_double_membership_is_a_fault() {
    setup_test();
    let trace = Simulator::new(DoubleBooked).run(&two_jobs()).unwrap();
    assert_eq!(
        trace.exit_kind(),
        &ExitKind::Fault(InvariantViolation::MultipleMembership(Pid(1)).to_string())
    );
    assert_eq!(trace.total_ticks(), 1);
}

#[test]
fn test_init_failure_is_reported() {
    setup_test();
    let err = Simulator::new(Broken).run(&two_jobs()).unwrap_err();
    assert_eq!(err.to_string(), "failed to initialize broken: not today");
}

#[test]
fn test_at_most_one_running_every_tick() {
    setup_test();
    let scenario = Scenario::builder()
        .add(ProcessDef::new("a", 4).priority(3).uses(0, 1, 2))
        .add(ProcessDef::new("b", 3).arrival(1).priority(3).uses(0, 0, 2))
        .add(ProcessDef::new("c", 2).arrival(2).priority(7))
        .build();

    for kind in PolicyKind::ALL {
        let trace = common::run(kind, &scenario);
        // One Ran or Idle record per tick.
        let mut per_tick = vec![0usize; trace.total_ticks() as usize];
        for e in trace.events() {
            if matches!(e.kind, TraceKind::Ran { .. } | TraceKind::Idle) {
                per_tick[e.tick as usize] += 1;
            }
        }
        assert!(per_tick.iter().all(|&n| n == 1), "{kind}: {per_tick:?}");
    }
}
