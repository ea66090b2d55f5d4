//! Tick-driven simulation engine.
//!
//! The engine owns the [`SchedContext`] for one run and drives the policy
//! through it: admitting arrivals, asking for a scheduling decision each
//! tick, issuing the resource requests and releases each process's plan
//! calls for, and checking the scheduling invariants after every tick.

use std::collections::{BTreeMap, VecDeque};

use tracing::{debug, info, warn};

use crate::context::SchedContext;
use crate::error::SchedError;
use crate::fmt::set_sim_clock;
use crate::policy::Scheduler;
use crate::process::Process;
use crate::scenario::{ProcessDef, ResourceUse, Scenario};
use crate::trace::{ExitKind, Trace, TraceKind};
use crate::types::{Pid, ResourceId};

/// Resource uses of every process, keyed by PID.
type Plans<'a> = BTreeMap<Pid, &'a [ResourceUse]>;

/// The simulator: runs a scenario under one scheduling policy.
pub struct Simulator<S: Scheduler> {
    scheduler: S,
}

impl<S: Scheduler> Simulator<S> {
    pub fn new(scheduler: S) -> Self {
        Simulator { scheduler }
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Run the scenario to completion, to its tick limit, or until the
    /// policy breaks an invariant, and return the trace.
    ///
    /// Fails only if the policy refuses to initialize, or a process's
    /// priority is above the policy's [`priority_limit`].
    ///
    /// [`priority_limit`]: Scheduler::priority_limit
    pub fn run(&mut self, scenario: &Scenario) -> Result<Trace, SchedError> {
        let mut ctx = SchedContext::new();
        let mut trace = Trace::new(self.scheduler.name());

        set_sim_clock(0);
        let limit = self.scheduler.priority_limit();
        if let Some(def) = scenario.processes.iter().find(|d| d.priority > limit) {
            return Err(SchedError::InitFailed {
                policy: self.scheduler.name(),
                reason: format!(
                    "process {:?} has priority {} above {limit}",
                    def.name, def.priority
                ),
            });
        }
        self.scheduler.initialize(&mut ctx)?;

        let plans: Plans = scenario
            .processes
            .iter()
            .map(|d| (d.pid, d.resources.as_slice()))
            .collect();
        let mut arrivals: Vec<&ProcessDef> = scenario.processes.iter().collect();
        arrivals.sort_by_key(|d| d.arrival);
        let mut pending: VecDeque<&ProcessDef> = arrivals.into();

        info!(
            policy = self.scheduler.name(),
            processes = scenario.processes.len(),
            max_ticks = scenario.max_ticks,
            "simulation start"
        );

        let (ticks, exit) = loop {
            let t = ctx.ticks();
            set_sim_clock(t);

            while let Some(def) = pending.front().filter(|d| d.arrival <= t) {
                ctx.admit(Process::new(def.pid, def.lifespan, def.priority));
                trace.record(t, TraceKind::Admitted { pid: def.pid });
                debug!(pid = def.pid.0, name = def.name.as_str(), "admitted");
                pending.pop_front();
            }

            if ctx.is_drained() && pending.is_empty() {
                break (t, ExitKind::Normal);
            }
            if t >= scenario.max_ticks {
                break (t, ExitKind::TickLimit);
            }

            self.dispatch(&mut ctx, &mut trace);
            self.issue_acquires(&mut ctx, &mut trace, &plans);
            self.run_tick(&mut ctx, &mut trace, &plans);

            if let Err(violation) = ctx.verify(&self.scheduler.requeued()) {
                warn!(%violation, "invariant violated, stopping");
                break (t + 1, ExitKind::Fault(violation.to_string()));
            }
            ctx.advance_tick();
        };

        self.scheduler.finalize(&mut ctx);
        info!(ticks, exit = %exit, "simulation finished");
        trace.finish(ticks, exit);
        Ok(trace)
    }

    /// Ask the policy for the next process and install it.
    fn dispatch(&mut self, ctx: &mut SchedContext, trace: &mut Trace) {
        let prev = ctx.current();
        let next = self.scheduler.schedule(ctx);
        ctx.switch_to(next);
        if let Some(pid) = next.filter(|&pid| prev != Some(pid)) {
            trace.record(ctx.ticks(), TraceKind::Dispatched { pid });
            debug!(pid = pid.0, prio = ctx.priority(pid), "dispatch");
        }
    }

    /// Issue every request due at the current process's age. A refused
    /// request blocks the process; the policy then picks another one, whose
    /// own due requests are issued in turn.
    fn issue_acquires(&mut self, ctx: &mut SchedContext, trace: &mut Trace, plans: &Plans) {
        while let Some(pid) = ctx.current() {
            let age = ctx.process(pid).age;
            // Uses granted earlier at this age stay granted across a block.
            let due: Vec<ResourceId> = plans[&pid]
                .iter()
                .filter(|u| u.at == age)
                .map(ResourceUse::rid)
                .filter(|&rid| ctx.resource(rid).owner != Some(pid))
                .collect();

            let mut blocked = false;
            for rid in due {
                if self.scheduler.acquire(ctx, rid) {
                    trace.record(ctx.ticks(), TraceKind::Acquired { pid, rid });
                } else {
                    trace.record(ctx.ticks(), TraceKind::Blocked { pid, rid });
                    blocked = true;
                    break;
                }
            }
            if !blocked {
                return;
            }
            self.dispatch(ctx, trace);
        }
    }

    /// Give the current process one tick of CPU, then issue its releases
    /// and retire it if it is done.
    fn run_tick(&mut self, ctx: &mut SchedContext, trace: &mut Trace, plans: &Plans) {
        let t = ctx.ticks();
        let Some(pid) = ctx.current() else {
            trace.record(t, TraceKind::Idle);
            debug!("idle");
            return;
        };

        let p = ctx.process_mut(pid);
        p.age += 1;
        let (age, priority) = (p.age, p.priority);
        trace.record(t, TraceKind::Ran { pid, priority });

        // Innermost (latest acquired) first.
        let mut due: Vec<&ResourceUse> = plans[&pid]
            .iter()
            .filter(|u| u.release_at() == age)
            .filter(|u| ctx.resource(u.rid()).owner == Some(pid))
            .collect();
        due.sort_by_key(|u| (std::cmp::Reverse(u.at), u.resource));
        for u in due {
            self.scheduler.release(ctx, u.rid());
            trace.record(t, TraceKind::Released { pid, rid: u.rid() });
        }

        if ctx.process(pid).is_finished() {
            ctx.exit_current();
            trace.record(t, TraceKind::Exited { pid });
            debug!(pid = pid.0, "exited");
        }
    }
}
