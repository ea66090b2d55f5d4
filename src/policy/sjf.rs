use crate::arbitration::Arbitration;
use crate::context::SchedContext;
use crate::policy::Scheduler;
use crate::types::Pid;

/// Shortest job first, non-preemptive. A new pick takes the ready process
/// with the smallest total lifespan, first found on ties.
#[derive(Debug, Default)]
pub struct Sjf;

impl Scheduler for Sjf {
    fn name(&self) -> &'static str {
        "Shortest-Job First"
    }

    fn arbitration(&self) -> Arbitration {
        Arbitration::Fcfs
    }

    fn schedule(&mut self, ctx: &mut SchedContext) -> Option<Pid> {
        if let Some(pid) = ctx.runnable_current() {
            return Some(pid);
        }
        let next = ctx
            .ready()
            .first_min_by(|p| ctx.process(p).lifespan)?;
        ctx.take_ready(next);
        Some(next)
    }
}
