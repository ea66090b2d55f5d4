use crate::arbitration::Arbitration;
use crate::context::SchedContext;
use crate::policy::Scheduler;
use crate::types::Pid;

/// First-come first-served. Never preempts: the current process keeps the
/// CPU until it blocks or finishes, then the ready head runs.
#[derive(Debug, Default)]
pub struct Fifo;

impl Scheduler for Fifo {
    fn name(&self) -> &'static str {
        "FIFO"
    }

    fn arbitration(&self) -> Arbitration {
        Arbitration::Fcfs
    }

    fn schedule(&mut self, ctx: &mut SchedContext) -> Option<Pid> {
        if let Some(pid) = ctx.runnable_current() {
            return Some(pid);
        }
        ctx.pop_ready()
    }
}
