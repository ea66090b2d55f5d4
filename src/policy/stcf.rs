use tracing::debug;

use crate::arbitration::Arbitration;
use crate::context::SchedContext;
use crate::policy::Scheduler;
use crate::types::Pid;

/// Shortest time-to-complete first: preemptive SJF on remaining time.
///
/// Every tick the current process is compared against the ready process
/// with the least remaining time. Only a strictly shorter job preempts; the
/// preempted process goes back to the ready head.
#[derive(Debug, Default)]
pub struct Stcf;

fn shortest_ready(ctx: &SchedContext) -> Option<Pid> {
    ctx.ready().first_min_by(|p| ctx.process(p).remaining())
}

impl Scheduler for Stcf {
    fn name(&self) -> &'static str {
        "Shortest Time-to-Complete First"
    }

    fn arbitration(&self) -> Arbitration {
        Arbitration::Fcfs
    }

    fn schedule(&mut self, ctx: &mut SchedContext) -> Option<Pid> {
        if let Some(cur) = ctx.runnable_current() {
            let cur_remaining = ctx.process(cur).remaining();
            match shortest_ready(ctx) {
                Some(cand) if ctx.process(cand).remaining() < cur_remaining => {
                    debug!(pid = cur.0, by = cand.0, "preempted by shorter job");
                    ctx.enqueue_ready_front(cur);
                }
                _ => return Some(cur),
            }
        }
        let next = shortest_ready(ctx)?;
        ctx.take_ready(next);
        Some(next)
    }
}
