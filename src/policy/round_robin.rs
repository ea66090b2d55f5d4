use crate::arbitration::Arbitration;
use crate::context::SchedContext;
use crate::error::SchedError;
use crate::policy::Scheduler;
use crate::queue::PidQueue;
use crate::types::Pid;

/// Round-robin with a one-tick quantum.
///
/// The preempted process goes to a reinsertion buffer instead of the ready
/// tail. The buffer is only drained, in order, once the ready collection is
/// empty, so a process preempted this tick never overtakes peers that were
/// already waiting or that arrive while it is buffered.
#[derive(Debug, Default)]
pub struct RoundRobin {
    requeue: PidQueue,
}

impl RoundRobin {
    pub fn new() -> Self {
        RoundRobin {
            requeue: PidQueue::new(),
        }
    }
}

impl Scheduler for RoundRobin {
    fn name(&self) -> &'static str {
        "Round-Robin"
    }

    fn arbitration(&self) -> Arbitration {
        Arbitration::Fcfs
    }

    fn initialize(&mut self, _ctx: &mut SchedContext) -> Result<(), SchedError> {
        self.requeue = PidQueue::new();
        Ok(())
    }

    fn finalize(&mut self, ctx: &mut SchedContext) {
        self.requeue.drain_into(ctx.ready_mut());
    }

    fn schedule(&mut self, ctx: &mut SchedContext) -> Option<Pid> {
        if let Some(cur) = ctx.runnable_current() {
            ctx.park(cur, &mut self.requeue);
        }
        if ctx.ready().is_empty() {
            self.requeue.drain_into(ctx.ready_mut());
        }
        ctx.pop_ready()
    }

    fn requeued(&self) -> Vec<Pid> {
        self.requeue.to_vec()
    }
}
