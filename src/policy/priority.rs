//! Preemptive priority scheduling with a same-priority reinsertion buffer.
//!
//! All four priority policies share one decision algorithm and differ only
//! in the [`PriorityHook`]: which acquire/release protocol they pair with,
//! and whether priorities are aged before each decision.
//!
//! A current process that is still runnable is handled as follows:
//!
//! 1. nothing else is ready or buffered: it keeps the CPU;
//! 2. its priority equals the highest ready priority, or the buffer head's
//!    priority: it is parked in the buffer, behind its peers;
//! 3. otherwise it goes back to the ready tail.
//!
//! The next process is then picked: if the ready collection is empty the
//! buffer is drained into it, and the first highest-priority ready process
//! is taken. If the buffer still holds processes of a different priority
//! than the pick, the buffer is flushed into the ready collection, the pick
//! is put back at the head and the selection is repeated, so a stale buffer
//! can never hide a peer from a new priority level.

use tracing::debug;

use crate::arbitration::Arbitration;
use crate::context::SchedContext;
use crate::error::SchedError;
use crate::policy::Scheduler;
use crate::queue::PidQueue;
use crate::types::{Pid, Priority, MAX_PRIO};

/// What distinguishes one priority policy from another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityHook {
    /// Plain priority scheduling.
    Plain,
    /// Before each decision the previous runner drops back to its original
    /// priority and every waiting process gains one level.
    Aging,
    /// Resource owners are raised to `MAX_PRIO`.
    Ceiling,
    /// Resource owners inherit their highest-priority waiter's priority.
    Inheritance,
}

#[derive(Debug)]
pub struct TieredPriority {
    hook: PriorityHook,
    requeue: PidQueue,
}

impl TieredPriority {
    pub fn new(hook: PriorityHook) -> Self {
        TieredPriority {
            hook,
            requeue: PidQueue::new(),
        }
    }

    pub fn hook(&self) -> PriorityHook {
        self.hook
    }

    fn requeue_priority(&self, ctx: &SchedContext) -> Option<Priority> {
        self.requeue.front().map(|p| ctx.priority(p))
    }

    fn age(&mut self, ctx: &mut SchedContext) {
        if let Some(cur) = ctx.current() {
            ctx.process_mut(cur).reset_priority();
        }
        let waiting: Vec<Pid> = ctx.ready().iter().chain(self.requeue.iter()).collect();
        for pid in waiting {
            let p = ctx.process_mut(pid);
            p.priority = (p.priority + 1).min(MAX_PRIO);
        }
    }

    /// Take the first highest-priority ready process.
    fn take_highest(ctx: &mut SchedContext) -> Option<Pid> {
        let next = ctx.highest_ready()?;
        ctx.take_ready(next);
        Some(next)
    }

    fn pick_next(&mut self, ctx: &mut SchedContext) -> Option<Pid> {
        if ctx.ready().is_empty() {
            self.requeue.drain_into(ctx.ready_mut());
        }
        let next = Self::take_highest(ctx)?;

        match self.requeue_priority(ctx) {
            Some(prio) if prio != ctx.priority(next) => {
                debug!(
                    pid = next.0,
                    prio = ctx.priority(next),
                    requeued_prio = prio,
                    "reconciling reinsertion buffer"
                );
                self.requeue.drain_into(ctx.ready_mut());
                ctx.ready_mut().push_front(next);
                Self::take_highest(ctx)
            }
            _ => Some(next),
        }
    }
}

impl Scheduler for TieredPriority {
    fn name(&self) -> &'static str {
        match self.hook {
            PriorityHook::Plain => "Priority",
            PriorityHook::Aging => "Priority + aging",
            PriorityHook::Ceiling => "Priority + PCP Protocol",
            PriorityHook::Inheritance => "Priority + PIP Protocol",
        }
    }

    fn arbitration(&self) -> Arbitration {
        match self.hook {
            PriorityHook::Plain | PriorityHook::Aging => Arbitration::Priority,
            PriorityHook::Ceiling => Arbitration::Ceiling,
            PriorityHook::Inheritance => Arbitration::Inheritance,
        }
    }

    /// An owner at the ceiling must outrank every non-owner, so under the
    /// ceiling protocol base priorities stay below `MAX_PRIO`.
    fn priority_limit(&self) -> Priority {
        match self.hook {
            PriorityHook::Ceiling => MAX_PRIO - 1,
            _ => MAX_PRIO,
        }
    }

    fn initialize(&mut self, ctx: &mut SchedContext) -> Result<(), SchedError> {
        let limit = self.priority_limit();
        if let Some(p) = ctx.processes().iter().find(|p| p.priority_orig > limit) {
            return Err(SchedError::InitFailed {
                policy: self.name(),
                reason: format!("pid {} has priority {} above {limit}", p.pid, p.priority_orig),
            });
        }
        self.requeue = PidQueue::new();
        Ok(())
    }

    fn finalize(&mut self, ctx: &mut SchedContext) {
        self.requeue.drain_into(ctx.ready_mut());
    }

    fn schedule(&mut self, ctx: &mut SchedContext) -> Option<Pid> {
        if self.hook == PriorityHook::Aging {
            self.age(ctx);
        }

        if let Some(cur) = ctx.runnable_current() {
            if ctx.ready().is_empty() && self.requeue.is_empty() {
                return Some(cur);
            }
            let prio = ctx.priority(cur);
            let ready_max = ctx.highest_ready().map(|p| ctx.priority(p));
            if ready_max == Some(prio) || self.requeue_priority(ctx) == Some(prio) {
                ctx.park(cur, &mut self.requeue);
            } else {
                if ready_max.is_some_and(|max| max > prio) {
                    debug!(pid = cur.0, prio, "preempted by higher priority");
                }
                ctx.enqueue_ready(cur);
            }
        }

        self.pick_next(ctx)
    }

    fn requeued(&self) -> Vec<Pid> {
        self.requeue.to_vec()
    }
}
