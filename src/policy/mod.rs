//! Scheduling policies and their registration table.
//!
//! A policy is a [`Scheduler`]: a `schedule()` decision function plus the
//! acquire/release protocol it pairs with. [`PolicyKind`] is the closed set
//! of policies a host can select by name.

mod fifo;
mod priority;
mod round_robin;
mod sjf;
mod stcf;

use std::fmt;
use std::str::FromStr;

pub use fifo::Fifo;
pub use priority::{PriorityHook, TieredPriority};
pub use round_robin::RoundRobin;
pub use sjf::Sjf;
pub use stcf::Stcf;

use crate::arbitration::Arbitration;
use crate::context::SchedContext;
use crate::error::SchedError;
use crate::types::{Pid, Priority, ResourceId, MAX_PRIO};

/// The per-policy contract the host drives.
///
/// `schedule` is called once per tick, and again whenever an `acquire`
/// leaves the current process blocked. It returns the process to run next,
/// or `None` when nothing is runnable. A policy that stops running a
/// process which is neither blocked nor finished must put it back in the
/// ready collection or its own reinsertion buffer.
pub trait Scheduler {
    /// Human-readable policy name.
    fn name(&self) -> &'static str;

    /// The acquire/release protocol this policy pairs with.
    fn arbitration(&self) -> Arbitration;

    /// Highest base priority a process may be admitted with.
    fn priority_limit(&self) -> Priority {
        MAX_PRIO
    }

    /// Called once when the policy is activated.
    fn initialize(&mut self, _ctx: &mut SchedContext) -> Result<(), SchedError> {
        Ok(())
    }

    /// Called once when the policy is deactivated.
    fn finalize(&mut self, _ctx: &mut SchedContext) {}

    /// Pick the process to run for this tick.
    fn schedule(&mut self, ctx: &mut SchedContext) -> Option<Pid>;

    /// The current process requests exclusive use of `rid`.
    fn acquire(&mut self, ctx: &mut SchedContext, rid: ResourceId) -> bool {
        self.arbitration().acquire(ctx, rid)
    }

    /// The current process is done with `rid`.
    fn release(&mut self, ctx: &mut SchedContext, rid: ResourceId) {
        self.arbitration().release(ctx, rid)
    }

    /// Processes held in the policy's reinsertion buffer, in order.
    fn requeued(&self) -> Vec<Pid> {
        Vec::new()
    }
}

impl<S: Scheduler + ?Sized> Scheduler for Box<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn arbitration(&self) -> Arbitration {
        (**self).arbitration()
    }

    fn priority_limit(&self) -> Priority {
        (**self).priority_limit()
    }

    fn initialize(&mut self, ctx: &mut SchedContext) -> Result<(), SchedError> {
        (**self).initialize(ctx)
    }

    fn finalize(&mut self, ctx: &mut SchedContext) {
        (**self).finalize(ctx)
    }

    fn schedule(&mut self, ctx: &mut SchedContext) -> Option<Pid> {
        (**self).schedule(ctx)
    }

    fn acquire(&mut self, ctx: &mut SchedContext, rid: ResourceId) -> bool {
        (**self).acquire(ctx, rid)
    }

    fn release(&mut self, ctx: &mut SchedContext, rid: ResourceId) {
        (**self).release(ctx, rid)
    }

    fn requeued(&self) -> Vec<Pid> {
        (**self).requeued()
    }
}

/// The selectable policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyKind {
    Fifo,
    Sjf,
    Stcf,
    RoundRobin,
    Priority,
    PriorityAging,
    PriorityCeiling,
    PriorityInheritance,
}

impl PolicyKind {
    pub const ALL: [PolicyKind; 8] = [
        PolicyKind::Fifo,
        PolicyKind::Sjf,
        PolicyKind::Stcf,
        PolicyKind::RoundRobin,
        PolicyKind::Priority,
        PolicyKind::PriorityAging,
        PolicyKind::PriorityCeiling,
        PolicyKind::PriorityInheritance,
    ];

    /// Short name used on the command line.
    pub fn short_name(self) -> &'static str {
        match self {
            PolicyKind::Fifo => "fifo",
            PolicyKind::Sjf => "sjf",
            PolicyKind::Stcf => "stcf",
            PolicyKind::RoundRobin => "rr",
            PolicyKind::Priority => "prio",
            PolicyKind::PriorityAging => "pa",
            PolicyKind::PriorityCeiling => "pcp",
            PolicyKind::PriorityInheritance => "pip",
        }
    }

    /// Resolve a short name.
    pub fn from_name(name: &str) -> Result<Self, SchedError> {
        Self::ALL
            .into_iter()
            .find(|k| k.short_name().eq_ignore_ascii_case(name))
            .ok_or_else(|| SchedError::UnknownPolicy(name.to_string()))
    }

    /// Construct a fresh, not yet initialized scheduler.
    pub fn build(self) -> Box<dyn Scheduler> {
        match self {
            PolicyKind::Fifo => Box::new(Fifo),
            PolicyKind::Sjf => Box::new(Sjf),
            PolicyKind::Stcf => Box::new(Stcf),
            PolicyKind::RoundRobin => Box::new(RoundRobin::new()),
            PolicyKind::Priority => Box::new(TieredPriority::new(PriorityHook::Plain)),
            PolicyKind::PriorityAging => Box::new(TieredPriority::new(PriorityHook::Aging)),
            PolicyKind::PriorityCeiling => Box::new(TieredPriority::new(PriorityHook::Ceiling)),
            PolicyKind::PriorityInheritance => {
                Box::new(TieredPriority::new(PriorityHook::Inheritance))
            }
        }
    }
}

impl FromStr for PolicyKind {
    type Err = SchedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}
