//! Resource acquire/release protocols.
//!
//! Every policy pairs with one of four protocols:
//!
//! - **FCFS**: waiters are served in request order, priorities ignored.
//! - **Priority**: waiters are queued and woken highest priority first.
//! - **Ceiling**: as Priority, and an owner runs at `MAX_PRIO` for as long
//!   as it holds any resource, so nothing can preempt it.
//! - **Inheritance**: as Priority, and an owner inherits the priority of the
//!   highest-priority process blocked on what it holds, hop by hop along a
//!   chain of blocked owners.
//!
//! A refused `acquire` leaves the caller BLOCKED in the wait collection; the
//! host then calls `schedule()` to pick someone else. `release` wakes one
//! waiter back to the ready collection; the waiter re-issues its request
//! when it next runs.

use tracing::debug;

use crate::context::{SchedContext, WaitOrder};
use crate::types::{Pid, Priority, ResourceId, MAX_PRIO, NR_RESOURCES};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arbitration {
    Fcfs,
    Priority,
    Ceiling,
    Inheritance,
}

impl Arbitration {
    fn wait_order(self) -> WaitOrder {
        match self {
            Arbitration::Fcfs => WaitOrder::Fifo,
            _ => WaitOrder::Priority,
        }
    }

    /// The current process requests `rid`. Returns true if granted; false
    /// if the caller is now BLOCKED.
    ///
    /// # Panics
    /// Panics if there is no current process or it already owns `rid`.
    pub fn acquire(self, ctx: &mut SchedContext, rid: ResourceId) -> bool {
        let pid = ctx
            .current()
            .unwrap_or_else(|| panic!("acquire({rid}) with no current process"));
        let owner = ctx.resource(rid).owner;

        match owner {
            None => {
                ctx.resource_mut(rid).owner = Some(pid);
                match self {
                    Arbitration::Ceiling => {
                        ctx.process_mut(pid).priority = MAX_PRIO;
                    }
                    Arbitration::Fcfs | Arbitration::Priority | Arbitration::Inheritance => {}
                }
                debug!(pid = pid.0, rid = rid.0, prio = ctx.priority(pid), "acquired");
                true
            }
            Some(owner) => {
                assert!(owner != pid, "pid {pid} re-acquiring {rid} it already owns");
                ctx.block_current(rid, self.wait_order());
                debug!(pid = pid.0, rid = rid.0, owner = owner.0, "blocked");

                if self == Arbitration::Inheritance {
                    let prio = ctx.priority(pid);
                    if highest_waiter_priority(ctx, rid) == Some(prio) {
                        inherit(ctx, rid, prio);
                    }
                }
                false
            }
        }
    }

    /// The current process gives up `rid`, waking one waiter if any.
    ///
    /// # Panics
    /// Panics if the current process does not own `rid`.
    pub fn release(self, ctx: &mut SchedContext, rid: ResourceId) {
        let owner = ctx.resource(rid).owner;
        let current = ctx.current();
        let pid = match (owner, current) {
            (Some(o), Some(c)) if o == c => o,
            _ => panic!(
                "release({rid}) by {} but owner is {}",
                fmt_opt(current),
                fmt_opt(owner)
            ),
        };
        ctx.resource_mut(rid).owner = None;

        match self {
            Arbitration::Ceiling => {
                let still_holding = ctx.resources().owned_by(pid).next().is_some();
                let p = ctx.process_mut(pid);
                p.priority = if still_holding {
                    MAX_PRIO
                } else {
                    p.priority_orig
                };
            }
            Arbitration::Inheritance => {
                let inherited = ctx
                    .resources()
                    .owned_by(pid)
                    .filter_map(|(other, _)| highest_waiter_priority(ctx, other))
                    .max();
                let p = ctx.process_mut(pid);
                p.priority = inherited.map_or(p.priority_orig, |i| i.max(p.priority_orig));
            }
            Arbitration::Fcfs | Arbitration::Priority => {}
        }

        let waitqueue = &ctx.resource(rid).waitqueue;
        let waiter = match self {
            Arbitration::Fcfs => waitqueue.front(),
            _ => waitqueue.first_max_by(|p| ctx.priority(p)),
        };
        debug!(pid = pid.0, rid = rid.0, prio = ctx.priority(pid), "released");
        if let Some(waiter) = waiter {
            ctx.wake(rid, waiter);
            debug!(pid = waiter.0, rid = rid.0, "woke");
        }
    }
}

fn highest_waiter_priority(ctx: &SchedContext, rid: ResourceId) -> Option<Priority> {
    ctx.resource(rid)
        .waitqueue
        .iter()
        .map(|p| ctx.priority(p))
        .max()
}

/// Raise the owner of `rid` to `prio`, then follow the chain: if that owner
/// is itself blocked, raise the owner of the resource it waits on, and so on.
/// Never lowers a priority; stops at the first owner already at `prio`.
fn inherit(ctx: &mut SchedContext, rid: ResourceId, prio: Priority) {
    let mut rid = rid;
    for _ in 0..NR_RESOURCES {
        let Some(owner) = ctx.resource(rid).owner else {
            break;
        };
        if ctx.priority(owner) >= prio {
            break;
        }
        ctx.process_mut(owner).priority = prio;
        debug!(pid = owner.0, rid = rid.0, prio, "inherited priority");
        match ctx.resources().waiting_on(owner) {
            Some(next) => rid = next,
            None => break,
        }
    }
}

fn fmt_opt(pid: Option<Pid>) -> String {
    pid.map_or_else(|| "nobody".to_string(), |p| format!("pid {p}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const R0: ResourceId = ResourceId(0);
    const R1: ResourceId = ResourceId(1);

    /// Make `pid` the running process, as the host would after `schedule()`.
    fn run(ctx: &mut SchedContext, pid: Pid) {
        ctx.take_ready(pid);
        ctx.switch_to(Some(pid));
    }

    /// Park the running process back on the ready collection.
    fn deschedule(ctx: &mut SchedContext) {
        if let Some(pid) = ctx.current() {
            if !ctx.process(pid).is_blocked() {
                ctx.enqueue_ready(pid);
            }
        }
        ctx.switch_to(None);
    }

    #[test]
    fn test_fcfs_wakes_in_request_order() {
        let mut ctx = SchedContext::new();
        let owner = ctx.spawn(10, 1);
        let waiters: Vec<Pid> = [3, 9, 5].iter().map(|&p| ctx.spawn(10, p)).collect();

        run(&mut ctx, owner);
        assert!(Arbitration::Fcfs.acquire(&mut ctx, R0));
        deschedule(&mut ctx);
        for &w in &waiters {
            run(&mut ctx, w);
            assert!(!Arbitration::Fcfs.acquire(&mut ctx, R0));
            ctx.switch_to(None);
        }

        run(&mut ctx, owner);
        Arbitration::Fcfs.release(&mut ctx, R0);
        assert!(ctx.resource(R0).is_free());
        assert_eq!(ctx.ready().to_vec(), vec![waiters[0]]);
        assert_eq!(ctx.verify(&[]), Ok(()));
    }

    #[test]
    fn test_priority_wakes_highest_waiter() {
        let mut ctx = SchedContext::new();
        let owner = ctx.spawn(10, 1);
        let waiters: Vec<Pid> = [3, 9, 5, 9].iter().map(|&p| ctx.spawn(10, p)).collect();

        run(&mut ctx, owner);
        assert!(Arbitration::Priority.acquire(&mut ctx, R0));
        deschedule(&mut ctx);
        for &w in &waiters {
            run(&mut ctx, w);
            assert!(!Arbitration::Priority.acquire(&mut ctx, R0));
            ctx.switch_to(None);
        }

        run(&mut ctx, owner);
        Arbitration::Priority.release(&mut ctx, R0);
        // First of the two priority-9 waiters.
        assert!(ctx.ready().contains(waiters[1]));
        assert!(!ctx.ready().contains(waiters[3]));
        assert_eq!(ctx.priority(owner), 1);
    }

    #[test]
    fn test_ceiling_boosts_to_max_while_held() {
        let mut ctx = SchedContext::new();
        let a = ctx.spawn(10, 4);
        run(&mut ctx, a);
        assert!(Arbitration::Ceiling.acquire(&mut ctx, R0));
        assert_eq!(ctx.priority(a), MAX_PRIO);
        assert!(Arbitration::Ceiling.acquire(&mut ctx, R1));

        Arbitration::Ceiling.release(&mut ctx, R0);
        assert_eq!(ctx.priority(a), MAX_PRIO, "still holds r1");
        Arbitration::Ceiling.release(&mut ctx, R1);
        assert_eq!(ctx.priority(a), 4);
    }

    #[test]
    fn test_inheritance_boosts_owner_to_blocker() {
        let mut ctx = SchedContext::new();
        let low = ctx.spawn(10, 1);
        let mid = ctx.spawn(10, 5);
        let high = ctx.spawn(10, 9);

        run(&mut ctx, low);
        assert!(Arbitration::Inheritance.acquire(&mut ctx, R0));
        deschedule(&mut ctx);

        run(&mut ctx, high);
        assert!(!Arbitration::Inheritance.acquire(&mut ctx, R0));
        ctx.switch_to(None);
        assert_eq!(ctx.priority(low), 9);

        // A lower-priority waiter does not change the inherited priority.
        run(&mut ctx, mid);
        assert!(!Arbitration::Inheritance.acquire(&mut ctx, R0));
        ctx.switch_to(None);
        assert_eq!(ctx.priority(low), 9);

        run(&mut ctx, low);
        Arbitration::Inheritance.release(&mut ctx, R0);
        assert_eq!(ctx.priority(low), 1);
        assert!(ctx.ready().contains(high));
        assert!(ctx.resource(R0).waitqueue.contains(mid));
    }

    #[test]
    fn test_inheritance_ignores_lower_blocker() {
        let mut ctx = SchedContext::new();
        let owner = ctx.spawn(10, 6);
        let low = ctx.spawn(10, 2);

        run(&mut ctx, owner);
        assert!(Arbitration::Inheritance.acquire(&mut ctx, R0));
        deschedule(&mut ctx);
        run(&mut ctx, low);
        assert!(!Arbitration::Inheritance.acquire(&mut ctx, R0));
        assert_eq!(ctx.priority(owner), 6);
    }

    #[test]
    fn test_inheritance_propagates_along_chain() {
        let mut ctx = SchedContext::new();
        let a = ctx.spawn(10, 1);
        let b = ctx.spawn(10, 3);
        let c = ctx.spawn(10, 8);

        // a holds r0; b holds r1 and waits on r0; c waits on r1.
        run(&mut ctx, a);
        assert!(Arbitration::Inheritance.acquire(&mut ctx, R0));
        deschedule(&mut ctx);
        run(&mut ctx, b);
        assert!(Arbitration::Inheritance.acquire(&mut ctx, R1));
        assert!(!Arbitration::Inheritance.acquire(&mut ctx, R0));
        ctx.switch_to(None);
        assert_eq!(ctx.priority(a), 3);

        run(&mut ctx, c);
        assert!(!Arbitration::Inheritance.acquire(&mut ctx, R1));
        ctx.switch_to(None);
        assert_eq!(ctx.priority(b), 8);
        assert_eq!(ctx.priority(a), 8);
        assert_eq!(ctx.verify(&[]), Ok(()));
    }

    #[test]
    fn test_inheritance_release_keeps_remaining_boost() {
        let mut ctx = SchedContext::new();
        let a = ctx.spawn(10, 1);
        let x = ctx.spawn(10, 9);
        let y = ctx.spawn(10, 5);

        run(&mut ctx, a);
        assert!(Arbitration::Inheritance.acquire(&mut ctx, R0));
        assert!(Arbitration::Inheritance.acquire(&mut ctx, R1));
        deschedule(&mut ctx);
        run(&mut ctx, x);
        assert!(!Arbitration::Inheritance.acquire(&mut ctx, R1));
        ctx.switch_to(None);
        run(&mut ctx, y);
        assert!(!Arbitration::Inheritance.acquire(&mut ctx, R0));
        ctx.switch_to(None);
        assert_eq!(ctx.priority(a), 9);

        run(&mut ctx, a);
        Arbitration::Inheritance.release(&mut ctx, R1);
        // y is still blocked on r0, which a keeps holding.
        assert_eq!(ctx.priority(a), 5);
        Arbitration::Inheritance.release(&mut ctx, R0);
        assert_eq!(ctx.priority(a), 1);
        assert_eq!(ctx.ready().to_vec(), vec![x, y]);
    }

    #[test]
    fn test_inheritance_free_acquire_keeps_priority() {
        let mut ctx = SchedContext::new();
        let a = ctx.spawn(10, 1);
        let w1 = ctx.spawn(10, 9);
        let w2 = ctx.spawn(10, 5);
        let c = ctx.spawn(10, 2);

        run(&mut ctx, a);
        assert!(Arbitration::Inheritance.acquire(&mut ctx, R0));
        deschedule(&mut ctx);
        for w in [w1, w2] {
            run(&mut ctx, w);
            assert!(!Arbitration::Inheritance.acquire(&mut ctx, R0));
            ctx.switch_to(None);
        }
        run(&mut ctx, a);
        Arbitration::Inheritance.release(&mut ctx, R0);
        assert!(ctx.ready().contains(w1));
        deschedule(&mut ctx);

        // r0 is free again but w2 still waits on it.
        run(&mut ctx, c);
        assert!(Arbitration::Inheritance.acquire(&mut ctx, R0));
        assert_eq!(ctx.priority(c), 2);
        assert_eq!(ctx.resource(R0).waitqueue.to_vec(), vec![w2]);
        assert_eq!(ctx.verify(&[]), Ok(()));
    }

    #[test]
    #[should_panic(expected = "release(r0) by pid 1 but owner is pid 0")]
    fn test_release_by_non_owner_panics() {
        let mut ctx = SchedContext::new();
        let a = ctx.spawn(10, 1);
        let b = ctx.spawn(10, 1);
        run(&mut ctx, a);
        assert!(Arbitration::Fcfs.acquire(&mut ctx, R0));
        deschedule(&mut ctx);
        run(&mut ctx, b);
        Arbitration::Fcfs.release(&mut ctx, R0);
    }

    #[test]
    #[should_panic(expected = "owner is nobody")]
    fn test_release_of_free_resource_panics() {
        let mut ctx = SchedContext::new();
        let a = ctx.spawn(10, 1);
        run(&mut ctx, a);
        Arbitration::Priority.release(&mut ctx, R0);
    }
}
