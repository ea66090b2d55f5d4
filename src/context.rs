//! Per-simulation scheduler state.
//!
//! Everything a policy reads or mutates lives in one `SchedContext`: the
//! process arena, the ready collection, the resources and the current
//! process. There are no globals, so independent simulations (and tests
//! running on parallel threads) never share state.
//!
//! Status changes go through the transition methods below, which update a
//! process's container membership and its `status` together.

use std::collections::BTreeMap;

use crate::error::InvariantViolation;
use crate::process::{Process, ProcessStatus, ProcessTable};
use crate::queue::PidQueue;
use crate::resource::{Resource, ResourceTable};
use crate::types::{Pid, Priority, ResourceId, Tick};

/// How a blocked process is placed in a resource's wait collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOrder {
    /// Append at the tail (request order).
    Fifo,
    /// Descending priority, request order among equals.
    Priority,
}

#[derive(Debug, Default)]
pub struct SchedContext {
    procs: ProcessTable,
    ready: PidQueue,
    resources: ResourceTable,
    current: Option<Pid>,
    ticks: Tick,
    next_pid: u32,
}

impl SchedContext {
    pub fn new() -> Self {
        SchedContext {
            procs: ProcessTable::new(),
            ready: PidQueue::new(),
            resources: ResourceTable::new(),
            current: None,
            ticks: 0,
            next_pid: 0,
        }
    }

    /// Monotonic tick counter.
    pub fn ticks(&self) -> Tick {
        self.ticks
    }

    pub fn advance_tick(&mut self) {
        self.ticks += 1;
    }

    // -----------------------------------------------------------------
    // Process admission and lookup
    // -----------------------------------------------------------------

    /// Create a process with the next free PID and append it to the ready
    /// collection.
    pub fn spawn(&mut self, lifespan: Tick, priority: Priority) -> Pid {
        let pid = Pid(self.next_pid);
        self.admit(Process::new(pid, lifespan, priority));
        pid
    }

    /// Admit an already-built process: it becomes READY at the ready tail.
    pub fn admit(&mut self, mut process: Process) {
        let pid = process.pid;
        process.status = ProcessStatus::Ready;
        self.next_pid = self.next_pid.max(pid.0 + 1);
        self.procs.insert(process);
        self.ready.push_back(pid);
    }

    pub fn processes(&self) -> &ProcessTable {
        &self.procs
    }

    /// # Panics
    /// Panics if `pid` is not live.
    pub fn process(&self, pid: Pid) -> &Process {
        &self.procs[pid]
    }

    pub fn process_mut(&mut self, pid: Pid) -> &mut Process {
        &mut self.procs[pid]
    }

    pub fn priority(&self, pid: Pid) -> Priority {
        self.procs[pid].priority
    }

    /// Whether no process is live.
    pub fn is_drained(&self) -> bool {
        self.procs.is_empty()
    }

    // -----------------------------------------------------------------
    // Current process
    // -----------------------------------------------------------------

    pub fn current(&self) -> Option<Pid> {
        self.current
    }

    /// The current process if it may keep the CPU: present, not blocked and
    /// not yet finished.
    pub fn runnable_current(&self) -> Option<Pid> {
        let pid = self.current?;
        let p = self.procs.get(pid)?;
        (!p.is_blocked() && !p.is_finished()).then_some(pid)
    }

    /// Install the process chosen by `schedule()` as current.
    pub fn switch_to(&mut self, next: Option<Pid>) {
        if let Some(pid) = next {
            self.procs[pid].status = ProcessStatus::Running;
        }
        self.current = next;
    }

    /// Remove the current process from the arena (it finished).
    pub fn exit_current(&mut self) -> Option<Process> {
        let pid = self.current.take()?;
        self.procs.remove(pid)
    }

    // -----------------------------------------------------------------
    // Ready collection
    // -----------------------------------------------------------------

    pub fn ready(&self) -> &PidQueue {
        &self.ready
    }

    pub(crate) fn ready_mut(&mut self) -> &mut PidQueue {
        &mut self.ready
    }

    /// Mark `pid` READY and append it to the ready tail.
    pub fn enqueue_ready(&mut self, pid: Pid) {
        self.procs[pid].status = ProcessStatus::Ready;
        self.ready.push_back(pid);
    }

    /// Mark `pid` READY and insert it at the ready head.
    pub fn enqueue_ready_front(&mut self, pid: Pid) {
        self.procs[pid].status = ProcessStatus::Ready;
        self.ready.push_front(pid);
    }

    /// Mark `pid` READY and hold it in a policy-owned reinsertion buffer.
    pub fn park(&mut self, pid: Pid, buffer: &mut PidQueue) {
        self.procs[pid].status = ProcessStatus::Ready;
        buffer.push_back(pid);
    }

    /// Remove `pid` from the ready collection. Its status is left READY
    /// until `switch_to` makes it RUNNING.
    pub fn take_ready(&mut self, pid: Pid) -> bool {
        self.ready.remove(pid)
    }

    pub fn pop_ready(&mut self) -> Option<Pid> {
        self.ready.pop_front()
    }

    /// First ready process with the highest effective priority.
    pub fn highest_ready(&self) -> Option<Pid> {
        self.ready.first_max_by(|p| self.procs[p].priority)
    }

    // -----------------------------------------------------------------
    // Resources
    // -----------------------------------------------------------------

    pub fn resources(&self) -> &ResourceTable {
        &self.resources
    }

    pub fn resource(&self, rid: ResourceId) -> &Resource {
        self.resources.get(rid)
    }

    pub(crate) fn resource_mut(&mut self, rid: ResourceId) -> &mut Resource {
        self.resources.get_mut(rid)
    }

    /// Transition the current process RUNNING -> BLOCKED and enqueue it on
    /// `rid`'s wait collection. Returns the blocked PID.
    ///
    /// # Panics
    /// Panics if there is no current process.
    pub fn block_current(&mut self, rid: ResourceId, order: WaitOrder) -> Pid {
        let pid = self
            .current
            .unwrap_or_else(|| panic!("blocking on {rid} with no current process"));
        self.procs[pid].status = ProcessStatus::Blocked;
        let procs = &self.procs;
        let waitqueue = &mut self.resources.get_mut(rid).waitqueue;
        match order {
            WaitOrder::Fifo => waitqueue.push_back(pid),
            WaitOrder::Priority => waitqueue.insert_ordered_by(pid, |p| procs[p].priority),
        }
        pid
    }

    /// Transition a waiter BLOCKED -> READY, moving it from `rid`'s wait
    /// collection to the ready tail.
    ///
    /// # Panics
    /// Panics if `pid` is not a blocked waiter of `rid`.
    pub fn wake(&mut self, rid: ResourceId, pid: Pid) {
        assert!(
            self.procs[pid].is_blocked(),
            "waking pid {pid} on {rid} which is not BLOCKED"
        );
        let removed = self.resources.get_mut(rid).waitqueue.remove(pid);
        assert!(removed, "pid {pid} is not waiting on {rid}");
        self.enqueue_ready(pid);
    }

    // -----------------------------------------------------------------
    // Invariants
    // -----------------------------------------------------------------

    /// Check the membership/status invariants.
    ///
    /// `requeued` lists the PIDs held in the active policy's reinsertion
    /// buffer; they count as READY members alongside the ready collection.
    pub fn verify(&self, requeued: &[Pid]) -> Result<(), InvariantViolation> {
        // pid -> (ready/buffer memberships, wait collection memberships)
        let mut members: BTreeMap<Pid, (u32, u32)> = BTreeMap::new();
        for pid in self.ready.iter().chain(requeued.iter().copied()) {
            members.entry(pid).or_default().0 += 1;
        }
        for (rid, r) in self.resources.iter() {
            if let Some(owner) = r.owner {
                if !self.procs.contains(owner) {
                    return Err(InvariantViolation::DanglingOwner(rid, owner));
                }
            }
            for pid in r.waitqueue.iter() {
                members.entry(pid).or_default().1 += 1;
            }
        }

        for (&pid, &(queued, waiting)) in &members {
            if !self.procs.contains(pid) {
                return Err(InvariantViolation::UnknownPid(pid));
            }
            if queued + waiting > 1 {
                return Err(InvariantViolation::MultipleMembership(pid));
            }
        }

        let running: Vec<Pid> = self
            .procs
            .iter()
            .filter(|p| p.status == ProcessStatus::Running)
            .map(|p| p.pid)
            .collect();
        if running.len() > 1 {
            return Err(InvariantViolation::MultipleRunning(running));
        }
        if let Some(&pid) = running.first() {
            if self.current != Some(pid) {
                return Err(InvariantViolation::RunningNotCurrent(pid));
            }
        }
        if let Some(pid) = self.current {
            match self.procs.get(pid) {
                None => return Err(InvariantViolation::UnknownPid(pid)),
                Some(p) if p.status != ProcessStatus::Running => {
                    return Err(InvariantViolation::CurrentNotRunning(pid));
                }
                Some(_) => {}
            }
        }

        for p in self.procs.iter() {
            let (queued, waiting) = members.get(&p.pid).copied().unwrap_or_default();
            match p.status {
                ProcessStatus::Ready if queued != 1 => {
                    return Err(InvariantViolation::ReadyNotQueued(p.pid));
                }
                ProcessStatus::Blocked if waiting != 1 => {
                    return Err(InvariantViolation::BlockedNotWaiting(p.pid));
                }
                ProcessStatus::Running if queued + waiting != 0 => {
                    return Err(InvariantViolation::RunningQueued(p.pid));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_is_ready_and_queued() {
        let mut ctx = SchedContext::new();
        let a = ctx.spawn(5, 1);
        let b = ctx.spawn(5, 1);
        assert_eq!((a, b), (Pid(0), Pid(1)));
        assert_eq!(ctx.ready().to_vec(), vec![a, b]);
        assert_eq!(ctx.process(a).status, ProcessStatus::Ready);
        assert_eq!(ctx.verify(&[]), Ok(()));
    }

    #[test]
    fn test_switch_and_block() {
        let mut ctx = SchedContext::new();
        let a = ctx.spawn(5, 1);
        assert!(ctx.take_ready(a));
        ctx.switch_to(Some(a));
        assert_eq!(ctx.verify(&[]), Ok(()));

        ctx.block_current(ResourceId(3), WaitOrder::Fifo);
        assert!(ctx.process(a).is_blocked());
        assert_eq!(ctx.resources().waiting_on(a), Some(ResourceId(3)));
        ctx.switch_to(None);
        assert_eq!(ctx.verify(&[]), Ok(()));

        ctx.wake(ResourceId(3), a);
        assert_eq!(ctx.process(a).status, ProcessStatus::Ready);
        assert_eq!(ctx.ready().to_vec(), vec![a]);
        assert_eq!(ctx.verify(&[]), Ok(()));
    }

    #[test]
    fn test_verify_running_and_queued() {
        let mut ctx = SchedContext::new();
        let a = ctx.spawn(5, 1);
        // Dispatched without leaving the ready collection.
        ctx.switch_to(Some(a));
        assert_eq!(ctx.verify(&[]), Err(InvariantViolation::RunningQueued(a)));
    }

    #[test]
    fn test_verify_dropped_process() {
        let mut ctx = SchedContext::new();
        let a = ctx.spawn(5, 1);
        let b = ctx.spawn(5, 1);
        ctx.take_ready(a);
        ctx.switch_to(Some(a));
        ctx.take_ready(b);
        // `a` is neither requeued nor blocked but loses the CPU.
        ctx.switch_to(Some(b));
        assert_eq!(
            ctx.verify(&[]),
            Err(InvariantViolation::MultipleRunning(vec![a, b]))
        );
    }

    #[test]
    fn test_verify_parked_counts_as_ready() {
        let mut ctx = SchedContext::new();
        let a = ctx.spawn(5, 1);
        ctx.take_ready(a);
        let mut buffer = PidQueue::new();
        ctx.park(a, &mut buffer);
        assert_eq!(ctx.verify(&[]), Err(InvariantViolation::ReadyNotQueued(a)));
        assert_eq!(ctx.verify(&buffer.to_vec()), Ok(()));
    }

    #[test]
    fn test_priority_wait_order() {
        let mut ctx = SchedContext::new();
        let pids: Vec<Pid> = [2, 9, 5].iter().map(|&prio| ctx.spawn(5, prio)).collect();
        for &pid in &pids {
            ctx.take_ready(pid);
            ctx.switch_to(Some(pid));
            ctx.block_current(ResourceId(0), WaitOrder::Priority);
        }
        assert_eq!(
            ctx.resource(ResourceId(0)).waitqueue.to_vec(),
            vec![pids[1], pids[2], pids[0]]
        );
    }
}
