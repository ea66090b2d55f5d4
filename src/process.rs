//! Process records and the arena that owns them.
//!
//! Containers elsewhere (ready collection, wait collections, reinsertion
//! buffers) only ever hold [`Pid`]s. The arena is the single owner of the
//! process state, so a process can never be aliased by two nodes.

use std::collections::BTreeMap;
use std::ops::{Index, IndexMut};

use crate::types::{Pid, Priority, Tick, MAX_PRIO};

/// Scheduling state of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    /// Runnable, waiting in the ready collection (or a policy's
    /// reinsertion buffer).
    Ready,
    /// Occupying the CPU this tick.
    Running,
    /// Waiting in exactly one resource's wait collection.
    Blocked,
}

/// A simulated process as seen by the scheduling core.
#[derive(Debug, Clone)]
pub struct Process {
    pub pid: Pid,
    pub status: ProcessStatus,
    /// Ticks of CPU time received so far.
    pub age: Tick,
    /// Ticks of CPU time needed to finish.
    pub lifespan: Tick,
    /// Effective (possibly boosted or aged) priority.
    pub priority: Priority,
    /// Baseline priority restored once no boost applies.
    pub priority_orig: Priority,
}

impl Process {
    pub fn new(pid: Pid, lifespan: Tick, priority: Priority) -> Self {
        assert!(
            priority <= MAX_PRIO,
            "priority {priority} of pid {pid} exceeds MAX_PRIO {MAX_PRIO}"
        );
        Process {
            pid,
            status: ProcessStatus::Ready,
            age: 0,
            lifespan,
            priority,
            priority_orig: priority,
        }
    }

    /// Whether the process has received all the CPU time it needs.
    pub fn is_finished(&self) -> bool {
        self.age >= self.lifespan
    }

    /// Ticks left until completion.
    pub fn remaining(&self) -> Tick {
        self.lifespan.saturating_sub(self.age)
    }

    pub fn is_blocked(&self) -> bool {
        self.status == ProcessStatus::Blocked
    }

    /// Drop any boost and return to the baseline priority.
    pub fn reset_priority(&mut self) {
        self.priority = self.priority_orig;
    }
}

/// Arena of live processes, addressed by [`Pid`].
///
/// Backed by a `BTreeMap` so that iteration (invariant checks, dumps) is in
/// PID order and therefore reproducible run to run.
#[derive(Debug, Default)]
pub struct ProcessTable {
    procs: BTreeMap<Pid, Process>,
}

impl ProcessTable {
    pub fn new() -> Self {
        ProcessTable {
            procs: BTreeMap::new(),
        }
    }

    /// Insert a process.
    ///
    /// # Panics
    /// Panics if a process with the same PID is already live.
    pub fn insert(&mut self, process: Process) {
        let pid = process.pid;
        let prev = self.procs.insert(pid, process);
        assert!(prev.is_none(), "pid {pid} inserted twice");
    }

    pub fn remove(&mut self, pid: Pid) -> Option<Process> {
        self.procs.remove(&pid)
    }

    pub fn get(&self, pid: Pid) -> Option<&Process> {
        self.procs.get(&pid)
    }

    pub fn get_mut(&mut self, pid: Pid) -> Option<&mut Process> {
        self.procs.get_mut(&pid)
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.procs.contains_key(&pid)
    }

    pub fn len(&self) -> usize {
        self.procs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.procs.is_empty()
    }

    /// Iterate live processes in PID order.
    pub fn iter(&self) -> impl Iterator<Item = &Process> {
        self.procs.values()
    }
}

impl Index<Pid> for ProcessTable {
    type Output = Process;

    fn index(&self, pid: Pid) -> &Process {
        self.procs
            .get(&pid)
            .unwrap_or_else(|| panic!("no live process with pid {pid}"))
    }
}

impl IndexMut<Pid> for ProcessTable {
    fn index_mut(&mut self, pid: Pid) -> &mut Process {
        self.procs
            .get_mut(&pid)
            .unwrap_or_else(|| panic!("no live process with pid {pid}"))
    }
}
