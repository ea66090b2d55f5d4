//! Trace event recording for the simulator.
//!
//! Every scheduling action (admission, dispatch, a tick of execution, a
//! resource grant, block or release, an exit) is recorded as a
//! `TraceEvent` stamped with the tick it happened on.

use std::fmt;

use crate::types::{Pid, Priority, ResourceId, Tick};

/// A single trace event produced by the simulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEvent {
    pub tick: Tick,
    pub kind: TraceKind,
}

/// The type of scheduling event recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceKind {
    /// A process arrived and entered the ready collection.
    Admitted { pid: Pid },
    /// The policy switched the CPU to a different process.
    Dispatched { pid: Pid },
    /// A process ran for this tick at the given effective priority.
    Ran { pid: Pid, priority: Priority },
    /// Nothing was runnable this tick.
    Idle,
    Acquired { pid: Pid, rid: ResourceId },
    Blocked { pid: Pid, rid: ResourceId },
    Released { pid: Pid, rid: ResourceId },
    /// A process reached its lifespan and left the system.
    Exited { pid: Pid },
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitKind {
    /// Every process ran to completion.
    Normal,
    /// The scenario's tick budget ran out first.
    TickLimit,
    /// The scheduler broke an invariant; the run was stopped.
    Fault(String),
}

impl fmt::Display for ExitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitKind::Normal => write!(f, "normal"),
            ExitKind::TickLimit => write!(f, "tick limit reached"),
            ExitKind::Fault(msg) => write!(f, "fault: {msg}"),
        }
    }
}

/// A complete simulation trace, containing all events in chronological order.
#[derive(Debug, Clone)]
pub struct Trace {
    policy: &'static str,
    events: Vec<TraceEvent>,
    exit: ExitKind,
    ticks: Tick,
}

impl Trace {
    pub(crate) fn new(policy: &'static str) -> Self {
        Self {
            policy,
            events: Vec::new(),
            exit: ExitKind::Normal,
            ticks: 0,
        }
    }

    pub(crate) fn record(&mut self, tick: Tick, kind: TraceKind) {
        self.events.push(TraceEvent { tick, kind });
    }

    pub(crate) fn finish(&mut self, ticks: Tick, exit: ExitKind) {
        self.ticks = ticks;
        self.exit = exit;
    }

    /// Name of the policy that produced this trace.
    pub fn policy(&self) -> &'static str {
        self.policy
    }

    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    pub fn exit_kind(&self) -> &ExitKind {
        &self.exit
    }

    pub fn has_fault(&self) -> bool {
        matches!(self.exit, ExitKind::Fault(_))
    }

    /// Number of ticks simulated.
    pub fn total_ticks(&self) -> Tick {
        self.ticks
    }

    /// Who ran on each tick, in order; `None` for idle ticks.
    pub fn timeline(&self) -> Vec<Option<Pid>> {
        self.events
            .iter()
            .filter_map(|e| match e.kind {
                TraceKind::Ran { pid, .. } => Some(Some(pid)),
                TraceKind::Idle => Some(None),
                _ => None,
            })
            .collect()
    }

    /// Ticks of CPU time a process received.
    pub fn runtime(&self, pid: Pid) -> Tick {
        self.events
            .iter()
            .filter(|e| matches!(e.kind, TraceKind::Ran { pid: p, .. } if p == pid))
            .count() as Tick
    }

    /// Tick on which a process first ran.
    pub fn first_run(&self, pid: Pid) -> Option<Tick> {
        self.events.iter().find_map(|e| match e.kind {
            TraceKind::Ran { pid: p, .. } if p == pid => Some(e.tick),
            _ => None,
        })
    }

    /// Tick at whose end a process exited.
    pub fn exit_tick(&self, pid: Pid) -> Option<Tick> {
        self.events.iter().find_map(|e| match e.kind {
            TraceKind::Exited { pid: p } if p == pid => Some(e.tick),
            _ => None,
        })
    }

    /// Effective priority of a process on each tick it ran.
    pub fn priorities(&self, pid: Pid) -> Vec<(Tick, Priority)> {
        self.events
            .iter()
            .filter_map(|e| match e.kind {
                TraceKind::Ran { pid: p, priority } if p == pid => Some((e.tick, priority)),
                _ => None,
            })
            .collect()
    }

    /// Count events matching a predicate.
    pub fn count(&self, pred: impl Fn(&TraceKind) -> bool) -> usize {
        self.events.iter().filter(|e| pred(&e.kind)).count()
    }

    /// Order in which processes were granted `rid`.
    pub fn grants(&self, rid: ResourceId) -> Vec<Pid> {
        self.events
            .iter()
            .filter_map(|e| match e.kind {
                TraceKind::Acquired { pid, rid: r } if r == rid => Some(pid),
                _ => None,
            })
            .collect()
    }

    /// Pretty-print the trace for debugging.
    pub fn dump(&self) {
        for event in &self.events {
            let desc = match event.kind {
                TraceKind::Admitted { pid } => format!("ADMIT    pid={pid}"),
                TraceKind::Dispatched { pid } => format!("DISPATCH pid={pid}"),
                TraceKind::Ran { pid, priority } => format!("RUN      pid={pid} prio={priority}"),
                TraceKind::Idle => "IDLE".to_string(),
                TraceKind::Acquired { pid, rid } => format!("ACQUIRE  pid={pid} {rid}"),
                TraceKind::Blocked { pid, rid } => format!("BLOCK    pid={pid} {rid}"),
                TraceKind::Released { pid, rid } => format!("RELEASE  pid={pid} {rid}"),
                TraceKind::Exited { pid } => format!("EXIT     pid={pid}"),
            };
            eprintln!("[{:>8}] {}", event.tick, desc);
        }
        eprintln!("{}: {} ticks, {}", self.policy, self.ticks, self.exit);
    }
}
