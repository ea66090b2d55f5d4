//! sched_sim - Deterministic tick-driven CPU scheduling simulator.
//!
//! A single simulated CPU runs a set of processes under a pluggable
//! scheduling policy. Processes may hold exclusive resources; contention is
//! arbitrated by the protocol the policy pairs with (FCFS, priority-ordered,
//! priority ceiling or priority inheritance).
//!
//! # Architecture
//!
//! - **Context**: per-simulation state (process arena, ready collection,
//!   resources, current process) and the status transitions between them
//! - **Policies**: FIFO, SJF, STCF, round-robin and the priority family,
//!   each a [`Scheduler`]
//! - **Arbitration**: the acquire/release protocols
//! - **Engine**: the tick loop that drives a policy over a [`Scenario`]
//!   and records a [`Trace`]
//!
//! # Usage
//!
//! ```rust,no_run
//! use sched_sim::*;
//!
//! let scenario = Scenario::builder()
//!     .add(ProcessDef::new("low", 8).priority(1).uses(0, 1, 4))
//!     .add(ProcessDef::new("high", 3).arrival(2).priority(9).uses(0, 0, 2))
//!     .build();
//!
//! let trace = Simulator::new(PolicyKind::PriorityInheritance.build())
//!     .run(&scenario)
//!     .unwrap();
//! trace.dump();
//! ```

pub mod arbitration;
pub mod context;
pub mod engine;
pub mod error;
pub mod fmt;
pub mod policy;
pub mod process;
pub mod queue;
pub mod resource;
pub mod scenario;
pub mod trace;
pub mod types;

// Re-export the main public types for convenience.
pub use arbitration::Arbitration;
pub use context::{SchedContext, WaitOrder};
pub use engine::Simulator;
pub use error::{InvariantViolation, ScenarioError, SchedError};
pub use fmt::{set_sim_clock, sim_clock, SimFormat};
pub use policy::{PolicyKind, Scheduler};
pub use process::{Process, ProcessStatus};
pub use scenario::{ProcessDef, ResourceUse, Scenario};
pub use trace::{ExitKind, Trace, TraceEvent, TraceKind};
pub use types::{Pid, Priority, ResourceId, Tick, MAX_PRIO, NR_RESOURCES};
