//! Error types.
//!
//! Contract breaches inside a policy (a non-owner releasing a resource, a
//! process queued twice) are panics: they mean the policy itself is broken.
//! The types here cover everything else: bad user input and inconsistencies
//! the host detects between ticks.

use std::fmt;

use crate::types::{Pid, ResourceId};

/// Errors from selecting or activating a scheduling policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedError {
    /// No registered policy has this short name.
    UnknownPolicy(String),
    /// `initialize()` refused to activate the policy.
    InitFailed { policy: &'static str, reason: String },
}

impl fmt::Display for SchedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedError::UnknownPolicy(name) => write!(f, "unknown policy {name:?}"),
            SchedError::InitFailed { policy, reason } => {
                write!(f, "failed to initialize {policy}: {reason}")
            }
        }
    }
}

impl std::error::Error for SchedError {}

/// Errors from loading or validating a workload.
#[derive(Debug)]
pub enum ScenarioError {
    /// Failed to read the workload file.
    Io(std::io::Error),
    /// JSON parse error.
    Json(serde_json::Error),
    /// The workload has no processes.
    Empty,
    /// Invalid field value, with the offending process named.
    InvalidValue { process: String, msg: String },
}

impl fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioError::Io(e) => write!(f, "I/O error: {e}"),
            ScenarioError::Json(e) => write!(f, "JSON parse error: {e}"),
            ScenarioError::Empty => write!(f, "workload has no processes"),
            ScenarioError::InvalidValue { process, msg } => {
                write!(f, "process {process:?}: {msg}")
            }
        }
    }
}

impl std::error::Error for ScenarioError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScenarioError::Io(e) => Some(e),
            ScenarioError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ScenarioError {
    fn from(e: std::io::Error) -> Self {
        ScenarioError::Io(e)
    }
}

impl From<serde_json::Error> for ScenarioError {
    fn from(e: serde_json::Error) -> Self {
        ScenarioError::Json(e)
    }
}

/// A broken scheduling invariant detected by [`SchedContext::verify`].
///
/// [`SchedContext::verify`]: crate::context::SchedContext::verify
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// More than one process is RUNNING.
    MultipleRunning(Vec<Pid>),
    /// A RUNNING process is not the current process.
    RunningNotCurrent(Pid),
    /// The current process is not RUNNING (and not blocked mid-request).
    CurrentNotRunning(Pid),
    /// A process sits in more than one container at once.
    MultipleMembership(Pid),
    /// A READY process is in neither the ready collection nor a buffer.
    ReadyNotQueued(Pid),
    /// A BLOCKED process is not in exactly one wait collection.
    BlockedNotWaiting(Pid),
    /// A RUNNING process is still present in some container.
    RunningQueued(Pid),
    /// A container references a PID that is not in the arena.
    UnknownPid(Pid),
    /// A resource is owned by a PID that is not in the arena.
    DanglingOwner(ResourceId, Pid),
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use InvariantViolation::*;
        match self {
            MultipleRunning(pids) => write!(f, "multiple RUNNING processes: {pids:?}"),
            RunningNotCurrent(pid) => write!(f, "pid {pid} is RUNNING but not current"),
            CurrentNotRunning(pid) => write!(f, "current pid {pid} is not RUNNING"),
            MultipleMembership(pid) => write!(f, "pid {pid} is in more than one queue"),
            ReadyNotQueued(pid) => write!(f, "pid {pid} is READY but not queued"),
            BlockedNotWaiting(pid) => {
                write!(f, "pid {pid} is BLOCKED but not in a wait collection")
            }
            RunningQueued(pid) => write!(f, "pid {pid} is RUNNING and still queued"),
            UnknownPid(pid) => write!(f, "queued pid {pid} is not a live process"),
            DanglingOwner(rid, pid) => write!(f, "{rid} owned by dead pid {pid}"),
        }
    }
}

impl std::error::Error for InvariantViolation {}
