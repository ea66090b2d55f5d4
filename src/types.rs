//! Newtype wrappers and type aliases for domain concepts.
//!
//! Newtypes for identifiers (process IDs, resource IDs) prevent silently
//! passing one where the other is expected. Plain quantities (ticks,
//! priorities) are aliases: they are compared and incremented far more
//! often than they are confused with each other.

use std::fmt;

/// Process identifier. Stable for the lifetime of a process in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Pid(pub u32);

/// Index of one of the `NR_RESOURCES` exclusive resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub usize);

/// Simulated time in ticks.
pub type Tick = u64;

/// Scheduling priority. Higher numeric value means higher priority.
pub type Priority = u32;

/// Upper bound for every effective and original priority. Also the ceiling
/// a resource owner is raised to under the priority ceiling protocol.
pub const MAX_PRIO: Priority = 100;

/// Number of exclusive resources in the system.
pub const NR_RESOURCES: usize = 32;

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

impl ResourceId {
    /// Whether this ID addresses an existing resource slot.
    pub fn is_valid(self) -> bool {
        self.0 < NR_RESOURCES
    }
}
