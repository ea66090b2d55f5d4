//! Workload definition, builder API and JSON loader.
//!
//! A workload lists processes with their arrival tick, lifespan, priority
//! and resource uses. Workload files are JSON:
//!
//! ```json
//! {
//!   "max_ticks": 200,
//!   "processes": [
//!     { "name": "low", "lifespan": 8, "priority": 1,
//!       "resources": [ { "resource": 0, "at": 1, "duration": 4 } ] },
//!     { "name": "high", "arrival": 2, "lifespan": 3, "priority": 9,
//!       "resources": [ { "resource": 0, "at": 0, "duration": 2 } ] }
//!   ]
//! }
//! ```
//!
//! PIDs are assigned in file order starting at 0.

use std::path::Path;

use serde::Deserialize;

use crate::error::ScenarioError;
use crate::types::{Pid, Priority, ResourceId, Tick, MAX_PRIO, NR_RESOURCES};

/// Default tick budget for a run.
pub const DEFAULT_MAX_TICKS: Tick = 10_000;

/// One exclusive use of a resource: acquired when the process's age reaches
/// `at`, released once it has run `duration` more ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ResourceUse {
    pub resource: usize,
    pub at: Tick,
    pub duration: Tick,
}

impl ResourceUse {
    pub fn rid(&self) -> ResourceId {
        ResourceId(self.resource)
    }

    /// Age at which the resource is released.
    pub fn release_at(&self) -> Tick {
        self.at + self.duration
    }
}

/// Definition of a process for scenario creation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProcessDef {
    pub name: String,
    #[serde(skip)]
    pub pid: Pid,
    /// Tick at which the process enters the ready collection.
    #[serde(default)]
    pub arrival: Tick,
    pub lifespan: Tick,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub resources: Vec<ResourceUse>,
}

impl ProcessDef {
    pub fn new(name: &str, lifespan: Tick) -> Self {
        ProcessDef {
            name: name.to_string(),
            pid: Pid::default(),
            arrival: 0,
            lifespan,
            priority: 0,
            resources: Vec::new(),
        }
    }

    pub fn arrival(mut self, tick: Tick) -> Self {
        self.arrival = tick;
        self
    }

    pub fn priority(mut self, prio: Priority) -> Self {
        self.priority = prio;
        self
    }

    /// Hold `resource` from age `at` for `duration` ticks.
    pub fn uses(mut self, resource: usize, at: Tick, duration: Tick) -> Self {
        self.resources.push(ResourceUse {
            resource,
            at,
            duration,
        });
        self
    }

    fn invalid(&self, msg: String) -> ScenarioError {
        ScenarioError::InvalidValue {
            process: self.name.clone(),
            msg,
        }
    }

    fn validate(&self) -> Result<(), ScenarioError> {
        if self.lifespan == 0 {
            return Err(self.invalid("lifespan must be at least 1".into()));
        }
        if self.priority > MAX_PRIO {
            return Err(self.invalid(format!(
                "priority {} exceeds MAX_PRIO {MAX_PRIO}",
                self.priority
            )));
        }
        for u in &self.resources {
            if !u.rid().is_valid() {
                return Err(self.invalid(format!(
                    "resource {} out of range (0..{NR_RESOURCES})",
                    u.resource
                )));
            }
            if u.duration == 0 {
                return Err(self.invalid(format!(
                    "use of resource {} has zero duration",
                    u.resource
                )));
            }
            if u.release_at() > self.lifespan {
                return Err(self.invalid(format!(
                    "use of resource {} ends at age {} past lifespan {}",
                    u.resource,
                    u.release_at(),
                    self.lifespan
                )));
            }
        }

        let mut uses = self.resources.clone();
        uses.sort_by_key(|u| (u.resource, u.at));
        for pair in uses.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if a.resource == b.resource && b.at < a.release_at() {
                return Err(self.invalid(format!(
                    "overlapping uses of resource {} at ages {} and {}",
                    a.resource, a.at, b.at
                )));
            }
        }
        Ok(())
    }
}

/// A complete simulation scenario.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub processes: Vec<ProcessDef>,
    /// The run stops with `ExitKind::TickLimit` when this tick is reached.
    pub max_ticks: Tick,
}

/// Builder for constructing scenarios.
pub struct ScenarioBuilder {
    processes: Vec<ProcessDef>,
    max_ticks: Tick,
}

/// On-disk workload layout.
#[derive(Debug, Deserialize)]
struct WorkloadFile {
    #[serde(default)]
    max_ticks: Option<Tick>,
    processes: Vec<ProcessDef>,
}

impl Scenario {
    pub fn builder() -> ScenarioBuilder {
        ScenarioBuilder {
            processes: Vec::new(),
            max_ticks: DEFAULT_MAX_TICKS,
        }
    }

    /// Parse a JSON workload.
    pub fn from_json(json: &str) -> Result<Scenario, ScenarioError> {
        let file: WorkloadFile = serde_json::from_str(json)?;
        file.processes
            .into_iter()
            .fold(Scenario::builder(), ScenarioBuilder::add)
            .max_ticks(file.max_ticks.unwrap_or(DEFAULT_MAX_TICKS))
            .try_build()
    }

    /// Read and parse a JSON workload file.
    pub fn from_file(path: &Path) -> Result<Scenario, ScenarioError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn process(&self, pid: Pid) -> Option<&ProcessDef> {
        self.processes.iter().find(|d| d.pid == pid)
    }

    /// PID of the process with the given name.
    pub fn pid_of(&self, name: &str) -> Option<Pid> {
        self.processes.iter().find(|d| d.name == name).map(|d| d.pid)
    }
}

impl ScenarioBuilder {
    /// Add a process; its PID is its position in the scenario.
    pub fn add(mut self, mut def: ProcessDef) -> Self {
        def.pid = Pid(self.processes.len() as u32);
        self.processes.push(def);
        self
    }

    /// Convenience: add a process with no resource uses.
    pub fn process(self, name: &str, arrival: Tick, lifespan: Tick, priority: Priority) -> Self {
        self.add(
            ProcessDef::new(name, lifespan)
                .arrival(arrival)
                .priority(priority),
        )
    }

    pub fn max_ticks(mut self, ticks: Tick) -> Self {
        self.max_ticks = ticks;
        self
    }

    /// Validate and build the scenario.
    pub fn try_build(self) -> Result<Scenario, ScenarioError> {
        if self.processes.is_empty() {
            return Err(ScenarioError::Empty);
        }
        for def in &self.processes {
            def.validate()?;
        }
        Ok(Scenario {
            processes: self.processes,
            max_ticks: self.max_ticks,
        })
    }

    /// Build the scenario.
    ///
    /// # Panics
    /// Panics if the scenario is invalid; use [`try_build`](Self::try_build)
    /// for untrusted input.
    pub fn build(self) -> Scenario {
        self.try_build()
            .unwrap_or_else(|e| panic!("invalid scenario: {e}"))
    }
}
