//! Exclusive resources and their wait collections.

use crate::queue::PidQueue;
use crate::types::{Pid, ResourceId, NR_RESOURCES};

/// A mutually-exclusive resource.
#[derive(Debug, Clone, Default)]
pub struct Resource {
    /// Process holding the resource, `None` when free.
    pub owner: Option<Pid>,
    /// Processes blocked on this resource.
    pub waitqueue: PidQueue,
}

impl Resource {
    pub fn is_free(&self) -> bool {
        self.owner.is_none()
    }
}

/// The fixed set of `NR_RESOURCES` resources.
#[derive(Debug)]
pub struct ResourceTable {
    slots: Vec<Resource>,
}

impl ResourceTable {
    pub fn new() -> Self {
        ResourceTable {
            slots: vec![Resource::default(); NR_RESOURCES],
        }
    }

    /// # Panics
    /// Panics if `rid` is out of range; the host bounds-checks requests.
    pub fn get(&self, rid: ResourceId) -> &Resource {
        assert!(rid.is_valid(), "resource id {} out of range", rid.0);
        &self.slots[rid.0]
    }

    pub fn get_mut(&mut self, rid: ResourceId) -> &mut Resource {
        assert!(rid.is_valid(), "resource id {} out of range", rid.0);
        &mut self.slots[rid.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResourceId, &Resource)> {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, r)| (ResourceId(i), r))
    }

    /// Resources currently owned by `pid`.
    pub fn owned_by(&self, pid: Pid) -> impl Iterator<Item = (ResourceId, &Resource)> {
        self.iter().filter(move |(_, r)| r.owner == Some(pid))
    }

    /// The resource `pid` is blocked on, if any.
    pub fn waiting_on(&self, pid: Pid) -> Option<ResourceId> {
        self.iter()
            .find(|(_, r)| r.waitqueue.contains(pid))
            .map(|(rid, _)| rid)
    }
}

impl Default for ResourceTable {
    fn default() -> Self {
        Self::new()
    }
}
