//! Ordered PID containers.
//!
//! The ready collection, every resource's wait collection and the policies'
//! reinsertion buffers are all a `PidQueue`: a FIFO of process IDs that
//! preserves insertion order exactly. All "first process reaching the
//! maximum" selections scan front to back, so tie-breaks are always
//! resolved in insertion order.

use std::collections::VecDeque;

use crate::types::Pid;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PidQueue {
    entries: VecDeque<Pid>,
}

impl PidQueue {
    pub fn new() -> Self {
        PidQueue {
            entries: VecDeque::new(),
        }
    }

    /// Append at the tail.
    ///
    /// # Panics
    /// Panics if `pid` is already queued: a process may appear at most once
    /// in a given container.
    pub fn push_back(&mut self, pid: Pid) {
        assert!(!self.contains(pid), "pid {pid} queued twice");
        self.entries.push_back(pid);
    }

    /// Insert at the head.
    ///
    /// # Panics
    /// Panics if `pid` is already queued.
    pub fn push_front(&mut self, pid: Pid) {
        assert!(!self.contains(pid), "pid {pid} queued twice");
        self.entries.push_front(pid);
    }

    /// Insert after every entry whose key is `>=` `key`, i.e. descending by
    /// key and FIFO among equal keys.
    pub fn insert_ordered_by<F>(&mut self, pid: Pid, key: F)
    where
        F: Fn(Pid) -> u32,
    {
        assert!(!self.contains(pid), "pid {pid} queued twice");
        let k = key(pid);
        let pos = self
            .entries
            .iter()
            .position(|&p| key(p) < k)
            .unwrap_or(self.entries.len());
        self.entries.insert(pos, pid);
    }

    pub fn pop_front(&mut self) -> Option<Pid> {
        self.entries.pop_front()
    }

    pub fn front(&self) -> Option<Pid> {
        self.entries.front().copied()
    }

    /// Remove a specific PID. Returns true if it was queued.
    pub fn remove(&mut self, pid: Pid) -> bool {
        match self.entries.iter().position(|&p| p == pid) {
            Some(pos) => {
                self.entries.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.entries.contains(&pid)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Pid> + '_ {
        self.entries.iter().copied()
    }

    /// Move every entry, in order, to the tail of `dst`.
    pub fn drain_into(&mut self, dst: &mut PidQueue) {
        while let Some(pid) = self.entries.pop_front() {
            dst.push_back(pid);
        }
    }

    /// First entry with the largest key.
    pub fn first_max_by<F>(&self, key: F) -> Option<Pid>
    where
        F: Fn(Pid) -> u32,
    {
        let mut best: Option<(Pid, u32)> = None;
        for pid in self.iter() {
            let k = key(pid);
            if best.map_or(true, |(_, bk)| k > bk) {
                best = Some((pid, k));
            }
        }
        best.map(|(pid, _)| pid)
    }

    /// First entry with the smallest key.
    pub fn first_min_by<F>(&self, key: F) -> Option<Pid>
    where
        F: Fn(Pid) -> u64,
    {
        let mut best: Option<(Pid, u64)> = None;
        for pid in self.iter() {
            let k = key(pid);
            if best.map_or(true, |(_, bk)| k < bk) {
                best = Some((pid, k));
            }
        }
        best.map(|(pid, _)| pid)
    }

    pub fn to_vec(&self) -> Vec<Pid> {
        self.entries.iter().copied().collect()
    }
}

impl FromIterator<Pid> for PidQueue {
    fn from_iter<I: IntoIterator<Item = Pid>>(iter: I) -> Self {
        let mut q = PidQueue::new();
        for pid in iter {
            q.push_back(pid);
        }
        q
    }
}
