//! Live-instance registry
//!
//! Each definition owns one registry holding its initialized instances in
//! registration order. Removal is idempotent and iteration always happens
//! over a snapshot, so teardown may remove arbitrary entries while a bulk
//! teardown is walking the list.

use std::collections::HashSet;

use crate::instance::{Instance, InstanceId};
use crate::node::NodeRef;

#[derive(Default)]
pub(crate) struct LiveRegistry {
    /// Registered instances, oldest first
    entries: Vec<Instance>,
    /// Membership index
    members: HashSet<InstanceId>,
}

impl LiveRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register an instance. Returns false if it was already registered.
    pub(crate) fn insert(&mut self, instance: Instance) -> bool {
        if !self.members.insert(instance.id()) {
            return false;
        }
        self.entries.push(instance);
        true
    }

    /// Deregister an instance. Removing an absent instance is a no-op.
    pub(crate) fn remove(&mut self, id: InstanceId) -> bool {
        if !self.members.remove(&id) {
            return false;
        }
        self.entries.retain(|instance| instance.id() != id);
        true
    }

    pub(crate) fn contains(&self, id: InstanceId) -> bool {
        self.members.contains(&id)
    }

    pub(crate) fn snapshot(&self) -> Vec<Instance> {
        self.entries.clone()
    }

    pub(crate) fn bound_to(&self, node: &NodeRef) -> Vec<Instance> {
        self.entries
            .iter()
            .filter(|instance| instance.node().is_some_and(|n| n.same(node)))
            .cloned()
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
