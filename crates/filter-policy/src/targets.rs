use std::collections::BTreeMap;

use tracing::debug;

use crate::matcher::Interest;
use crate::metadata::TargetRule;
use crate::registry::ObjectRegistry;
use crate::types::NodeId;

/// Logical target name → currently resolved node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetCache {
    entries: BTreeMap<String, NodeId>,
}

impl TargetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<NodeId> {
        self.entries.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.entries.iter().map(|(name, id)| (name.as_str(), *id))
    }

    /// Resolve every rule against the live node set, replacing the whole
    /// cache. Returns true if any name now resolves to a different node
    /// (including names that appeared or disappeared).
    pub fn rebuild<R: ObjectRegistry + ?Sized>(&mut self, rules: &[TargetRule], registry: &R) -> bool {
        let previous = std::mem::take(&mut self.entries);

        for rule in rules {
            let interest = Interest::target_candidates().extend(rule.constraints.iter().cloned());
            match registry.lookup(&interest) {
                Some(node) => {
                    self.entries.insert(rule.name.clone(), node.id);
                }
                None => debug!("target '{}' does not resolve to any node", rule.name),
            }
        }

        previous != self.entries
    }

    pub fn clear(&mut self) -> bool {
        let changed = !self.entries.is_empty();
        self.entries.clear();
        changed
    }
}
