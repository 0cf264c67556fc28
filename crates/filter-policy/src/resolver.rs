//! Chain queries: where a filter's output goes, and which filter a stream
//! should enter to reach a device.
//!
//! Filters sharing a target form a chain in ascending priority order. A
//! filter feeds the nearest lower-priority enabled filter with the same
//! target; the lowest one feeds the target device itself. Filters without a
//! target chain the same way and end at the graph's default device.

use crate::filters::FilterRegistry;
use crate::targets::TargetCache;
use crate::types::{Direction, NodeId};

/// Read-only view over the filter registry and target cache.
#[derive(Debug, Clone, Copy)]
pub struct ChainResolver<'a> {
    filters: &'a FilterRegistry,
    targets: &'a TargetCache,
}

impl<'a> ChainResolver<'a> {
    pub fn new(filters: &'a FilterRegistry, targets: &'a TargetCache) -> Self {
        Self { filters, targets }
    }

    /// Unknown filters are reported as disabled.
    pub fn is_enabled(&self, direction: Direction, group_key: &str) -> bool {
        self.filters
            .find(direction, group_key)
            .is_some_and(|filter| filter.enabled)
    }

    /// The node the filter `group_key` should link its output to.
    ///
    /// `None` means "no opinion": the filter is unknown or disabled, or it is
    /// last in its chain and its target is unset or does not resolve. A
    /// neighbour whose device half has not appeared yet also yields `None`.
    pub fn resolve_target(&self, direction: Direction, group_key: &str) -> Option<NodeId> {
        let chain = self.filters.chain(direction);
        let filter = chain.get(group_key).filter(|f| f.enabled)?;

        if let Some(next) = chain
            .before(group_key)
            .find(|other| other.enabled && other.target == filter.target)
        {
            return next.device_node;
        }

        filter
            .target
            .as_deref()
            .and_then(|target| self.targets.get(target))
    }

    /// The entry point of the chain leading to `target_id`: the device node
    /// of the highest-priority enabled filter sharing a target with the
    /// filter that links directly to `target_id`. Returns `target_id` when no
    /// enabled filter leads there.
    pub fn resolve_filter_for_target(&self, direction: Direction, target_id: NodeId) -> NodeId {
        let chain = self.filters.chain(direction);

        let Some(linked) = chain
            .iter()
            .filter(|f| f.enabled)
            .find(|f| self.resolve_target(direction, &f.group_key) == Some(target_id))
        else {
            return target_id;
        };

        chain
            .iter()
            .rev()
            .find(|f| f.enabled && f.target == linked.target)
            .and_then(|f| f.device_node)
            .unwrap_or(target_id)
    }

    /// Entry point of the chain of filters with no target, i.e. the filter
    /// that should stand in for the default device.
    pub fn default_filter(&self, direction: Direction) -> Option<NodeId> {
        self.filters
            .chain(direction)
            .iter()
            .rev()
            .find(|f| f.enabled && f.target.is_none())
            .and_then(|f| f.device_node)
    }
}
