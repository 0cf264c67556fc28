//! Filter records and the per-direction registry that keeps them ordered.
//!
//! Each direction is an ordered map keyed by `(priority, group_key)`, so
//! iteration order is the chain order and a backward range scan from any
//! filter yields its lower-priority neighbours. Any mutation that can touch
//! the priority goes through [`FilterChain::modify`] or
//! [`FilterChain::modify_all`], which re-key the affected entries.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::counters::StreamCounters;
use crate::metadata::{FilterRule, Mode};
use crate::types::{Direction, FilterRole, NodeId};

/// One filter unit: the device-side and stream-side nodes sharing a link group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub group_key: String,
    pub direction: Direction,
    pub device_node: Option<NodeId>,
    pub stream_node: Option<NodeId>,
    pub target: Option<String>,
    pub enabled: bool,
    pub priority: i32,
}

impl Filter {
    pub fn new(group_key: impl Into<String>, direction: Direction, priority: i32) -> Self {
        Self {
            group_key: group_key.into(),
            direction,
            device_node: None,
            stream_node: None,
            target: None,
            enabled: true,
            priority,
        }
    }

    pub fn node(&self, role: FilterRole) -> Option<NodeId> {
        match role {
            FilterRole::Device => self.device_node,
            FilterRole::Stream => self.stream_node,
        }
    }

    /// Bind `node` in `role`, returning true if the binding changed.
    pub fn bind(&mut self, role: FilterRole, node: NodeId) -> bool {
        let slot = match role {
            FilterRole::Device => &mut self.device_node,
            FilterRole::Stream => &mut self.stream_node,
        };
        slot.replace(node) != Some(node)
    }

    pub fn is_complete(&self) -> bool {
        self.device_node.is_some() && self.stream_node.is_some()
    }

    /// Apply a matching configuration record. Returns true if `target`,
    /// `enabled` or `priority` changed.
    pub fn apply_rule(&mut self, rule: &FilterRule, counters: &StreamCounters) -> bool {
        let mut changed = false;

        if self.target != rule.target {
            self.target = rule.target.clone();
            changed = true;
        }

        if let Some(mode) = rule.mode {
            let enabled = match mode {
                Mode::Always => true,
                Mode::Never => false,
                Mode::PlaybackOnly => counters.has_streams(Direction::Playback),
                Mode::CaptureOnly => counters.has_streams(Direction::Capture),
            };
            if self.enabled != enabled {
                self.enabled = enabled;
                changed = true;
            }
        }

        if let Some(priority) = rule.priority {
            if self.priority != priority {
                self.priority = priority;
                changed = true;
            }
        }

        changed
    }

    fn sort_key(&self) -> SortKey {
        SortKey {
            priority: self.priority,
            group_key: self.group_key.clone(),
        }
    }
}

/// Total order of a chain: priority ascending, then group key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct SortKey {
    priority: i32,
    group_key: String,
}

/// The filters of one direction, always sorted.
#[derive(Debug, Clone, Default)]
pub struct FilterChain {
    entries: BTreeMap<SortKey, Filter>,
    priorities: HashMap<String, i32>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn key_of(&self, group_key: &str) -> Option<SortKey> {
        self.priorities.get(group_key).map(|priority| SortKey {
            priority: *priority,
            group_key: group_key.to_string(),
        })
    }

    pub fn get(&self, group_key: &str) -> Option<&Filter> {
        let key = self.key_of(group_key)?;
        self.entries.get(&key)
    }

    pub fn contains(&self, group_key: &str) -> bool {
        self.priorities.contains_key(group_key)
    }

    /// Insert a filter at its sorted position, replacing any filter with the
    /// same group key.
    pub fn insert(&mut self, filter: Filter) -> Option<Filter> {
        let previous = self.remove(&filter.group_key);
        self.priorities
            .insert(filter.group_key.clone(), filter.priority);
        self.entries.insert(filter.sort_key(), filter);
        previous
    }

    pub fn remove(&mut self, group_key: &str) -> Option<Filter> {
        let key = self.key_of(group_key)?;
        self.priorities.remove(group_key);
        self.entries.remove(&key)
    }

    /// Mutate one filter and restore the ordering afterwards.
    ///
    /// Returns whatever `f` returned, or `None` if the filter does not exist.
    pub fn modify<R>(&mut self, group_key: &str, f: impl FnOnce(&mut Filter) -> R) -> Option<R> {
        let mut filter = self.remove(group_key)?;
        let result = f(&mut filter);
        self.insert(filter);
        Some(result)
    }

    /// Mutate every filter and re-sort. Returns true if any call returned true.
    pub fn modify_all(&mut self, mut f: impl FnMut(&mut Filter) -> bool) -> bool {
        let mut changed = false;
        let filters: Vec<Filter> = std::mem::take(&mut self.entries).into_values().collect();
        self.priorities.clear();
        for mut filter in filters {
            if f(&mut filter) {
                changed = true;
            }
            self.insert(filter);
        }
        changed
    }

    /// Filters in chain order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Filter> {
        self.entries.values()
    }

    /// Filters ordered before `group_key`, nearest first.
    pub fn before(&self, group_key: &str) -> impl Iterator<Item = &Filter> {
        let range = self
            .key_of(group_key)
            .map(|key| self.entries.range(..key))
            .into_iter()
            .flatten();
        range.rev().map(|(_, filter)| filter)
    }

    pub fn group_keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|key| key.group_key.as_str())
    }
}

/// Both chains.
#[derive(Debug, Clone, Default)]
pub struct FilterRegistry {
    playback: FilterChain,
    capture: FilterChain,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chain(&self, direction: Direction) -> &FilterChain {
        match direction {
            Direction::Playback => &self.playback,
            Direction::Capture => &self.capture,
        }
    }

    pub fn chain_mut(&mut self, direction: Direction) -> &mut FilterChain {
        match direction {
            Direction::Playback => &mut self.playback,
            Direction::Capture => &mut self.capture,
        }
    }

    pub fn find(&self, direction: Direction, group_key: &str) -> Option<&Filter> {
        self.chain(direction).get(group_key)
    }

    pub fn remove(&mut self, direction: Direction, group_key: &str) -> Option<Filter> {
        self.chain_mut(direction).remove(group_key)
    }

    pub fn len(&self) -> usize {
        self.playback.len() + self.capture.len()
    }

    pub fn is_empty(&self) -> bool {
        self.playback.is_empty() && self.capture.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(group: &str, priority: i32) -> Filter {
        Filter::new(group, Direction::Playback, priority)
    }

    fn order(chain: &FilterChain) -> Vec<&str> {
        chain.group_keys().collect()
    }

    #[test]
    fn test_sorted_by_priority_then_key() {
        let mut chain = FilterChain::new();
        chain.insert(filter("loopback-1", 300));
        chain.insert(filter("b-eq", 100));
        chain.insert(filter("echo-cancel", 0));
        chain.insert(filter("a-eq", 100));

        assert_eq!(order(&chain), vec!["echo-cancel", "a-eq", "b-eq", "loopback-1"]);
    }

    #[test]
    fn test_order_independent_of_insertion() {
        let filters = [filter("x", 5), filter("y", 5), filter("z", 1)];

        let mut forward = FilterChain::new();
        for f in filters.iter().cloned() {
            forward.insert(f);
        }
        let mut backward = FilterChain::new();
        for f in filters.iter().rev().cloned() {
            backward.insert(f);
        }

        assert_eq!(order(&forward), order(&backward));
    }

    #[test]
    fn test_modify_resorts() {
        let mut chain = FilterChain::new();
        chain.insert(filter("a", 10));
        chain.insert(filter("b", 20));

        let changed = chain.modify("a", |f| {
            f.priority = 30;
            true
        });
        assert_eq!(changed, Some(true));
        assert_eq!(order(&chain), vec!["b", "a"]);
        assert_eq!(chain.get("a").map(|f| f.priority), Some(30));

        assert_eq!(chain.modify("missing", |_| true), None);
    }

    #[test]
    fn test_modify_all_resorts() {
        let mut chain = FilterChain::new();
        chain.insert(filter("a", 1));
        chain.insert(filter("b", 2));
        chain.insert(filter("c", 3));

        let changed = chain.modify_all(|f| {
            f.priority = -f.priority;
            true
        });
        assert!(changed);
        assert_eq!(order(&chain), vec!["c", "b", "a"]);
        assert_eq!(chain.len(), 3);
    }

    #[test]
    fn test_before_is_nearest_first() {
        let mut chain = FilterChain::new();
        chain.insert(filter("a", 1));
        chain.insert(filter("b", 2));
        chain.insert(filter("c", 3));

        let before: Vec<_> = chain.before("c").map(|f| f.group_key.as_str()).collect();
        assert_eq!(before, vec!["b", "a"]);
        assert_eq!(chain.before("a").count(), 0);
        assert_eq!(chain.before("missing").count(), 0);
    }

    #[test]
    fn test_remove() {
        let mut chain = FilterChain::new();
        chain.insert(filter("a", 1));
        assert!(chain.remove("a").is_some());
        assert!(chain.remove("a").is_none());
        assert!(chain.is_empty());
        assert!(!chain.contains("a"));
    }

    #[test]
    fn test_bind_reports_changes() {
        let mut f = filter("a", 1);
        assert!(f.bind(FilterRole::Device, NodeId(10)));
        assert!(!f.bind(FilterRole::Device, NodeId(10)));
        assert!(f.bind(FilterRole::Device, NodeId(11)));
        assert!(!f.is_complete());
        assert!(f.bind(FilterRole::Stream, NodeId(12)));
        assert!(f.is_complete());
        assert_eq!(f.node(FilterRole::Stream), Some(NodeId(12)));
    }

    #[test]
    fn test_apply_rule() {
        let mut f = filter("a", 100);
        let mut counters = StreamCounters::default();
        let rule = FilterRule {
            stream_name: "s".into(),
            node_name: "n".into(),
            direction: Direction::Playback,
            target: Some("spk".into()),
            mode: Some(Mode::CaptureOnly),
            priority: Some(5),
        };

        assert!(f.apply_rule(&rule, &counters));
        assert_eq!(f.target.as_deref(), Some("spk"));
        assert!(!f.enabled);
        assert_eq!(f.priority, 5);

        // Same inputs: nothing changes
        assert!(!f.apply_rule(&rule, &counters));

        counters.stream_added(Direction::Capture);
        assert!(f.apply_rule(&rule, &counters));
        assert!(f.enabled);
    }

    #[test]
    fn test_apply_rule_clears_target_and_keeps_unset_fields() {
        let mut f = filter("a", 100);
        f.target = Some("old".into());
        f.enabled = false;
        let rule = FilterRule {
            stream_name: "s".into(),
            node_name: "n".into(),
            direction: Direction::Playback,
            target: None,
            mode: None,
            priority: None,
        };

        assert!(f.apply_rule(&rule, &StreamCounters::default()));
        assert_eq!(f.target, None);
        assert!(!f.enabled);
        assert_eq!(f.priority, 100);
    }

    #[test]
    fn test_registry_directions_are_independent() {
        let mut registry = FilterRegistry::new();
        registry
            .chain_mut(Direction::Playback)
            .insert(Filter::new("g", Direction::Playback, 1));
        assert!(registry.find(Direction::Playback, "g").is_some());
        assert!(registry.find(Direction::Capture, "g").is_none());
        assert_eq!(registry.len(), 1);
        assert!(registry.remove(Direction::Playback, "g").is_some());
        assert!(registry.is_empty());
    }
}
