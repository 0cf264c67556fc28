//! The reconciliation engine.
//!
//! `FilterPolicy` consumes node and configuration events, keeps the filter
//! registry, target cache and stream counters up to date, and schedules one
//! coalesced change notification per burst. Every handler returns whether
//! anything observable changed; calling a handler twice with the same input
//! returns `false` the second time.

use policyconf::{PolicyConfig, PriorityConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::counters::StreamCounters;
use crate::error::PolicyError;
use crate::filters::{Filter, FilterChain, FilterRegistry};
use crate::metadata::{self, FilterRule, TargetRule};
use crate::registry::ObjectRegistry;
use crate::resolver::ChainResolver;
use crate::scheduler::{ChangeScheduler, PolicyChanged, SettleBarrier, SyncSeq};
use crate::targets::TargetCache;
use crate::types::{Direction, FilterRole, Node, NodeId, NodeKind};

/// Serializable dump of the derived state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySnapshot {
    pub playback: Vec<Filter>,
    pub capture: Vec<Filter>,
    pub targets: BTreeMap<String, NodeId>,
    pub streams: StreamCounters,
}

pub struct FilterPolicy {
    metadata_name: String,
    targets_key: String,
    filters_key: String,
    priorities: PriorityConfig,

    filters: FilterRegistry,
    targets: TargetCache,
    counters: StreamCounters,

    // Last usable targets blob; an unusable one keeps these
    target_rules: Vec<TargetRule>,
    // None: nothing usable published, filters keep their current values
    filter_rules: Option<Vec<FilterRule>>,

    scheduler: ChangeScheduler,
}

impl FilterPolicy {
    pub fn new(config: &PolicyConfig, barrier: Box<dyn SettleBarrier>) -> Self {
        Self {
            metadata_name: config.metadata.name.clone(),
            targets_key: config.metadata.targets_key.clone(),
            filters_key: config.metadata.filters_key.clone(),
            priorities: config.priorities.clone(),
            filters: FilterRegistry::new(),
            targets: TargetCache::new(),
            counters: StreamCounters::default(),
            target_rules: Vec::new(),
            filter_rules: None,
            scheduler: ChangeScheduler::new(barrier, config.service.notify_capacity),
        }
    }

    // === Events ===

    /// A node appeared.
    pub fn node_added<R: ObjectRegistry + ?Sized>(&mut self, registry: &R, node: &Node) -> bool {
        let changed = match node.classify() {
            NodeKind::FilterMember {
                group,
                direction,
                role,
            } => self.upsert(registry, direction, group, role, node.id),
            NodeKind::AppStream(direction) => {
                self.counters.stream_added(direction);
                debug!(
                    "{} stream {} added ({} live)",
                    direction,
                    node.id,
                    self.counters.count(direction)
                );
                self.refresh_filters(registry)
            }
            NodeKind::Target => self.refresh_targets(registry),
            NodeKind::Ignored => {
                debug!("ignoring node {} ({:?})", node.id, node.media_class());
                false
            }
        };

        self.finish(changed)
    }

    /// A node disappeared. `registry` must no longer contain it.
    pub fn node_removed<R: ObjectRegistry + ?Sized>(&mut self, registry: &R, node: &Node) -> bool {
        let changed = match node.classify() {
            NodeKind::FilterMember {
                group, direction, ..
            } => self.remove_filter(direction, group),
            NodeKind::AppStream(direction) => {
                self.counters.stream_removed(direction);
                debug!(
                    "{} stream {} removed ({} live)",
                    direction,
                    node.id,
                    self.counters.count(direction)
                );
                self.refresh_filters(registry)
            }
            NodeKind::Target => self.refresh_targets(registry),
            NodeKind::Ignored => false,
        };

        self.finish(changed)
    }

    /// A node's properties changed. `registry` must already hold `new`.
    pub fn node_updated<R: ObjectRegistry + ?Sized>(
        &mut self,
        registry: &R,
        old: &Node,
        new: &Node,
    ) -> bool {
        if old.classify() != new.classify() {
            let removed = self.node_removed(registry, old);
            let added = self.node_added(registry, new);
            return removed || added;
        }

        let changed = match new.classify() {
            NodeKind::FilterMember {
                group,
                direction,
                role,
            } => self.upsert(registry, direction, group, role, new.id),
            // Names may have changed, so configuration must be matched again.
            NodeKind::AppStream(_) => self.refresh_filters(registry),
            NodeKind::Target => self.refresh_targets(registry),
            NodeKind::Ignored => false,
        };

        self.finish(changed)
    }

    /// A configuration key was set (`Some`) or removed (`None`).
    pub fn metadata_changed<R: ObjectRegistry + ?Sized>(
        &mut self,
        registry: &R,
        key: &str,
        value: Option<&str>,
    ) -> bool {
        if key == self.targets_key {
            match value {
                None => self.target_rules.clear(),
                Some(json) => match metadata::parse_targets(json) {
                    Ok(parsed) => {
                        for warning in &parsed.warnings {
                            warn!("{}: {}", key, warning);
                        }
                        self.target_rules = parsed.rules;
                    }
                    Err(e) => {
                        warn!("ignoring metadata value of {}, keeping previous targets: {}", key, e);
                    }
                },
            }
        } else if key == self.filters_key {
            self.filter_rules = match value {
                None => None,
                Some(json) => match metadata::parse_filters(json) {
                    Ok(parsed) => {
                        for warning in &parsed.warnings {
                            warn!("{}: {}", key, warning);
                        }
                        Some(parsed.rules)
                    }
                    Err(e) => {
                        warn!("ignoring metadata value of {}: {}", key, e);
                        None
                    }
                },
            };
        } else {
            debug!("ignoring metadata key {}", key);
            return false;
        }

        self.reevaluate(registry)
    }

    /// Like [`FilterPolicy::metadata_changed`], for a store that carries
    /// several metadata objects. Objects other than the configured one are
    /// ignored.
    pub fn metadata_object_changed<R: ObjectRegistry + ?Sized>(
        &mut self,
        registry: &R,
        object: &str,
        key: &str,
        value: Option<&str>,
    ) -> bool {
        if object != self.metadata_name {
            debug!("ignoring metadata object {}", object);
            return false;
        }
        self.metadata_changed(registry, key, value)
    }

    /// Name of the metadata object carrying the configuration.
    pub fn metadata_name(&self) -> &str {
        &self.metadata_name
    }

    /// Recompute targets, then re-apply configuration to every filter.
    pub fn reevaluate<R: ObjectRegistry + ?Sized>(&mut self, registry: &R) -> bool {
        let targets_changed = self.refresh_targets(registry);
        let filters_changed = self.refresh_filters(registry);
        self.finish(targets_changed || filters_changed)
    }

    /// The barrier round trip `seq` completed.
    pub fn settle(&mut self, seq: SyncSeq) -> bool {
        self.scheduler.settle(seq)
    }

    pub fn settle_failed(&mut self, seq: SyncSeq, reason: impl Into<String>) -> Result<(), PolicyError> {
        self.scheduler.settle_failed(seq, reason)
    }

    // === Filter registry ===

    /// Create or update the filter for `group_key`, binding `node` in `role`
    /// and applying the configured values.
    pub fn upsert<R: ObjectRegistry + ?Sized>(
        &mut self,
        registry: &R,
        direction: Direction,
        group_key: &str,
        role: FilterRole,
        node: NodeId,
    ) -> bool {
        let chain = self.filters.chain_mut(direction);
        let rules = self.filter_rules.as_deref();
        let counters = &self.counters;

        let apply = |filter: &mut Filter| {
            let bound = filter.bind(role, node);
            let configured = rules
                .map(|rules| apply_rules(rules, counters, registry, filter))
                .unwrap_or(false);
            bound || configured
        };

        if chain.contains(group_key) {
            return chain.modify(group_key, apply).unwrap_or(false);
        }

        let mut filter = Filter::new(group_key, direction, self.priorities.priority_for(group_key));
        apply(&mut filter);
        info!(
            "filter {} added to {} chain (priority {}, enabled {})",
            group_key, direction, filter.priority, filter.enabled
        );
        chain.insert(filter);
        true
    }

    /// Drop the filter for `group_key`, whichever half of it disappeared.
    pub fn remove_filter(&mut self, direction: Direction, group_key: &str) -> bool {
        match self.filters.remove(direction, group_key) {
            Some(_) => {
                info!("filter {} removed from {} chain", group_key, direction);
                true
            }
            None => false,
        }
    }

    fn refresh_filters<R: ObjectRegistry + ?Sized>(&mut self, registry: &R) -> bool {
        let Some(rules) = self.filter_rules.as_deref() else {
            return false;
        };
        let counters = &self.counters;

        let mut changed = false;
        for direction in Direction::ALL {
            if self
                .filters
                .chain_mut(direction)
                .modify_all(|filter| apply_rules(rules, counters, registry, filter))
            {
                changed = true;
            }
        }
        changed
    }

    fn refresh_targets<R: ObjectRegistry + ?Sized>(&mut self, registry: &R) -> bool {
        self.targets.rebuild(&self.target_rules, registry)
    }

    fn finish(&mut self, changed: bool) -> bool {
        if changed {
            self.scheduler.mark_changed();
        }
        changed
    }

    // === Queries ===

    pub fn resolver(&self) -> ChainResolver<'_> {
        ChainResolver::new(&self.filters, &self.targets)
    }

    pub fn is_enabled(&self, direction: Direction, group_key: &str) -> bool {
        self.resolver().is_enabled(direction, group_key)
    }

    pub fn resolve_target(&self, direction: Direction, group_key: &str) -> Option<NodeId> {
        self.resolver().resolve_target(direction, group_key)
    }

    pub fn resolve_filter_for_target(&self, direction: Direction, target: NodeId) -> NodeId {
        self.resolver().resolve_filter_for_target(direction, target)
    }

    pub fn default_filter(&self, direction: Direction) -> Option<NodeId> {
        self.resolver().default_filter(direction)
    }

    pub fn filter(&self, direction: Direction, group_key: &str) -> Option<&Filter> {
        self.filters.find(direction, group_key)
    }

    pub fn filters(&self, direction: Direction) -> &FilterChain {
        self.filters.chain(direction)
    }

    pub fn targets(&self) -> &TargetCache {
        &self.targets
    }

    pub fn counters(&self) -> StreamCounters {
        self.counters
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PolicyChanged> {
        self.scheduler.subscribe()
    }

    pub fn notifier(&self) -> broadcast::Sender<PolicyChanged> {
        self.scheduler.notifier()
    }

    pub fn pending_sync(&self) -> Option<SyncSeq> {
        self.scheduler.pending()
    }

    pub fn snapshot(&self) -> PolicySnapshot {
        PolicySnapshot {
            playback: self.filters(Direction::Playback).iter().cloned().collect(),
            capture: self.filters(Direction::Capture).iter().cloned().collect(),
            targets: self
                .targets
                .iter()
                .map(|(name, id)| (name.to_string(), id))
                .collect(),
            streams: self.counters,
        }
    }
}

impl std::fmt::Debug for FilterPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterPolicy")
            .field("filters", &self.filters)
            .field("targets", &self.targets)
            .field("counters", &self.counters)
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

/// Apply the first rule matching `filter`'s stream name, node name and
/// direction. Half-bound filters, or filters whose nodes the registry no
/// longer knows, are left alone.
fn apply_rules<R: ObjectRegistry + ?Sized>(
    rules: &[FilterRule],
    counters: &StreamCounters,
    registry: &R,
    filter: &mut Filter,
) -> bool {
    let (Some(stream), Some(device)) = (filter.stream_node, filter.device_node) else {
        return false;
    };
    let stream_name = registry.node(stream).and_then(Node::name);
    let node_name = registry.node(device).and_then(Node::name);
    let (Some(stream_name), Some(node_name)) = (stream_name, node_name) else {
        debug!("filter {} nodes have no names yet", filter.group_key);
        return false;
    };

    match metadata::find_rule(rules, stream_name, node_name, filter.direction) {
        Some(rule) => filter.apply_rule(rule, counters),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MemoryRegistry;
    use crate::types::keys;
    use std::sync::{Arc, Mutex};

    struct Harness {
        registry: MemoryRegistry,
        policy: FilterPolicy,
        syncs: Arc<Mutex<Vec<SyncSeq>>>,
    }

    impl Harness {
        fn new() -> Self {
            let syncs = Arc::new(Mutex::new(Vec::new()));
            let sink = Arc::clone(&syncs);
            let barrier = move |seq: SyncSeq| sink.lock().unwrap().push(seq);
            Self {
                registry: MemoryRegistry::new(),
                policy: FilterPolicy::new(&PolicyConfig::default(), Box::new(barrier)),
                syncs,
            }
        }

        fn add(&mut self, node: Node) -> bool {
            self.registry.insert(node.clone());
            self.policy.node_added(&self.registry, &node)
        }

        fn remove(&mut self, id: u32) -> bool {
            let node = self.registry.remove(NodeId(id)).unwrap();
            self.policy.node_removed(&self.registry, &node)
        }

        fn set(&mut self, key: &str, value: &str) -> bool {
            self.policy.metadata_changed(&self.registry, key, Some(value))
        }

        fn sync_count(&self) -> usize {
            self.syncs.lock().unwrap().len()
        }
    }

    fn filter_node(id: u32, class: &str, group: &str, name: &str) -> Node {
        Node::new(id)
            .with_property(keys::MEDIA_CLASS, class)
            .with_property(keys::NODE_LINK_GROUP, group)
            .with_property(keys::NODE_NAME, name)
    }

    fn app_stream(id: u32, class: &str) -> Node {
        Node::new(id).with_property(keys::MEDIA_CLASS, class)
    }

    const FILTERS: &str = "filters.configured.filters";
    const TARGETS: &str = "filters.configured.targets";

    #[test]
    fn test_filter_created_with_heuristic_priority() {
        let mut h = Harness::new();
        assert!(h.add(filter_node(10, "Audio/Sink", "loopback-1", "loop.sink")));

        let filter = h.policy.filter(Direction::Playback, "loopback-1").unwrap();
        assert_eq!(filter.priority, 300);
        assert!(filter.enabled);
        assert_eq!(filter.device_node, Some(NodeId(10)));
        assert_eq!(filter.stream_node, None);
    }

    #[test]
    fn test_second_half_binds_and_repeat_is_unchanged() {
        let mut h = Harness::new();
        h.add(filter_node(10, "Audio/Sink", "eq", "eq.sink"));
        assert!(h.add(filter_node(11, "Stream/Output/Audio", "eq", "eq.out")));

        let filter = h.policy.filter(Direction::Playback, "eq").unwrap();
        assert_eq!(filter.stream_node, Some(NodeId(11)));

        // Re-announcing the same node is a no-op
        let again = filter_node(11, "Stream/Output/Audio", "eq", "eq.out");
        assert!(!h.policy.node_added(&h.registry, &again));
    }

    #[test]
    fn test_removing_either_half_removes_filter() {
        let mut h = Harness::new();
        h.add(filter_node(10, "Audio/Sink", "eq", "eq.sink"));
        h.add(filter_node(11, "Stream/Output/Audio", "eq", "eq.out"));

        assert!(h.remove(11));
        assert!(h.policy.filter(Direction::Playback, "eq").is_none());
        // The other half going away afterwards changes nothing
        assert!(!h.remove(10));
    }

    #[test]
    fn test_configuration_applied_on_completion() {
        let mut h = Harness::new();
        h.set(
            FILTERS,
            r#"[{ "stream-name": "eq.out", "node-name": "eq.sink", "direction": "input",
                 "target": "spk", "mode": "never", "priority": 7 }]"#,
        );

        h.add(filter_node(10, "Audio/Sink", "eq", "eq.sink"));
        // Half-bound: configuration not applied yet
        assert!(h.policy.is_enabled(Direction::Playback, "eq"));

        h.add(filter_node(11, "Stream/Output/Audio", "eq", "eq.out"));
        let filter = h.policy.filter(Direction::Playback, "eq").unwrap();
        assert_eq!(filter.target.as_deref(), Some("spk"));
        assert!(!filter.enabled);
        assert_eq!(filter.priority, 7);
    }

    #[test]
    fn test_same_configuration_twice_is_unchanged() {
        let mut h = Harness::new();
        h.add(filter_node(10, "Audio/Sink", "eq", "eq.sink"));
        h.add(filter_node(11, "Stream/Output/Audio", "eq", "eq.out"));

        let blob = r#"[{ "stream-name": "eq.out", "node-name": "eq.sink", "direction": "input", "priority": 1 }]"#;
        assert!(h.set(FILTERS, blob));
        assert!(!h.set(FILTERS, blob));
    }

    #[test]
    fn test_capture_only_follows_capture_streams() {
        let mut h = Harness::new();
        h.set(
            FILTERS,
            r#"[{ "stream-name": "ec.capture", "node-name": "ec.source", "direction": "output",
                 "mode": "capture-only" }]"#,
        );
        h.add(filter_node(20, "Audio/Source", "echo-cancel", "ec.source"));
        h.add(filter_node(21, "Stream/Input/Audio", "echo-cancel", "ec.capture"));
        assert!(!h.policy.is_enabled(Direction::Capture, "echo-cancel"));

        assert!(h.add(app_stream(50, "Stream/Input/Audio")));
        assert!(h.policy.is_enabled(Direction::Capture, "echo-cancel"));

        // A second capture stream does not change anything
        assert!(!h.add(app_stream(51, "Stream/Input/Audio")));

        assert!(!h.remove(50));
        assert!(h.remove(51));
        assert!(!h.policy.is_enabled(Direction::Capture, "echo-cancel"));
    }

    #[test]
    fn test_stream_removal_without_add_keeps_counter_at_zero() {
        let mut h = Harness::new();
        let node = app_stream(50, "Stream/Output/Audio");
        h.policy.node_removed(&h.registry, &node);
        h.policy.node_removed(&h.registry, &node);
        assert_eq!(h.policy.counters().playback, 0);
    }

    #[test]
    fn test_priority_change_resorts() {
        let mut h = Harness::new();
        h.add(filter_node(10, "Audio/Sink", "a", "a.sink"));
        h.add(filter_node(11, "Stream/Output/Audio", "a", "a.out"));
        h.add(filter_node(12, "Audio/Sink", "b", "b.sink"));

        let order = |h: &Harness| -> Vec<String> {
            h.policy
                .filters(Direction::Playback)
                .group_keys()
                .map(String::from)
                .collect()
        };
        assert_eq!(order(&h), vec!["a", "b"]);

        h.set(
            FILTERS,
            r#"[{ "stream-name": "a.out", "node-name": "a.sink", "direction": "input", "priority": 500 }]"#,
        );
        assert_eq!(order(&h), vec!["b", "a"]);
    }

    #[test]
    fn test_target_nodes_refresh_cache() {
        let mut h = Harness::new();
        h.set(TARGETS, r#"{ "spk": { "node.name": "speakers" } }"#);
        assert!(h.policy.targets().is_empty());

        let speakers = Node::new(30)
            .with_property(keys::MEDIA_CLASS, "Audio/Sink")
            .with_property(keys::NODE_NAME, "speakers");
        assert!(h.add(speakers));
        assert_eq!(h.policy.targets().get("spk"), Some(NodeId(30)));

        assert!(h.remove(30));
        assert_eq!(h.policy.targets().get("spk"), None);
    }

    #[test]
    fn test_malformed_targets_blob_preserves_cache() {
        let mut h = Harness::new();
        h.add(
            Node::new(30)
                .with_property(keys::MEDIA_CLASS, "Audio/Sink")
                .with_property(keys::NODE_NAME, "speakers"),
        );
        h.set(TARGETS, r#"{ "spk": { "node.name": "speakers" } }"#);
        assert_eq!(h.policy.targets().get("spk"), Some(NodeId(30)));

        assert!(!h.set(TARGETS, r#"["not", "an", "object"]"#));
        assert_eq!(h.policy.targets().get("spk"), Some(NodeId(30)));

        // Removing the key clears the cache
        assert!(h.policy.metadata_changed(&h.registry, TARGETS, None));
        assert!(h.policy.targets().is_empty());
    }

    #[test]
    fn test_malformed_targets_blob_still_follows_nodes() {
        let mut h = Harness::new();
        h.add(
            Node::new(30)
                .with_property(keys::MEDIA_CLASS, "Audio/Sink")
                .with_property(keys::NODE_NAME, "speakers"),
        );
        h.set(TARGETS, r#"{ "spk": { "node.name": "speakers" } }"#);
        h.set(TARGETS, "[1, 2]");

        assert!(h.remove(30));
        assert_eq!(h.policy.targets().get("spk"), None);
    }

    #[test]
    fn test_other_metadata_objects_are_ignored() {
        let mut h = Harness::new();
        h.add(
            Node::new(30)
                .with_property(keys::MEDIA_CLASS, "Audio/Sink")
                .with_property(keys::NODE_NAME, "speakers"),
        );
        let blob = Some(r#"{ "spk": { "node.name": "speakers" } }"#);
        assert_eq!(h.policy.metadata_name(), "filters");

        assert!(!h.policy.metadata_object_changed(&h.registry, "default", TARGETS, blob));
        assert!(h.policy.targets().is_empty());

        assert!(h.policy.metadata_object_changed(&h.registry, "filters", TARGETS, blob));
        assert_eq!(h.policy.targets().get("spk"), Some(NodeId(30)));
    }

    #[test]
    fn test_malformed_filters_blob_preserves_values() {
        let mut h = Harness::new();
        h.add(filter_node(10, "Audio/Sink", "eq", "eq.sink"));
        h.add(filter_node(11, "Stream/Output/Audio", "eq", "eq.out"));
        h.set(
            FILTERS,
            r#"[{ "stream-name": "eq.out", "node-name": "eq.sink", "direction": "input", "target": "spk" }]"#,
        );

        assert!(!h.set(FILTERS, r#"{ "oops": true }"#));
        assert_eq!(
            h.policy.filter(Direction::Playback, "eq").unwrap().target.as_deref(),
            Some("spk")
        );
    }

    #[test]
    fn test_unrelated_metadata_key_is_ignored() {
        let mut h = Harness::new();
        assert!(!h.set("default.audio.sink", "{}"));
        assert_eq!(h.sync_count(), 0);
    }

    #[test]
    fn test_changes_coalesce_until_settled() {
        let mut h = Harness::new();
        let mut rx = h.policy.subscribe();

        h.add(filter_node(10, "Audio/Sink", "a", "a.sink"));
        h.add(filter_node(11, "Audio/Sink", "b", "b.sink"));
        h.add(filter_node(12, "Audio/Sink", "c", "c.sink"));
        assert_eq!(h.sync_count(), 1);

        let seq = h.policy.pending_sync().unwrap();
        assert!(h.policy.settle(seq));
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_no_change_requests_no_sync() {
        let mut h = Harness::new();
        h.add(Node::new(1).with_property(keys::MEDIA_CLASS, "Video/Source"));
        assert_eq!(h.sync_count(), 0);
        assert!(h.policy.pending_sync().is_none());
    }

    #[test]
    fn test_node_updated_rematches_configuration() {
        let mut h = Harness::new();
        h.set(
            FILTERS,
            r#"[{ "stream-name": "eq.out", "node-name": "eq.sink", "direction": "input", "mode": "never" }]"#,
        );
        h.add(filter_node(10, "Audio/Sink", "eq", "eq.sink"));
        h.add(filter_node(11, "Stream/Output/Audio", "eq", "old-name"));
        assert!(h.policy.is_enabled(Direction::Playback, "eq"));

        let old = h.registry.node(NodeId(11)).cloned().unwrap();
        let new = filter_node(11, "Stream/Output/Audio", "eq", "eq.out");
        h.registry.insert(new.clone());
        assert!(h.policy.node_updated(&h.registry, &old, &new));
        assert!(!h.policy.is_enabled(Direction::Playback, "eq"));
    }

    #[test]
    fn test_snapshot() {
        let mut h = Harness::new();
        h.add(filter_node(10, "Audio/Sink", "eq", "eq.sink"));
        h.add(app_stream(50, "Stream/Output/Audio"));

        let snapshot = h.policy.snapshot();
        assert_eq!(snapshot.playback.len(), 1);
        assert!(snapshot.capture.is_empty());
        assert_eq!(snapshot.streams.playback, 1);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["playback"][0]["group_key"], "eq");
    }
}
