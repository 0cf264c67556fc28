#![allow(dead_code)]

use filter_policy::{
    types::keys, Direction, FilterPolicy, MemoryRegistry, Node, NodeId, PolicyConfig, SyncSeq,
};
use std::sync::{Arc, Mutex};

pub const TARGETS_KEY: &str = "filters.configured.targets";
pub const FILTERS_KEY: &str = "filters.configured.filters";

// Device nodes
pub const SPEAKERS: NodeId = NodeId(30);
pub const HEADSET: NodeId = NodeId(31);
pub const MIC: NodeId = NodeId(32);

// Filter halves: (device, stream)
pub const EC_SINK: NodeId = NodeId(40);
pub const EC_PLAYBACK: NodeId = NodeId(41);
pub const EC_SOURCE: NodeId = NodeId(42);
pub const EC_CAPTURE: NodeId = NodeId(43);
pub const EQ_SINK: NodeId = NodeId(50);
pub const EQ_PLAYBACK: NodeId = NodeId(51);
pub const LOOPBACK_SINK: NodeId = NodeId(60);
pub const LOOPBACK_PLAYBACK: NodeId = NodeId(61);

/// A desktop-like graph: two sinks, a microphone, an echo canceller on both
/// sides, an equalizer filter chain and a loopback.
pub struct TestFixture {
    pub registry: MemoryRegistry,
    pub policy: FilterPolicy,
    pub syncs: Arc<Mutex<Vec<SyncSeq>>>,
}

impl TestFixture {
    pub fn empty() -> Self {
        let syncs = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&syncs);
        let barrier = move |seq: SyncSeq| sink.lock().unwrap().push(seq);

        Self {
            registry: MemoryRegistry::new(),
            policy: FilterPolicy::new(&PolicyConfig::default(), Box::new(barrier)),
            syncs,
        }
    }

    pub fn new() -> Self {
        let mut fixture = Self::empty();
        for node in Self::desktop_graph() {
            fixture.add(node);
        }
        fixture
    }

    pub fn desktop_graph() -> Vec<Node> {
        vec![
            device(SPEAKERS, "Audio/Sink", "alsa_output.pci-0000_00_1f.3.analog-stereo"),
            device(HEADSET, "Audio/Sink", "alsa_output.usb-headset.analog-stereo"),
            device(MIC, "Audio/Source", "alsa_input.pci-0000_00_1f.3.analog-stereo"),
            member(EC_SINK, "Audio/Sink", "echo-cancel", "echo-cancel-sink"),
            member(EC_PLAYBACK, "Stream/Output/Audio", "echo-cancel", "echo-cancel-playback"),
            member(EC_SOURCE, "Audio/Source", "echo-cancel", "echo-cancel-source"),
            member(EC_CAPTURE, "Stream/Input/Audio", "echo-cancel", "echo-cancel-capture"),
            member(EQ_SINK, "Audio/Sink", "filter-chain-eq", "eq-sink"),
            member(EQ_PLAYBACK, "Stream/Output/Audio", "filter-chain-eq", "eq-playback"),
            member(LOOPBACK_SINK, "Audio/Sink", "loopback-1", "loopback-sink"),
            member(LOOPBACK_PLAYBACK, "Stream/Output/Audio", "loopback-1", "loopback-playback"),
        ]
    }

    pub fn add(&mut self, node: Node) -> bool {
        self.registry.insert(node.clone());
        self.policy.node_added(&self.registry, &node)
    }

    pub fn remove(&mut self, id: NodeId) -> bool {
        let node = self.registry.remove(id).expect("node is in the fixture graph");
        self.policy.node_removed(&self.registry, &node)
    }

    pub fn publish(&mut self, key: &str, json: &str) -> bool {
        self.policy.metadata_changed(&self.registry, key, Some(json))
    }

    pub fn unpublish(&mut self, key: &str) -> bool {
        self.policy.metadata_changed(&self.registry, key, None)
    }

    /// Publish the usual target names for the fixture's devices.
    pub fn publish_targets(&mut self) -> bool {
        self.publish(
            TARGETS_KEY,
            r#"{
                "speakers": { "node.name": "alsa_output.pci-*" },
                "headset": { "node.name": "alsa_output.usb-headset.analog-stereo" },
                "mic": { "media.class": "Audio/Source" }
            }"#,
        )
    }

    /// Request sequences the barrier has seen so far.
    pub fn sync_requests(&self) -> Vec<SyncSeq> {
        self.syncs.lock().unwrap().clone()
    }

    /// Settle whatever is pending.
    pub fn settle(&mut self) -> bool {
        match self.policy.pending_sync() {
            Some(seq) => self.policy.settle(seq),
            None => false,
        }
    }

    pub fn chain_order(&self, direction: Direction) -> Vec<String> {
        self.policy
            .filters(direction)
            .group_keys()
            .map(String::from)
            .collect()
    }
}

pub fn device(id: NodeId, class: &str, name: &str) -> Node {
    Node::new(id)
        .with_property(keys::MEDIA_CLASS, class)
        .with_property(keys::NODE_NAME, name)
}

pub fn member(id: NodeId, class: &str, group: &str, name: &str) -> Node {
    device(id, class, name).with_property(keys::NODE_LINK_GROUP, group)
}

pub fn app_stream(id: u32, class: &str) -> Node {
    Node::new(id)
        .with_property(keys::MEDIA_CLASS, class)
        .with_property(keys::NODE_NAME, format!("app-{}", id))
}
