use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::PolicyError;

/// Property keys the engine reads from nodes.
pub mod keys {
    pub const NODE_NAME: &str = "node.name";
    pub const MEDIA_CLASS: &str = "media.class";
    pub const NODE_LINK_GROUP: &str = "node.link-group";
}

/// Media classes that place a node in one of the two chains.
pub mod media_class {
    pub const AUDIO_SINK: &str = "Audio/Sink";
    pub const AUDIO_SOURCE: &str = "Audio/Source";
    pub const STREAM_OUTPUT_AUDIO: &str = "Stream/Output/Audio";
    pub const STREAM_INPUT_AUDIO: &str = "Stream/Input/Audio";
}

/// Bound id of a live node in the remote graph.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

pub type Properties = BTreeMap<String, String>;

/// A live node as seen through the object registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    pub properties: Properties,
}

impl Node {
    pub fn new(id: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            properties: Properties::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.property(keys::NODE_NAME)
    }

    pub fn media_class(&self) -> Option<&str> {
        self.property(keys::MEDIA_CLASS)
    }

    pub fn link_group(&self) -> Option<&str> {
        self.property(keys::NODE_LINK_GROUP)
    }

    /// Decide which part of the engine cares about this node.
    pub fn classify(&self) -> NodeKind<'_> {
        let Some(class) = self.media_class() else {
            return NodeKind::Ignored;
        };

        if let Some(group) = self.link_group() {
            let (direction, role) = match class {
                media_class::AUDIO_SINK => (Direction::Playback, FilterRole::Device),
                media_class::STREAM_OUTPUT_AUDIO => (Direction::Playback, FilterRole::Stream),
                media_class::AUDIO_SOURCE => (Direction::Capture, FilterRole::Device),
                media_class::STREAM_INPUT_AUDIO => (Direction::Capture, FilterRole::Stream),
                _ => return NodeKind::Ignored,
            };
            return NodeKind::FilterMember {
                group,
                direction,
                role,
            };
        }

        match class {
            media_class::STREAM_OUTPUT_AUDIO => NodeKind::AppStream(Direction::Playback),
            media_class::STREAM_INPUT_AUDIO => NodeKind::AppStream(Direction::Capture),
            c if c.starts_with("Audio/") => NodeKind::Target,
            _ => NodeKind::Ignored,
        }
    }
}

/// Result of [`Node::classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind<'a> {
    /// One half of a filter unit, keyed by its link group.
    FilterMember {
        group: &'a str,
        direction: Direction,
        role: FilterRole,
    },
    /// A plain application stream; only counted.
    AppStream(Direction),
    /// A device-like node that configured targets may resolve to.
    Target,
    Ignored,
}

/// Which half of a filter pair a node is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterRole {
    Device,
    Stream,
}

/// The logical chain a filter participates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Sink-bound ("input" in configuration records)
    Playback,
    /// Source-bound ("output" in configuration records)
    Capture,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::Playback, Direction::Capture];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Playback => "playback",
            Self::Capture => "capture",
        }
    }

    /// Parse the `direction` field of a filter configuration record.
    pub fn from_config(s: &str) -> Option<Self> {
        match s {
            "input" => Some(Self::Playback),
            "output" => Some(Self::Capture),
            _ => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Direction flags as accepted by the query API.
impl FromStr for Direction {
    type Err = PolicyError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "input" | "Input" | "playback" => Ok(Self::Playback),
            "output" | "Output" | "capture" => Ok(Self::Capture),
            _ => Err(PolicyError::UnknownDirection(s.to_string())),
        }
    }
}
