//! The object registry collaborator: the live node set the engine resolves
//! node references and target predicates against.

use std::collections::BTreeMap;

use crate::matcher::Interest;
use crate::types::{Node, NodeId};

/// Read access to the live node set.
///
/// The engine never owns nodes; it keeps [`NodeId`]s and looks them up here
/// when it needs their properties.
pub trait ObjectRegistry {
    fn node(&self, id: NodeId) -> Option<&Node>;

    /// First node matching `interest`, in the registry's own ordering.
    fn lookup(&self, interest: &Interest) -> Option<&Node>;
}

impl<T: ObjectRegistry + ?Sized> ObjectRegistry for &T {
    fn node(&self, id: NodeId) -> Option<&Node> {
        (**self).node(id)
    }

    fn lookup(&self, interest: &Interest) -> Option<&Node> {
        (**self).lookup(interest)
    }
}

/// In-memory node set ordered by id.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    nodes: BTreeMap<NodeId, Node>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a node, returning the previous version.
    pub fn insert(&mut self, node: Node) -> Option<Node> {
        self.nodes.insert(node.id, node)
    }

    pub fn remove(&mut self, id: NodeId) -> Option<Node> {
        self.nodes.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }
}

impl ObjectRegistry for MemoryRegistry {
    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    fn lookup(&self, interest: &Interest) -> Option<&Node> {
        self.nodes.values().find(|node| interest.matches_node(node))
    }
}
