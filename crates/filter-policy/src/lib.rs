//! Filter chain policy for a live audio node graph.
//!
//! Tracks in-graph filters (echo cancellers, loopbacks, filter chains) by
//! their link group, applies externally published configuration to them,
//! resolves logical target names to live nodes, and answers where each
//! filter's output should be linked. Observable changes are announced once
//! per burst, after the graph has settled.

pub mod counters;
pub mod engine;
pub mod error;
pub mod filters;
pub mod matcher;
pub mod metadata;
pub mod registry;
pub mod resolver;
pub mod scheduler;
pub mod service;
pub mod targets;
pub mod telemetry;
pub mod types;

pub use counters::StreamCounters;
pub use engine::{FilterPolicy, PolicySnapshot};
pub use error::{MetadataError, PolicyError};
pub use filters::{Filter, FilterChain, FilterRegistry};
pub use matcher::{Constraint, Glob, Interest, Verb};
pub use metadata::{FilterRule, Mode, TargetRule};
pub use registry::{MemoryRegistry, ObjectRegistry};
pub use resolver::ChainResolver;
pub use scheduler::{ChangeScheduler, ChannelBarrier, PolicyChanged, SettleBarrier, SyncSeq};
pub use service::{PolicyHandle, PolicyService, SyncRequests};
pub use targets::TargetCache;
pub use types::{Direction, FilterRole, Node, NodeId, NodeKind, Properties};

pub use policyconf::PolicyConfig;
