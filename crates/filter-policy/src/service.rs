//! Async driver for a [`FilterPolicy`].
//!
//! Architecture: reactor pattern, so nothing is shared behind a lock.
//! - The engine and a mirror of the live node set are owned by one task
//! - Graph and configuration events flow in through an mpsc channel
//! - Queries are answered over oneshot channels
//! - Sync requests flow out on their own channel; whoever owns the transport
//!   runs the round trip and answers with [`PolicyHandle::sync_done`]
//!
//! Usage:
//! ```ignore
//! let (policy, mut syncs) = PolicyService::spawn(&config);
//! policy.node_added(node).await?;
//! while let Some(seq) = syncs.recv().await {
//!     transport.roundtrip().await;
//!     policy.sync_done(seq).await?;
//! }
//! ```

use policyconf::PolicyConfig;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::engine::{FilterPolicy, PolicySnapshot};
use crate::error::PolicyError;
use crate::registry::MemoryRegistry;
use crate::scheduler::{ChannelBarrier, PolicyChanged, SyncSeq};
use crate::types::{Direction, Node, NodeId};

/// Sync requests the transport owner must serve.
pub type SyncRequests = mpsc::UnboundedReceiver<SyncSeq>;

/// Command sent to the reactor task
enum PolicyCommand {
    /// A node appeared, or an existing node's properties changed
    NodeAdded(Node),
    NodeRemoved(NodeId),
    MetadataChanged {
        key: String,
        value: Option<String>,
    },
    MetadataObjectChanged {
        object: String,
        key: String,
        value: Option<String>,
    },
    SyncDone(SyncSeq),
    SyncFailed {
        seq: SyncSeq,
        reason: String,
        reply: oneshot::Sender<Result<(), PolicyError>>,
    },
    IsEnabled {
        direction: Direction,
        group_key: String,
        reply: oneshot::Sender<bool>,
    },
    ResolveTarget {
        direction: Direction,
        group_key: String,
        reply: oneshot::Sender<Option<NodeId>>,
    },
    FilterForTarget {
        direction: Direction,
        target: NodeId,
        reply: oneshot::Sender<NodeId>,
    },
    DefaultFilter {
        direction: Direction,
        reply: oneshot::Sender<Option<NodeId>>,
    },
    Snapshot {
        reply: oneshot::Sender<PolicySnapshot>,
    },
    /// Stop the reactor
    Shutdown,
}

pub struct PolicyService;

impl PolicyService {
    /// Spawn the reactor task. Must be called from within a tokio runtime.
    pub fn spawn(config: &PolicyConfig) -> (PolicyHandle, SyncRequests) {
        let (barrier, syncs) = ChannelBarrier::new();
        let policy = FilterPolicy::new(config, Box::new(barrier));
        let notifier = policy.notifier();

        let (cmd_tx, cmd_rx) = mpsc::channel(config.service.command_capacity.max(1));
        tokio::spawn(async move {
            reactor_task(policy, cmd_rx).await;
        });

        (PolicyHandle { cmd_tx, notifier }, syncs)
    }
}

/// The reactor task - owns the engine and the node mirror.
async fn reactor_task(mut policy: FilterPolicy, mut cmd_rx: mpsc::Receiver<PolicyCommand>) {
    let mut registry = MemoryRegistry::new();
    debug!("policy reactor started");

    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            PolicyCommand::NodeAdded(node) => match registry.insert(node.clone()) {
                Some(previous) => {
                    policy.node_updated(&registry, &previous, &node);
                }
                None => {
                    policy.node_added(&registry, &node);
                }
            },
            PolicyCommand::NodeRemoved(id) => match registry.remove(id) {
                Some(node) => {
                    policy.node_removed(&registry, &node);
                }
                None => debug!("removal of unknown node {}", id),
            },
            PolicyCommand::MetadataChanged { key, value } => {
                policy.metadata_changed(&registry, &key, value.as_deref());
            }
            PolicyCommand::MetadataObjectChanged { object, key, value } => {
                policy.metadata_object_changed(&registry, &object, &key, value.as_deref());
            }
            PolicyCommand::SyncDone(seq) => {
                policy.settle(seq);
            }
            PolicyCommand::SyncFailed { seq, reason, reply } => {
                let _ = reply.send(policy.settle_failed(seq, reason));
            }
            PolicyCommand::IsEnabled {
                direction,
                group_key,
                reply,
            } => {
                let _ = reply.send(policy.is_enabled(direction, &group_key));
            }
            PolicyCommand::ResolveTarget {
                direction,
                group_key,
                reply,
            } => {
                let _ = reply.send(policy.resolve_target(direction, &group_key));
            }
            PolicyCommand::FilterForTarget {
                direction,
                target,
                reply,
            } => {
                let _ = reply.send(policy.resolve_filter_for_target(direction, target));
            }
            PolicyCommand::DefaultFilter { direction, reply } => {
                let _ = reply.send(policy.default_filter(direction));
            }
            PolicyCommand::Snapshot { reply } => {
                let _ = reply.send(policy.snapshot());
            }
            PolicyCommand::Shutdown => {
                info!("policy reactor shutting down ({} nodes tracked)", registry.len());
                return;
            }
        }
    }

    info!("policy command channel closed, reactor exiting");
}

/// Cheap, cloneable handle to a running policy reactor.
#[derive(Clone)]
pub struct PolicyHandle {
    cmd_tx: mpsc::Sender<PolicyCommand>,
    notifier: broadcast::Sender<PolicyChanged>,
}

impl PolicyHandle {
    /// Receive one [`PolicyChanged`] per settled burst of changes.
    pub fn subscribe(&self) -> broadcast::Receiver<PolicyChanged> {
        self.notifier.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.cmd_tx.is_closed()
    }

    pub async fn node_added(&self, node: Node) -> Result<(), PolicyError> {
        self.send(PolicyCommand::NodeAdded(node)).await
    }

    pub async fn node_removed(&self, id: NodeId) -> Result<(), PolicyError> {
        self.send(PolicyCommand::NodeRemoved(id)).await
    }

    pub async fn metadata_changed(
        &self,
        key: impl Into<String>,
        value: Option<String>,
    ) -> Result<(), PolicyError> {
        self.send(PolicyCommand::MetadataChanged {
            key: key.into(),
            value,
        })
        .await
    }

    /// Like `metadata_changed`, but dropped unless `object` is the
    /// configured metadata object.
    pub async fn metadata_object_changed(
        &self,
        object: impl Into<String>,
        key: impl Into<String>,
        value: Option<String>,
    ) -> Result<(), PolicyError> {
        self.send(PolicyCommand::MetadataObjectChanged {
            object: object.into(),
            key: key.into(),
            value,
        })
        .await
    }

    pub async fn sync_done(&self, seq: SyncSeq) -> Result<(), PolicyError> {
        self.send(PolicyCommand::SyncDone(seq)).await
    }

    /// Report a failed round trip. The barrier error comes back to the caller.
    pub async fn sync_failed(&self, seq: SyncSeq, reason: impl Into<String>) -> Result<(), PolicyError> {
        let reason = reason.into();
        self.request(|reply| PolicyCommand::SyncFailed { seq, reason, reply })
            .await?
    }

    pub async fn is_enabled(&self, direction: Direction, group_key: &str) -> Result<bool, PolicyError> {
        let group_key = group_key.to_string();
        self.request(|reply| PolicyCommand::IsEnabled {
            direction,
            group_key,
            reply,
        })
        .await
    }

    pub async fn resolve_target(
        &self,
        direction: Direction,
        group_key: &str,
    ) -> Result<Option<NodeId>, PolicyError> {
        let group_key = group_key.to_string();
        self.request(|reply| PolicyCommand::ResolveTarget {
            direction,
            group_key,
            reply,
        })
        .await
    }

    pub async fn resolve_filter_for_target(
        &self,
        direction: Direction,
        target: NodeId,
    ) -> Result<NodeId, PolicyError> {
        self.request(|reply| PolicyCommand::FilterForTarget {
            direction,
            target,
            reply,
        })
        .await
    }

    pub async fn default_filter(&self, direction: Direction) -> Result<Option<NodeId>, PolicyError> {
        self.request(|reply| PolicyCommand::DefaultFilter { direction, reply })
            .await
    }

    pub async fn snapshot(&self) -> Result<PolicySnapshot, PolicyError> {
        self.request(|reply| PolicyCommand::Snapshot { reply }).await
    }

    /// Stop the reactor. Later calls on any handle return
    /// [`PolicyError::ServiceClosed`].
    pub async fn shutdown(&self) {
        if self.cmd_tx.send(PolicyCommand::Shutdown).await.is_err() {
            warn!("policy reactor already stopped");
        }
    }

    async fn send(&self, cmd: PolicyCommand) -> Result<(), PolicyError> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| PolicyError::ServiceClosed)
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> PolicyCommand,
    ) -> Result<T, PolicyError> {
        let (reply, response) = oneshot::channel();
        self.send(make(reply)).await?;
        response.await.map_err(|_| PolicyError::ServiceClosed)
    }
}

impl std::fmt::Debug for PolicyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyHandle")
            .field("closed", &self.cmd_tx.is_closed())
            .finish()
    }
}
