//! Coalesced change notification behind a settle barrier.
//!
//! The first change after a quiet period asks the barrier for a round trip
//! ("tell me when everything queued so far has been processed"). Every change
//! detected before that round trip completes is folded into it. When the
//! owner reports the barrier with [`ChangeScheduler::settle`], exactly one
//! [`PolicyChanged`] goes out to subscribers.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::error::PolicyError;

/// Sequence number identifying one barrier round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SyncSeq(pub u64);

impl fmt::Display for SyncSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The "changed" event. Carries nothing; consumers re-query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyChanged;

/// Asks the remote side for a round trip.
///
/// Implementations must arrange for the owner to call
/// [`ChangeScheduler::settle`] (usually through the engine) with the same
/// sequence once every previously issued operation has been acknowledged.
pub trait SettleBarrier: Send {
    fn request_sync(&mut self, seq: SyncSeq);
}

impl<F: FnMut(SyncSeq) + Send> SettleBarrier for F {
    fn request_sync(&mut self, seq: SyncSeq) {
        self(seq)
    }
}

/// Barrier that hands sync requests to whoever drains the receiver.
pub struct ChannelBarrier {
    tx: mpsc::UnboundedSender<SyncSeq>,
}

impl ChannelBarrier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SyncSeq>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl SettleBarrier for ChannelBarrier {
    fn request_sync(&mut self, seq: SyncSeq) {
        if self.tx.send(seq).is_err() {
            warn!("sync request {} dropped: nobody is serving the barrier", seq);
        }
    }
}

pub struct ChangeScheduler {
    barrier: Box<dyn SettleBarrier>,
    notifier: broadcast::Sender<PolicyChanged>,
    next_seq: u64,
    pending: Option<SyncSeq>,
    emitted: u64,
}

impl ChangeScheduler {
    pub fn new(barrier: Box<dyn SettleBarrier>, notify_capacity: usize) -> Self {
        let (notifier, _) = broadcast::channel(notify_capacity.max(1));
        Self {
            barrier,
            notifier,
            next_seq: 1,
            pending: None,
            emitted: 0,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PolicyChanged> {
        self.notifier.subscribe()
    }

    /// Sender side of the notification channel, for handing out more subscribers.
    pub fn notifier(&self) -> broadcast::Sender<PolicyChanged> {
        self.notifier.clone()
    }

    /// The barrier round trip currently in flight, if any.
    pub fn pending(&self) -> Option<SyncSeq> {
        self.pending
    }

    /// Number of notifications emitted so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Record that observable state changed.
    pub fn mark_changed(&mut self) {
        if let Some(seq) = self.pending {
            debug!("change coalesced into pending sync {}", seq);
            return;
        }

        let seq = SyncSeq(self.next_seq);
        self.next_seq += 1;
        self.pending = Some(seq);
        debug!("requesting sync {}", seq);
        self.barrier.request_sync(seq);
    }

    /// The barrier for `seq` resolved. Emits the notification if `seq` is the
    /// pending round trip; returns whether it did.
    pub fn settle(&mut self, seq: SyncSeq) -> bool {
        if self.pending != Some(seq) {
            debug!("ignoring stale sync {} (pending: {:?})", seq, self.pending);
            return false;
        }

        self.pending = None;
        self.emitted += 1;
        // No subscribers is fine; consumers may attach later and query.
        let receivers = self.notifier.send(PolicyChanged).unwrap_or(0);
        info!("policy changed (sync {}, {} subscribers)", seq, receivers);
        true
    }

    /// The barrier for `seq` failed. The pending round trip is dropped without
    /// emitting and the failure is handed back to the owner.
    pub fn settle_failed(&mut self, seq: SyncSeq, reason: impl Into<String>) -> Result<(), PolicyError> {
        let reason = reason.into();
        if self.pending != Some(seq) {
            debug!("ignoring failure of stale sync {}: {}", seq, reason);
            return Ok(());
        }

        self.pending = None;
        warn!("core sync error for {}: {}", seq, reason);
        Err(PolicyError::Barrier { seq, reason })
    }
}

impl fmt::Debug for ChangeScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeScheduler")
            .field("next_seq", &self.next_seq)
            .field("pending", &self.pending)
            .field("emitted", &self.emitted)
            .finish()
    }
}
