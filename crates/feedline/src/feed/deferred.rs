//! DeferredWorkScheduler - post-attach side effects on a virtual clock.
//!
//! Ops run once, after their handle is confirmed attached, with no ordering
//! guarantee among each other. The scheduler owns nothing but time: the
//! reconciler executes due ops and performs the attachment re-check, so an
//! evicted id cancels its outstanding work implicitly. The host drives the
//! clock through `advance`; tests advance it deterministically.

use std::time::Duration;

use crate::model::MessageId;

/// Minimum delay between attachment and a deferred op running, so the
/// attach has taken visual effect first
pub const ATTACH_SETTLE_DELAY: Duration = Duration::from_millis(10);

/// One side effect scheduled against an attached handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredOp {
    pub id: MessageId,
    pub kind: DeferredOpKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferredOpKind {
    /// Resolve an asset key and deliver the result to the handle
    LoadAsset { asset_key: String },
}

#[derive(Debug)]
struct Scheduled {
    due: Duration,
    op: DeferredOp,
}

/// Task queue with run-after-attach semantics
#[derive(Debug, Default)]
pub struct DeferredWorkScheduler {
    now: Duration,
    queue: Vec<Scheduled>,
    /// Freshly attached ids awaiting the one combined entrance step
    entrance: Vec<MessageId>,
}

impl DeferredWorkScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp a batch of ops due one settle delay from now
    pub fn schedule(&mut self, ops: Vec<DeferredOp>) {
        let due = self.now + ATTACH_SETTLE_DELAY;
        self.queue
            .extend(ops.into_iter().map(|op| Scheduled { due, op }));
    }

    /// Record freshly attached ids for the batched entrance transition
    pub fn queue_entrance(&mut self, ids: impl IntoIterator<Item = MessageId>) {
        self.entrance.extend(ids);
    }

    /// Advance the clock and pop every op that came due. Each op is
    /// returned at most once.
    pub fn advance(&mut self, elapsed: Duration) -> Vec<DeferredOp> {
        self.now += elapsed;
        let now = self.now;
        let mut due = Vec::new();
        self.queue.retain_mut(|scheduled| {
            if scheduled.due <= now {
                due.push(scheduled.op.clone());
                false
            } else {
                true
            }
        });
        due
    }

    /// Drain the entrance batch; applied in one combined step per frame
    pub fn take_entrance_batch(&mut self) -> Vec<MessageId> {
        std::mem::take(&mut self.entrance)
    }

    /// Ops still waiting for their due time
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}
