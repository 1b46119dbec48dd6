//! Ordered set of unparsed blocks (spec §2 "Worklist and scheduler", §5
//! "Ordering guarantees"). Parsing order is keyed on the block map's own
//! dense id, lowest first, so node ids and predecessor orderings are
//! reproducible across runs (spec §8 "Deterministic id assignment").
//!
//! Every block is scheduled at most once in its lifetime: a forward edge
//! enqueues a block before it is first parsed, and a later back edge (or
//! a dispatch-chain link merging again) only needs to append a φ input,
//! not trigger a second parse — so once a block has been popped it can
//! never be re-enqueued (spec §4.4 "loop-phi" relies on this).

use crate::block_index::BlockIndex;
use crate::graph::NodeId;
use std::collections::BTreeSet;
use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct Worklist {
    queue: BTreeSet<(u32, NodeId)>,
    /// Every block ever enqueued, queued or not — prevents re-scheduling
    /// a block that has already been popped and parsed.
    seen: HashSet<NodeId>,
}

impl Worklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue `block`, keyed by its order in `index`. No-op if this
    /// block has ever been enqueued before, whether still queued or
    /// already popped and parsed.
    pub fn enqueue(&mut self, block: NodeId, index: &BlockIndex) {
        if self.seen.insert(block) {
            self.queue.insert((index.order_key(block), block));
        }
    }

    pub fn pop_next(&mut self) -> Option<NodeId> {
        let entry = self.queue.iter().next().copied()?;
        self.queue.remove(&entry);
        Some(entry.1)
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
