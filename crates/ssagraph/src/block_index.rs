//! Maps a bytecode index to its block's begin-node (spec §2 "Block
//! index"). Mirrors the block-map's block list one-to-one.

use crate::collab::BlockInfo;
use crate::graph::NodeId;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct BlockIndex {
    by_bci: HashMap<u32, NodeId>,
    /// The block-map's own dense id for each begin-node, used to order
    /// the worklist deterministically (spec §5).
    order_key: HashMap<NodeId, u32>,
}

impl BlockIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, info: &BlockInfo, begin: NodeId) {
        self.by_bci.insert(info.start_bci, begin);
        self.order_key.insert(begin, info.id);
    }

    /// Register a synthetic block (no block-map entry) with an explicit
    /// order key beyond the block map's own ids, so it always sorts last.
    pub fn insert_synthetic(&mut self, begin: NodeId, order_key: u32) {
        self.order_key.insert(begin, order_key);
    }

    pub fn begin_at_bci(&self, bci: u32) -> Option<NodeId> {
        self.by_bci.get(&bci).copied()
    }

    pub fn order_key(&self, begin: NodeId) -> u32 {
        self.order_key.get(&begin).copied().unwrap_or(u32::MAX)
    }
}
