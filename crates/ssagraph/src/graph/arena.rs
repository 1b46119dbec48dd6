//! The graph arena (spec §3 "graph arena", §5 "Shared-resource policy").
//!
//! Owns every node and every frame-state snapshot created during one
//! method compile. Nodes are append-only and referenced by stable
//! `NodeId` handles, so cyclic edges (a loop-phi whose own later users
//! feed back into it) need no special-casing: freeing is en masse when
//! the arena is dropped at the end of the compile.

use super::node::{IrNode, NodeKind};
use crate::collab::Kind;
use crate::error::{BailoutKind, BuildError, Result};
use crate::frame_state::{FrameState, FrameStateId};
use std::collections::HashMap;

use super::node::NodeId;

/// Owns the node and frame-state tables for one method compile.
pub struct GraphArena {
    nodes: Vec<IrNode>,
    frame_states: Vec<FrameState>,
    max_node_count: usize,
    /// Structural dedup cache for reused exception-dispatch chain nodes
    /// (spec §4.6 "reuse an existing dispatch node ... structural dedup",
    /// §8 "Dispatch-chain reuse"). Keyed by (catch-type name or None,
    /// handler-entry begin, next-in-chain begin).
    dispatch_cache: HashMap<(Option<String>, NodeId, NodeId), NodeId>,
}

impl GraphArena {
    pub fn new(max_node_count: usize) -> Self {
        Self {
            nodes: Vec::new(),
            frame_states: Vec::new(),
            max_node_count,
            dispatch_cache: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Append a new node, assigning it the next monotonic `NodeId`.
    pub fn push(&mut self, kind: NodeKind, value_kind: Kind) -> Result<NodeId> {
        if self.nodes.len() >= self.max_node_count {
            return Err(BuildError::Bailout(BailoutKind::MethodTooLarge {
                limit: self.max_node_count,
            }));
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(IrNode {
            id,
            kind,
            value_kind,
            frame_state: None,
        });
        Ok(id)
    }

    pub fn get(&self, id: NodeId) -> &IrNode {
        &self.nodes[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut IrNode {
        &mut self.nodes[id.0 as usize]
    }

    pub fn attach_state(&mut self, id: NodeId, state: FrameStateId) {
        self.get_mut(id).frame_state = Some(state);
    }

    /// Intern a frame-state snapshot into the arena, returning its handle.
    pub fn intern_frame_state(&mut self, state: FrameState) -> FrameStateId {
        let id = FrameStateId(self.frame_states.len() as u32);
        self.frame_states.push(state);
        id
    }

    pub fn frame_state(&self, id: FrameStateId) -> &FrameState {
        &self.frame_states[id.0 as usize]
    }

    /// If `NodeKind::Const` and the arena already has this exact literal,
    /// true constant-folding opportunities check nodes directly — this
    /// helper is what the dispatcher uses to decide whether two stack
    /// operands are "already compile-time constants" (spec §4.2 "fold
    /// when both inputs are constants").
    pub fn as_const(&self, id: NodeId) -> Option<crate::collab::ConstValue> {
        match self.get(id).kind {
            NodeKind::Const(v) => Some(v),
            _ => None,
        }
    }

    pub fn dispatch_cache_get(
        &self,
        catch_type: &Option<String>,
        handler_entry: NodeId,
        next: NodeId,
    ) -> Option<NodeId> {
        self.dispatch_cache
            .get(&(catch_type.clone(), handler_entry, next))
            .copied()
    }

    pub fn dispatch_cache_insert(
        &mut self,
        catch_type: Option<String>,
        handler_entry: NodeId,
        next: NodeId,
        dispatch_begin: NodeId,
    ) {
        self.dispatch_cache
            .insert((catch_type, handler_entry, next), dispatch_begin);
    }

    pub fn nodes(&self) -> &[IrNode] {
        &self.nodes
    }
}
