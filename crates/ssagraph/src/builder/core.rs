//! `GraphBuilder` state and small helpers shared by every other module in
//! `builder::*` (spec §2 "Core state", §4.1).
//!
//! Mirrors the teacher's `IrBuilder`: one struct per compile, holding the
//! value model (arena), the scheduler (worklist + block index), the
//! current working frame state, and read-only handles to the four
//! collaborator traits. Unlike `IrBuilder`'s `control_stack` (nested
//! block/loop/if frames known at translation time from a structured
//! input), this builder's control flow is discovered block-by-block from
//! an already-flat, already-partitioned bytecode stream, so there is no
//! control stack — only the worklist.

use crate::block_index::BlockIndex;
use crate::collab::{BlockMap, BytecodeStream, ConstantPoolResolver, ExceptionHandlerRecord, MethodHandle, RuntimeDescriptor};
use crate::error::Result;
use crate::frame_state::FrameStateBuilder;
use crate::graph::{GraphArena, NodeId};
use crate::worklist::Worklist;
use crate::CompileOptions;

/// One compile's worth of mutable builder state.
pub(crate) struct GraphBuilder<'a> {
    pub(crate) arena: GraphArena,
    pub(crate) block_index: BlockIndex,
    pub(crate) worklist: Worklist,
    pub(crate) frame: FrameStateBuilder,
    pub(crate) options: &'a CompileOptions,
    pub(crate) method: &'a MethodHandle,
    pub(crate) block_map: &'a dyn BlockMap,
    pub(crate) stream: &'a mut dyn BytecodeStream,
    pub(crate) pool: &'a dyn ConstantPoolResolver,
    pub(crate) runtime: &'a dyn RuntimeDescriptor,

    /// Handlers covering the bci currently being parsed, filtered once at
    /// driver start to drop handlers provably unreachable (spec §4.6
    /// "Unreachable-handler drop").
    pub(crate) handlers: Vec<ExceptionHandlerRecord>,

    /// The block currently being parsed; `None` before the driver starts
    /// the first block.
    pub(crate) current_block: Option<NodeId>,

    /// Shared unwind block: the root of the exception-dispatch chain for
    /// any throw site not covered by a declared handler. Created as a
    /// placeholder the first time it's needed and finalized once after
    /// the worklist drains (spec §4.7 step 8). Unused when the method is
    /// synchronized — `sync_unlock_handler` takes its place as the chain
    /// root in that case.
    pub(crate) unwind_block: Option<NodeId>,

    /// Shared unlock-then-unwind block for a synchronized method's
    /// implicit catch-all handler. Same deferred-finalization treatment
    /// as `unwind_block`.
    pub(crate) sync_unlock_handler: Option<NodeId>,

    /// The object `MonitorEnter`ed on method entry, for a synchronized
    /// method (the receiver, or the declaring class for a static method).
    /// `None` for non-synchronized methods.
    pub(crate) sync_lock_object: Option<NodeId>,

    /// Next order key handed out to a freshly created synthetic block.
    pub(crate) next_synthetic_order_key: u32,
}

impl<'a> GraphBuilder<'a> {
    pub(crate) fn new(
        options: &'a CompileOptions,
        method: &'a MethodHandle,
        block_map: &'a dyn BlockMap,
        stream: &'a mut dyn BytecodeStream,
        pool: &'a dyn ConstantPoolResolver,
        runtime: &'a dyn RuntimeDescriptor,
    ) -> Self {
        Self {
            arena: GraphArena::new(options.max_node_count),
            block_index: BlockIndex::new(),
            worklist: Worklist::new(),
            frame: FrameStateBuilder::new(method.max_locals as usize, method.max_stack as usize),
            options,
            method,
            block_map,
            stream,
            pool,
            runtime,
            handlers: Vec::new(),
            current_block: None,
            unwind_block: None,
            sync_unlock_handler: None,
            sync_lock_object: None,
            next_synthetic_order_key: u32::MAX / 2,
        }
    }

    /// Create a synthetic begin-node with no bytecode range of its own,
    /// registering it in the block index so it sorts after every real
    /// block (spec §5 "synthetic blocks scheduled last, in creation order").
    pub(crate) fn new_synthetic_begin(&mut self, is_loop_header: bool) -> Result<NodeId> {
        let key = self.fresh_synthetic_order_key();
        let begin = self.arena.push(
            crate::graph::NodeKind::Begin(crate::graph::BeginData {
                starting_bci: self.method.code_length,
                is_loop_header,
                state_before: None,
                end: None,
                predecessors: Vec::new(),
                synthetic: true,
            }),
            crate::collab::Kind::Void,
        )?;
        self.block_index.insert_synthetic(begin, key);
        Ok(begin)
    }

    /// Set a begin-node's terminator once it has been created.
    pub(crate) fn set_begin_end(&mut self, begin: NodeId, terminator: NodeId) {
        if let crate::graph::NodeKind::Begin(b) = &mut self.arena.get_mut(begin).kind {
            b.end = Some(terminator);
        }
    }

    pub(crate) fn begin_state_before(&self, begin: NodeId) -> Option<crate::frame_state::FrameStateId> {
        match &self.arena.get(begin).kind {
            crate::graph::NodeKind::Begin(b) => b.state_before,
            _ => None,
        }
    }

    pub(crate) fn begin_mut(&mut self, begin: NodeId) -> &mut crate::graph::BeginData {
        match &mut self.arena.get_mut(begin).kind {
            crate::graph::NodeKind::Begin(b) => b,
            _ => panic!("node {begin} is not a begin-node"),
        }
    }

    /// Allocate the next order key for a synthetic block. Keys start well
    /// above any block-map id and increase monotonically, so synthetic
    /// blocks always sort after every real block and amongst themselves
    /// in creation order (spec §5 "synthetic blocks are scheduled last,
    /// in creation order").
    pub(crate) fn fresh_synthetic_order_key(&mut self) -> u32 {
        let key = self.next_synthetic_order_key;
        self.next_synthetic_order_key += 1;
        key
    }

    /// Attach an immutable frame-state snapshot to a node that can
    /// observe control flow: calls, allocations, throws (spec §3 "IR
    /// node": "for instructions that may observe control flow ... an
    /// attached immutable frame-state snapshot").
    pub(crate) fn attach_snapshot(&mut self, node: NodeId, bci: u32) {
        let snapshot = self.frame.snapshot(bci);
        let fsid = self.arena.intern_frame_state(snapshot);
        self.arena.attach_state(node, fsid);
    }

    pub(crate) fn trace(&self, level: u8, msg: impl FnOnce() -> String) {
        if self.options.trace_parser_level >= level {
            eprintln!("[ssagraph] {}", msg());
        }
    }
}
