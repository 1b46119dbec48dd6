//! Top-level driver (spec §4.7): materializes every block-map entry as a
//! begin-node, seeds the start block's frame state (parameters, and a
//! synchronized method's monitor-enter), drains the worklist, and
//! finalizes any synthetic blocks left deferred by exception-dispatch
//! construction.

use super::core::GraphBuilder;
use crate::collab::{BlockMap, BytecodeStream, ConstantPoolResolver, MethodHandle, RuntimeDescriptor};
use crate::error::{BuildError, Result};
use crate::frame_state::{FrameState, Slot};
use crate::graph::{BeginData, GraphArena, NodeId, NodeKind};
use crate::CompileOptions;
use crate::collab::Kind;

pub(crate) fn build(
    options: &CompileOptions,
    method: &MethodHandle,
    block_map: &dyn BlockMap,
    stream: &mut dyn BytecodeStream,
    pool: &dyn ConstantPoolResolver,
    runtime: &dyn RuntimeDescriptor,
) -> Result<GraphArena> {
    let mut b = GraphBuilder::new(options, method, block_map, stream, pool, runtime);

    let blocks = block_map.blocks().to_vec();
    if blocks.is_empty() {
        return Err(BuildError::internal("block map produced no blocks"));
    }

    for info in &blocks {
        let begin = b.arena.push(
            NodeKind::Begin(BeginData {
                starting_bci: info.start_bci,
                is_loop_header: info.is_loop_header,
                state_before: None,
                end: None,
                predecessors: Vec::new(),
                synthetic: false,
            }),
            Kind::Void,
        )?;
        b.block_index.insert(info, begin);
    }

    // Unreachable-handler drop: a handler whose entry bci was never
    // produced as a block start can never actually be branched to, so it
    // is dropped up front rather than left to fail block-lookup later
    // when a throw site's dispatch chain is built (spec §4.6, §8).
    b.handlers = method
        .handlers
        .iter()
        .cloned()
        .filter(|h| blocks.iter().any(|blk| blk.start_bci == h.handler_bci))
        .collect();

    let first_user_block = b
        .block_index
        .begin_at_bci(0)
        .ok_or_else(|| BuildError::internal("block map has no block starting at bci 0"))?;

    let (synthetic_start, entry_state) = seed_entry_state(&mut b)?;

    if method.is_synchronized {
        emit_monitor_enter(&mut b, synthetic_start, entry_state)?;
    }

    // Terminate the synthetic start block with a goto into the first user
    // block and merge the entry state through the normal merge engine
    // (spec §4.7 steps 1, 4, 6) rather than writing the first user block's
    // `state_before` by hand — if that block is itself a loop header (a
    // method whose entire body is one backward-branching loop, with no
    // prologue before bci 0), only `merge()`'s first-arrival branch calls
    // `insert_loop_phis`, and only `merge()` records a predecessor edge.
    let goto = b.arena.push(NodeKind::Goto { target: first_user_block }, Kind::Void)?;
    b.set_begin_end(synthetic_start, goto);
    let is_loop_header = matches!(&b.arena.get(first_user_block).kind, NodeKind::Begin(begin) if begin.is_loop_header);
    let entry_frame = b.arena.frame_state(entry_state).clone();
    b.merge(first_user_block, synthetic_start, &entry_frame, is_loop_header)?;

    while let Some(begin) = b.worklist.pop_next() {
        if b.is_dispatch_node(begin) {
            b.process_dispatch(begin)?;
        } else if b.is_pending_synthetic(begin) {
            // Unwind block / sync-unlock handler: no bytecode range, body
            // installed later by finalize_synthetic_blocks.
        } else {
            let end_bci = block_end_bci(&blocks, &b, begin)?;
            b.parse_block(begin, end_bci)?;
        }
    }

    b.finalize_synthetic_blocks()?;

    Ok(b.arena)
}

/// Create the synthetic method-entry block (spec §4.7 step 1) and seed its
/// `state_before` directly from the parameter locals (receiver first, if
/// any, then declared params) — this block has no predecessor of its own,
/// so there is nothing for `merge` to reconcile against. The real first
/// user block at bci 0 is reached afterwards through an ordinary `merge`
/// call in `build`, so a loop header there still gets its loop-phis.
fn seed_entry_state(b: &mut GraphBuilder<'_>) -> Result<(NodeId, crate::frame_state::FrameStateId)> {
    let start_begin = b.new_synthetic_begin(false)?;
    let max_locals = b.method.max_locals as usize;
    let mut locals = vec![Slot::Dead; max_locals];
    let mut index = 0usize;
    let mut param_index = 0u32;

    if !b.method.is_static {
        let node = b.arena.push(NodeKind::Parameter { index: param_index }, Kind::Object)?;
        locals[index] = Slot::Present { value: node, kind: Kind::Object, continuation: false };
        index += 1;
        param_index += 1;
    }
    for kind in b.method.param_kinds.clone() {
        let node = b.arena.push(NodeKind::Parameter { index: param_index }, kind)?;
        locals[index] = Slot::Present { value: node, kind, continuation: false };
        index += 1;
        param_index += 1;
        if kind.is_wide() {
            locals[index] = Slot::Present { value: node, kind, continuation: true };
            index += 1;
        }
    }

    let state = FrameState { locals, stack: Vec::new(), locks: Vec::new(), bci: 0 };
    let fsid = b.arena.intern_frame_state(state);
    b.begin_mut(start_begin).state_before = Some(fsid);
    Ok((start_begin, fsid))
}

/// Emit the method-entry `MonitorEnter` for a synchronized method: the
/// receiver for an instance method (already seeded as local 0), or the
/// declaring class's mirror for a static one. Runs once, before the start
/// block's own bytecode.
///
/// Also installs the implicit catch-all unlock handler (spec §4.7 step
/// 5c) and merges the post-enter state into it immediately, so it is
/// reachable even for a body with no explicit throwing instruction — a
/// synchronized method's monitor must be released on *any* exit, not
/// just ones the bytecode spells out as `ATHROW`/`INVOKE*`.
fn emit_monitor_enter(b: &mut GraphBuilder<'_>, start_begin: NodeId, entry_state: crate::frame_state::FrameStateId) -> Result<()> {
    let lock_object = if b.method.is_static {
        b.arena.push(NodeKind::ClassConstant { ty: b.method.declaring_type.clone() }, Kind::Object)?
    } else {
        b.arena
            .frame_state(entry_state)
            .locals
            .first()
            .and_then(|slot| slot.value())
            .ok_or_else(|| BuildError::internal("instance method has no receiver in local 0"))?
    };
    b.arena.push(NodeKind::MonitorEnter { object: lock_object }, Kind::Void)?;
    b.sync_lock_object = Some(lock_object);

    let handler = b.ensure_sync_unlock_handler()?;
    let exception_value = b.arena.push(NodeKind::ExceptionObject, Kind::Object)?;
    let base = b.arena.frame_state(entry_state).clone();
    let protected = FrameState {
        locals: base.locals,
        stack: vec![Slot::Present { value: exception_value, kind: Kind::Object, continuation: false }],
        locks: base.locks,
        bci: 0,
    };
    b.merge(handler, start_begin, &protected, false)?;
    Ok(())
}

fn block_end_bci(blocks: &[crate::collab::BlockInfo], b: &GraphBuilder<'_>, begin: NodeId) -> Result<u32> {
    let key = b.block_index.order_key(begin);
    blocks
        .iter()
        .find(|info| info.id == key)
        .map(|info| info.end_bci)
        .ok_or_else(|| BuildError::internal("worklist produced a block id absent from the block map"))
}
