//! Lazy exception-dispatch chain construction (spec §4.6).
//!
//! A throw site (an `ATHROW`, an instruction covered by `Invoke`, or an
//! implicit `MonitorExit`) doesn't jump straight to a handler. It merges
//! its exception value into the *head* of a chain of synthetic `Dispatch`
//! blocks, one per covering handler, each testing its catch type against
//! the thrown value and branching to either the handler or the next link.
//! The chain is built tail-first so the final link (no handler matched)
//! always points at the method's unwind block — or, for a synchronized
//! method, at the implicit unlock-then-unwind handler.
//!
//! Dispatch nodes are ordinary begin-nodes; the only thing distinguishing
//! them is a `Dispatch` terminator instead of `If`/`Goto`/etc. Two throw
//! sites covered by the same handlers therefore share the same chain
//! nodes (looked up via `GraphArena`'s structural cache), and the normal
//! merge engine phi's their distinct exception values together at each
//! shared link for free.

use super::core::GraphBuilder;
use crate::collab::{ExceptionHandlerRecord, Kind};
use crate::error::{BuildError, Result};
use crate::graph::{DispatchData, NodeId, NodeKind};

impl<'a> GraphBuilder<'a> {
    /// Build (or reuse) the dispatch chain covering `throwing_bci` and
    /// merge this throw site's exception value into its head. Returns
    /// `None` if nothing covers this site: no declared handler and the
    /// method isn't synchronized, so the exception simply propagates to
    /// the caller without any graph edge to represent it.
    pub(crate) fn exception_edge_for(&mut self, throwing_bci: u32) -> Result<Option<NodeId>> {
        let covering = self.covering_handlers(throwing_bci);
        if covering.is_empty() && !self.method.is_synchronized {
            return Ok(None);
        }
        let from = self
            .current_block
            .ok_or_else(|| BuildError::internal("no current block while attaching an exception edge"))?;

        let exception_value = self.arena.push(NodeKind::ExceptionObject, Kind::Object)?;
        let head = self.build_dispatch_chain(&covering)?;
        let state = self.frame.duplicate_modified(throwing_bci, Kind::Object, exception_value);
        self.merge(head, from, &state, false)?;
        Ok(Some(head))
    }

    /// Handlers covering `bci`, in declaration order, stopping just after
    /// the first catch-all (spec §4.6 "Unreachable-handler drop" relies on
    /// the driver having already removed handlers no throwing instruction
    /// can reach at all; this stops the *search*, not the handler list).
    fn covering_handlers(&self, bci: u32) -> Vec<ExceptionHandlerRecord> {
        let mut out = Vec::new();
        for handler in &self.handlers {
            if bci >= handler.start_bci && bci < handler.end_bci {
                let is_catch_all = handler.catch_type.is_none();
                out.push(handler.clone());
                if is_catch_all {
                    break;
                }
            }
        }
        out
    }

    /// Build the chain tail-first: the last covering handler's on-mismatch
    /// edge is the method's unwind endpoint; each earlier handler's
    /// on-mismatch edge is the node just built for the handler after it.
    fn build_dispatch_chain(&mut self, covering: &[ExceptionHandlerRecord]) -> Result<NodeId> {
        let mut next = if self.method.is_synchronized {
            self.ensure_sync_unlock_handler()?
        } else {
            self.ensure_unwind_block()?
        };

        for handler in covering.iter().rev() {
            let handler_entry = self.block_index.begin_at_bci(handler.handler_bci).ok_or_else(|| {
                BuildError::internal(format!(
                    "exception handler target bci {} has no block",
                    handler.handler_bci
                ))
            })?;
            let catch_key = handler.catch_type.as_ref().map(|ty| ty.name.clone());

            if let Some(cached) = self.arena.dispatch_cache_get(&catch_key, handler_entry, next) {
                next = cached;
                continue;
            }

            let dispatch = self.new_synthetic_begin(false)?;
            let terminator = self.arena.push(
                NodeKind::Dispatch(DispatchData {
                    catch_type: handler.catch_type.clone(),
                    on_match: handler_entry,
                    on_mismatch: next,
                }),
                Kind::Void,
            )?;
            self.set_begin_end(dispatch, terminator);
            self.arena.dispatch_cache_insert(catch_key, handler_entry, next, dispatch);
            // Dispatch nodes sort after every real block-map block (spec
            // §5), so by the time this one is popped, every throw site
            // that can reach it has already merged its exception value in.
            self.worklist.enqueue(dispatch, &self.block_index);
            next = dispatch;
        }

        Ok(next)
    }

    /// Process a dispatch node popped off the worklist: forward its own
    /// (by now fully phi'd) frame state — locals, locks, and the single
    /// exception-object stack slot — to both its match and mismatch
    /// targets, exactly as an ordinary two-successor block would.
    pub(crate) fn process_dispatch(&mut self, begin: NodeId) -> Result<()> {
        let terminator = self.begin_end(begin)?;
        let (on_match, on_mismatch) = match &self.arena.get(terminator).kind {
            NodeKind::Dispatch(d) => (d.on_match, d.on_mismatch),
            _ => return Err(BuildError::internal("begin's terminator is not a Dispatch node")),
        };
        let state_id = self
            .begin_state_before(begin)
            .ok_or_else(|| BuildError::internal("dispatch node was parsed with no incoming exception value"))?;
        let state = self.arena.frame_state(state_id).clone();

        let loop_match = self.is_loop_header(on_match);
        self.merge(on_match, begin, &state, loop_match)?;
        let loop_mismatch = self.is_loop_header(on_mismatch);
        self.merge(on_mismatch, begin, &state, loop_mismatch)
    }

    /// Is `begin` a dispatch node awaiting processing (as opposed to a
    /// real block awaiting bytecode parsing, or an unfinalized unwind
    /// placeholder that is never put on the worklist)?
    pub(crate) fn is_dispatch_node(&self, begin: NodeId) -> bool {
        match &self.arena.get(begin).kind {
            NodeKind::Begin(b) => match b.end {
                Some(end) => matches!(&self.arena.get(end).kind, NodeKind::Dispatch(_)),
                None => false,
            },
            _ => false,
        }
    }

    /// A synthetic block (the shared unwind block or the sync-unlock
    /// handler) that has been merged into but not yet given a body. It
    /// carries no bytecode range and isn't a dispatch node either, so the
    /// driver must skip it when popped rather than try to parse it —
    /// its terminator is installed later by `finalize_synthetic_blocks`.
    pub(crate) fn is_pending_synthetic(&self, begin: NodeId) -> bool {
        matches!(&self.arena.get(begin).kind, NodeKind::Begin(b) if b.synthetic && b.end.is_none())
    }

    fn begin_end(&self, begin: NodeId) -> Result<NodeId> {
        match &self.arena.get(begin).kind {
            NodeKind::Begin(b) => b.end.ok_or_else(|| BuildError::internal("dispatch node has no terminator set")),
            _ => Err(BuildError::internal(format!("{begin} is not a begin-node"))),
        }
    }

    fn is_loop_header(&self, begin: NodeId) -> bool {
        matches!(&self.arena.get(begin).kind, NodeKind::Begin(b) if b.is_loop_header)
    }

    /// Lazily create the shared unwind block. Its terminator is left
    /// unset until `finalize_synthetic_blocks` runs after the worklist
    /// drains, once every throw site that can reach it has merged in.
    pub(crate) fn ensure_unwind_block(&mut self) -> Result<NodeId> {
        if let Some(existing) = self.unwind_block {
            return Ok(existing);
        }
        let begin = self.new_synthetic_begin(false)?;
        self.unwind_block = Some(begin);
        Ok(begin)
    }

    /// Lazily create the synchronized method's implicit catch-all: unlock
    /// the method's monitor, then unwind. Same deferred-terminator
    /// treatment as `ensure_unwind_block`.
    pub(crate) fn ensure_sync_unlock_handler(&mut self) -> Result<NodeId> {
        if let Some(existing) = self.sync_unlock_handler {
            return Ok(existing);
        }
        let begin = self.new_synthetic_begin(false)?;
        self.sync_unlock_handler = Some(begin);
        Ok(begin)
    }

    /// Finalize any deferred synthetic blocks once the worklist has fully
    /// drained and every throw site has had a chance to merge into them
    /// (spec §4.7 step 8). Unreached placeholders get an `Unreachable`
    /// terminator instead of reading a `state_before` that never arrived.
    pub(crate) fn finalize_synthetic_blocks(&mut self) -> Result<()> {
        if let Some(begin) = self.unwind_block {
            self.finalize_unwind(begin)?;
        }
        if let Some(begin) = self.sync_unlock_handler {
            self.finalize_sync_unlock(begin)?;
        }
        Ok(())
    }

    fn exception_value_of(&self, begin: NodeId) -> Result<Option<NodeId>> {
        match self.begin_state_before(begin) {
            None => Ok(None),
            Some(fsid) => {
                let state = self.arena.frame_state(fsid);
                Ok(state.stack.first().and_then(|slot| slot.value()))
            }
        }
    }

    fn finalize_unwind(&mut self, begin: NodeId) -> Result<()> {
        let terminator = match self.exception_value_of(begin)? {
            None => self.arena.push(NodeKind::Unreachable, Kind::Void)?,
            Some(exception) => self.arena.push(NodeKind::Unwind { exception }, Kind::Void)?,
        };
        self.set_begin_end(begin, terminator);
        Ok(())
    }

    fn finalize_sync_unlock(&mut self, begin: NodeId) -> Result<()> {
        let exception = self.exception_value_of(begin)?;
        let terminator = match exception {
            None => self.arena.push(NodeKind::Unreachable, Kind::Void)?,
            Some(exception) => {
                if let Some(lock) = self.sync_lock_object {
                    self.arena.push(NodeKind::MonitorExit { object: lock }, Kind::Void)?;
                }
                self.arena.push(NodeKind::Unwind { exception }, Kind::Void)?
            }
        };
        self.set_begin_end(begin, terminator);
        Ok(())
    }
}
