//! Merge engine and loop-phi insertion (spec §4.4).
//!
//! `merge(target, from, incoming, is_loop_header)` is the only way a
//! predecessor's frame state reaches a successor block. On first arrival
//! it seeds the block's `state_before`; loop headers additionally get a
//! φ-node for every live slot *before* any back edge is parsed, so the
//! eventual back-edge merge only has to append an input rather than
//! rewrite every existing user of the pre-loop value (spec's "Loop-phi").
//! On later arrivals, each slot is compared pointwise and either kept,
//! widened into an existing φ's inputs, or turned into a brand new φ.

use super::core::GraphBuilder;
use crate::error::{BuildError, Result};
use crate::frame_state::{FrameState, Slot};
use crate::graph::{NodeId, NodeKind};

impl<'a> GraphBuilder<'a> {
    /// Merge `incoming`, arriving via the edge from `from`, into `target`.
    pub(crate) fn merge(
        &mut self,
        target: NodeId,
        from: NodeId,
        incoming: &FrameState,
        is_loop_header: bool,
    ) -> Result<()> {
        let already_seeded = self.begin_state_before(target).is_some();

        if !already_seeded {
            let mut locals = incoming.locals.clone();
            let mut stack = incoming.stack.clone();
            if is_loop_header {
                locals = self.insert_loop_phis(target, &locals)?;
                stack = self.insert_loop_phis(target, &stack)?;
            }
            let seeded = FrameState {
                locals,
                stack,
                locks: incoming.locks.clone(),
                bci: incoming.bci,
            };
            let fsid = self.arena.intern_frame_state(seeded);
            self.begin_mut(target).state_before = Some(fsid);
            self.begin_mut(target).predecessors.push(from);
            self.worklist.enqueue(target, &self.block_index);
            return Ok(());
        }

        // Subsequent arrival: verifier-equivalent shape check, then
        // pointwise slot reconciliation.
        let existing = self.begin_state_before(target).unwrap();
        let existing_state = self.arena.frame_state(existing).clone();

        if !self.options.assume_verified_bytecode {
            if existing_state.shape() != incoming.shape() {
                return Err(BuildError::verifier(format!(
                    "frame shape mismatch merging into block {}: {:?} vs {:?}",
                    target,
                    existing_state.shape(),
                    incoming.shape()
                )));
            }
        }

        let locals = self.merge_slots(target, &existing_state.locals, &incoming.locals)?;
        let stack = self.merge_slots(target, &existing_state.stack, &incoming.stack)?;

        let merged = FrameState {
            locals,
            stack,
            locks: existing_state.locks.clone(),
            bci: existing_state.bci,
        };
        let fsid = self.arena.intern_frame_state(merged);
        self.begin_mut(target).state_before = Some(fsid);
        self.begin_mut(target).predecessors.push(from);
        Ok(())
    }

    /// First arrival at a loop header: give every live slot its own
    /// loop-φ, fed for now only by the incoming (forward-entry) value.
    fn insert_loop_phis(&mut self, block: NodeId, slots: &[Slot]) -> Result<Vec<Slot>> {
        let mut out = Vec::with_capacity(slots.len());
        let mut i = 0;
        while i < slots.len() {
            match slots[i] {
                Slot::Dead => {
                    out.push(Slot::Dead);
                    i += 1;
                }
                Slot::Present {
                    value,
                    kind,
                    continuation: false,
                } => {
                    let phi = self.arena.push(
                        NodeKind::Phi {
                            block,
                            inputs: vec![value],
                            is_loop_phi: true,
                        },
                        kind,
                    )?;
                    out.push(Slot::Present {
                        value: phi,
                        kind,
                        continuation: false,
                    });
                    if kind.is_wide() {
                        i += 1;
                        out.push(Slot::Present {
                            value: phi,
                            kind,
                            continuation: true,
                        });
                    }
                    i += 1;
                }
                Slot::Present {
                    continuation: true, ..
                } => {
                    // Reached independently of its primary only if the
                    // primary slot was dead, which verification forbids.
                    return Err(BuildError::internal(
                        "continuation slot without a preceding primary in loop-phi insertion",
                    ));
                }
            }
        }
        Ok(out)
    }

    /// Pointwise-reconcile an existing and an incoming slot vector of
    /// identical length (already shape-checked by the caller).
    fn merge_slots(&mut self, block: NodeId, existing: &[Slot], incoming: &[Slot]) -> Result<Vec<Slot>> {
        let mut out = Vec::with_capacity(existing.len());
        let mut i = 0;
        while i < existing.len() {
            match (existing[i], incoming[i]) {
                (Slot::Dead, _) | (_, Slot::Dead) => {
                    // Tie-break: either side dead => merged slot is dead.
                    out.push(Slot::Dead);
                    i += 1;
                }
                (
                    Slot::Present {
                        value: ev,
                        kind: ek,
                        continuation: false,
                    },
                    Slot::Present {
                        value: iv,
                        kind: ik,
                        continuation: false,
                    },
                ) => {
                    if ek != ik {
                        return Err(BuildError::verifier(format!(
                            "kind mismatch merging slot {i}: {ek} vs {ik}"
                        )));
                    }
                    let merged_value = self.reconcile_value(block, ev, iv, ek)?;
                    out.push(Slot::Present {
                        value: merged_value,
                        kind: ek,
                        continuation: false,
                    });
                    if ek.is_wide() {
                        i += 1;
                        out.push(Slot::Present {
                            value: merged_value,
                            kind: ek,
                            continuation: true,
                        });
                    }
                    i += 1;
                }
                (
                    Slot::Present {
                        continuation: true, ..
                    },
                    Slot::Present {
                        continuation: true, ..
                    },
                ) => {
                    return Err(BuildError::internal(
                        "continuation slot merged independently of its primary",
                    ));
                }
                _ => {
                    return Err(BuildError::verifier(format!(
                        "slot {i} shape mismatch (continuation/primary disagreement)"
                    )));
                }
            }
        }
        Ok(out)
    }

    /// Reconcile a single live value appearing on both sides of a merge.
    fn reconcile_value(&mut self, block: NodeId, existing: NodeId, incoming: NodeId, kind: crate::collab::Kind) -> Result<NodeId> {
        if existing == incoming {
            return Ok(existing);
        }
        // If `existing` is already a phi of this block, widen its inputs.
        let existing_is_phi_of_block = matches!(
            &self.arena.get(existing).kind,
            NodeKind::Phi { block: b, .. } if *b == block
        );
        if existing_is_phi_of_block {
            if let NodeKind::Phi { inputs, .. } = &mut self.arena.get_mut(existing).kind {
                inputs.push(incoming);
            }
            return Ok(existing);
        }
        let phi = self.arena.push(
            NodeKind::Phi {
                block,
                inputs: vec![existing, incoming],
                is_loop_phi: false,
            },
            kind,
        )?;
        Ok(phi)
    }
}
