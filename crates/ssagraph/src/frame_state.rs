//! The abstract interpreter's running state: locals, operand stack, and
//! lock stack (spec §4.1). [`FrameStateBuilder`] is the single mutable
//! working copy the dispatcher mutates instruction by instruction;
//! [`FrameState`] is the immutable snapshot taken at block boundaries and
//! handed to the merge engine or attached to a node for deoptimization.

use crate::collab::Kind;
use crate::error::{BuildError, Result};
use crate::graph::NodeId;

/// One stack or local word. Longs and doubles occupy a `Present` primary
/// slot followed by a `Present { continuation: true, .. }` slot carrying
/// the same `value`/`kind` (spec §3 "two-slot rule").
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Slot {
    Present {
        value: NodeId,
        kind: Kind,
        continuation: bool,
    },
    /// A dead/bogus slot — no value is live here on this path.
    Dead,
}

impl Slot {
    pub fn value(self) -> Option<NodeId> {
        match self {
            Slot::Present { value, .. } => Some(value),
            Slot::Dead => None,
        }
    }

    pub fn kind(self) -> Option<Kind> {
        match self {
            Slot::Present { kind, .. } => Some(kind),
            Slot::Dead => None,
        }
    }
}

/// Arena-stable handle to an interned [`FrameState`] snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameStateId(pub u32);

/// An immutable snapshot of locals/stack/locks at a specific BCI.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameState {
    pub locals: Vec<Slot>,
    pub stack: Vec<Slot>,
    pub locks: Vec<NodeId>,
    /// BCI to resume interpretation at if this snapshot is used for
    /// deoptimization.
    pub bci: u32,
}

impl FrameState {
    /// Locals/stack/locks sizes, compared across edges into a block
    /// (spec §8 "Merge-compat invariant").
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.locals.len(), self.stack.len(), self.locks.len())
    }
}

/// The mutable, single-owner working state for the block currently being
/// parsed. Reset (via [`FrameStateBuilder::restore`]) each time the driver
/// pulls a new block off the worklist.
#[derive(Debug, Clone)]
pub struct FrameStateBuilder {
    locals: Vec<Slot>,
    stack: Vec<Slot>,
    locks: Vec<NodeId>,
    max_stack: usize,
}

impl FrameStateBuilder {
    pub fn new(max_locals: usize, max_stack: usize) -> Self {
        Self {
            locals: vec![Slot::Dead; max_locals],
            stack: Vec::with_capacity(max_stack),
            locks: Vec::new(),
            max_stack,
        }
    }

    /// Replace the working state wholesale (entering a new block).
    pub fn restore(&mut self, state: &FrameState) {
        self.locals = state.locals.clone();
        self.stack = state.stack.clone();
        self.locks = state.locks.clone();
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    pub fn locals_len(&self) -> usize {
        self.locals.len()
    }

    // --- word-granular stack ops, used by DUP/SWAP/POP (spec: xpush/xpop) ---

    pub fn xpush(&mut self, slot: Slot) -> Result<()> {
        if self.stack.len() >= self.max_stack {
            return Err(BuildError::verifier(format!(
                "operand stack overflow: max_stack={}",
                self.max_stack
            )));
        }
        self.stack.push(slot);
        Ok(())
    }

    pub fn xpop(&mut self) -> Result<Slot> {
        self.stack
            .pop()
            .ok_or_else(|| BuildError::verifier("pop on empty operand stack"))
    }

    pub fn xpeek(&self, depth_from_top: usize) -> Result<Slot> {
        let len = self.stack.len();
        if depth_from_top >= len {
            return Err(BuildError::verifier("stack peek out of range"));
        }
        Ok(self.stack[len - 1 - depth_from_top])
    }

    // --- typed stack ops ---

    pub fn push(&mut self, kind: Kind, value: NodeId) -> Result<()> {
        if kind.is_wide() {
            self.xpush(Slot::Present {
                value,
                kind,
                continuation: false,
            })?;
            self.xpush(Slot::Present {
                value,
                kind,
                continuation: true,
            })?;
        } else {
            self.xpush(Slot::Present {
                value,
                kind,
                continuation: false,
            })?;
        }
        Ok(())
    }

    pub fn pop(&mut self, kind: Kind) -> Result<NodeId> {
        if kind.is_wide() {
            let hi = self.xpop()?;
            match hi {
                Slot::Present {
                    continuation: true, ..
                } => {}
                _ => return Err(BuildError::verifier("expected continuation slot of wide value")),
            }
            let lo = self.xpop()?;
            match lo {
                Slot::Present {
                    value,
                    kind: actual,
                    continuation: false,
                } if actual == kind => Ok(value),
                _ => Err(BuildError::verifier(format!("pop: expected {kind}"))),
            }
        } else {
            match self.xpop()? {
                Slot::Present {
                    value,
                    kind: actual,
                    continuation: false,
                } if actual == kind => Ok(value),
                _ => Err(BuildError::verifier(format!("pop: expected {kind}"))),
            }
        }
    }

    /// Pop `kinds.len()` arguments, returning them in declaration (left to
    /// right) order.
    pub fn pop_arguments(&mut self, kinds: &[Kind]) -> Result<Vec<NodeId>> {
        let mut out = Vec::with_capacity(kinds.len());
        for kind in kinds.iter().rev() {
            out.push(self.pop(*kind)?);
        }
        out.reverse();
        Ok(out)
    }

    // --- locals ---

    pub fn load_local(&self, index: usize, kind: Kind) -> Result<NodeId> {
        let slot = *self
            .locals
            .get(index)
            .ok_or_else(|| BuildError::verifier(format!("local index {index} out of range")))?;
        match slot {
            Slot::Present {
                value,
                kind: actual,
                continuation: false,
            } if actual == kind => Ok(value),
            Slot::Present {
                continuation: true, ..
            } => Err(BuildError::verifier(format!(
                "local {index} read at continuation slot"
            ))),
            Slot::Dead => Err(BuildError::verifier(format!("local {index} is dead"))),
            _ => Err(BuildError::verifier(format!(
                "local {index}: kind mismatch, expected {kind}"
            ))),
        }
    }

    pub fn store_local(&mut self, index: usize, kind: Kind, value: NodeId) -> Result<()> {
        let len = self.locals.len();
        if index >= len {
            return Err(BuildError::verifier(format!("local index {index} out of range")));
        }
        self.locals[index] = Slot::Present {
            value,
            kind,
            continuation: false,
        };
        if kind.is_wide() {
            if index + 1 >= len {
                return Err(BuildError::verifier("wide local store exceeds locals array"));
            }
            self.locals[index + 1] = Slot::Present {
                value,
                kind,
                continuation: true,
            };
        } else if index + 1 < len {
            // If slot i+1 was the continuation of a wide value rooted at i,
            // it is no longer valid on its own; invalidate it.
            if let Slot::Present {
                continuation: true, ..
            } = self.locals[index + 1]
            {
                self.locals[index + 1] = Slot::Dead;
            }
        }
        Ok(())
    }

    // --- locks ---

    pub fn lock(&mut self, object: NodeId) {
        self.locks.push(object);
    }

    pub fn unlock(&mut self) -> Result<NodeId> {
        self.locks
            .pop()
            .ok_or_else(|| BuildError::verifier("monitor-exit with empty lock stack"))
    }

    pub fn lock_depth(&self) -> usize {
        self.locks.len()
    }

    // --- snapshotting ---

    pub fn snapshot(&self, bci: u32) -> FrameState {
        FrameState {
            locals: self.locals.clone(),
            stack: self.stack.clone(),
            locks: self.locks.clone(),
            bci,
        }
    }

    /// Snapshot with the stack replaced by a single pushed value — used to
    /// build the exception-entry block's `state_before` (spec §4.1).
    pub fn duplicate_modified(&self, bci: u32, push_kind: Kind, push_value: NodeId) -> FrameState {
        FrameState {
            locals: self.locals.clone(),
            stack: vec![Slot::Present {
                value: push_value,
                kind: push_kind,
                continuation: false,
            }],
            locks: self.locks.clone(),
            bci,
        }
    }
}
