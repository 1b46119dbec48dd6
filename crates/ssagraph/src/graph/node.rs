//! IR node definitions (spec §3 "IR node", "Basic-block begin-node", "φ-node").
//!
//! Nodes are a tagged-variant sum type rather than a class hierarchy: a
//! shared header (`id`, `value_kind`, `frame_state`) plus a `NodeKind` enum
//! whose variants carry their own typed operand fields. Edges between
//! nodes are plain `NodeId` handles into the owning [`super::arena::GraphArena`]
//! — cycles (a loop-phi referring to a node that refers back to the phi)
//! are unremarkable since the arena owns every node uniformly.

use crate::collab::{ArrayElemKind, BinOp, BranchOp, ConstValue, ConvertOp, FieldRef, Kind, TypeRef};
use crate::frame_state::FrameStateId;

/// Arena-stable handle to a node. Also used as a basic block's identity:
/// a block *is* its begin-node's `NodeId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Why a [`NodeKind::Deoptimize`] was inserted in place of a real operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeoptReason {
    UnresolvedType,
    UnresolvedField,
    UnresolvedMethod,
    Uninitialized,
}

/// Condition tested by a two-successor branch, synthesized from the
/// operands an `IF*` family opcode pops (spec §4.2 "Branches").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchCond {
    Int { op: BranchOp, lhs: NodeId, rhs: NodeId },
    Ref { is_eq: bool, lhs: NodeId, rhs: NodeId },
}

impl BranchCond {
    pub fn inputs(&self) -> [NodeId; 2] {
        match *self {
            BranchCond::Int { lhs, rhs, .. } => [lhs, rhs],
            BranchCond::Ref { lhs, rhs, .. } => [lhs, rhs],
        }
    }
}

/// A basic block's begin-node payload (spec §3 "Basic-block begin-node").
#[derive(Debug, Clone)]
pub struct BeginData {
    pub starting_bci: u32,
    pub is_loop_header: bool,
    /// Set on first arrival at this block; `None` until then.
    pub state_before: Option<FrameStateId>,
    /// The terminator node that closes out this block. `None` while the
    /// block is still being parsed.
    pub end: Option<NodeId>,
    /// Control-flow predecessors, in arrival order.
    pub predecessors: Vec<NodeId>,
    /// True for synthetic blocks (exception entries, dispatch nodes, the
    /// shared unwind block) that never have a bytecode range to parse.
    pub synthetic: bool,
}

/// How a call was (or wasn't) devirtualized (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeKind {
    Static,
    Special,
    /// Resolved to a single concrete method, bypassing dispatch.
    Direct,
    Virtual,
    Interface,
}

#[derive(Debug, Clone)]
pub struct InvokeData {
    pub kind: InvokeKind,
    pub callee: crate::collab::MethodRef,
    pub receiver: Option<NodeId>,
    pub args: Vec<NodeId>,
    /// The exception-entry begin-node attached to this call, if any
    /// handler in the current method covers it.
    pub exception_edge: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub struct DispatchData {
    /// `None` means catch-all.
    pub catch_type: Option<TypeRef>,
    pub on_match: NodeId,
    pub on_mismatch: NodeId,
}

/// One IR node's semantic payload. Shared header fields (id, value kind,
/// frame state) live on [`IrNode`]; variant-specific operands live here.
#[derive(Debug, Clone)]
pub enum NodeKind {
    // --- structural -------------------------------------------------
    Begin(BeginData),
    Phi {
        block: NodeId,
        inputs: Vec<NodeId>,
        is_loop_phi: bool,
    },

    // --- values -------------------------------------------------------
    /// An incoming argument (receiver is index 0 for instance methods).
    Parameter { index: u32 },
    Const(ConstValue),
    /// The `Class` mirror object for `ty`, used as the monitor for a
    /// synchronized static method (there is no receiver to lock on).
    ClassConstant { ty: TypeRef },
    BinOp {
        op: BinOp,
        lhs: NodeId,
        rhs: NodeId,
        is_strict_fp: bool,
    },
    Negate {
        input: NodeId,
        is_strict_fp: bool,
    },
    Convert {
        op: ConvertOp,
        input: NodeId,
    },
    LongCompare {
        lhs: NodeId,
        rhs: NodeId,
    },
    FloatCompare {
        lhs: NodeId,
        rhs: NodeId,
        nan_is_greater: bool,
        is_double: bool,
    },
    LoadField {
        object: Option<NodeId>,
        field: FieldRef,
    },
    LoadIndexed {
        array: NodeId,
        index: NodeId,
        elem_kind: ArrayElemKind,
    },
    ArrayLength {
        array: NodeId,
    },
    NewInstance {
        ty: TypeRef,
    },
    NewTypeArray {
        elem_kind: ArrayElemKind,
        length: NodeId,
    },
    NewObjectArray {
        ty: TypeRef,
        length: NodeId,
    },
    NewMultiArray {
        ty: TypeRef,
        dims: Vec<NodeId>,
    },
    CheckCast {
        ty: TypeRef,
        object: NodeId,
    },
    InstanceOf {
        ty: TypeRef,
        object: NodeId,
    },
    Invoke(InvokeData),
    /// Side-effecting class-initialization trigger emitted before an
    /// `INVOKESTATIC` of a resolved-but-uninitialized declaring class,
    /// when `resolve_class_before_static_invoke` is set (spec §4.5).
    ResolveClass {
        ty: TypeRef,
    },
    ExceptionObject,
    Deoptimize {
        reason: DeoptReason,
        resume_bci: u32,
    },

    // --- side-effecting, no result --------------------------------------
    StoreField {
        object: Option<NodeId>,
        field: FieldRef,
        value: NodeId,
    },
    StoreIndexed {
        array: NodeId,
        index: NodeId,
        value: NodeId,
        elem_kind: ArrayElemKind,
    },
    MonitorEnter {
        object: NodeId,
    },
    MonitorExit {
        object: NodeId,
    },
    FinalizerRegister {
        object: NodeId,
    },

    // --- terminators (end-of-block, spec §1 "end-of-block variants") ---
    Return {
        value: Option<NodeId>,
    },
    Goto {
        target: NodeId,
    },
    If {
        cond: BranchCond,
        if_true: NodeId,
        if_false: NodeId,
    },
    Switch {
        index: NodeId,
        targets: Vec<NodeId>,
        default: NodeId,
        /// Snapshot taken when this switch is a safepoint (spec §4.2:
        /// a backward edge is present and the method is not
        /// "no-safepoints"); `None` otherwise.
        safepoint_state: Option<FrameStateId>,
    },
    Throw {
        exception: NodeId,
        exception_edge: Option<NodeId>,
    },
    Unwind {
        exception: NodeId,
    },
    Dispatch(DispatchData),
    Unreachable,
}

impl NodeKind {
    /// Is this a control-flow terminator (owns a block's "end" slot)?
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            NodeKind::Return { .. }
                | NodeKind::Goto { .. }
                | NodeKind::If { .. }
                | NodeKind::Switch { .. }
                | NodeKind::Throw { .. }
                | NodeKind::Unwind { .. }
                | NodeKind::Dispatch(_)
                | NodeKind::Unreachable
        )
    }

    /// True for instructions that may need an exception-dispatch edge
    /// (spec §4.2: "ATHROW / MONITOREXIT / invoke ... are the only
    /// instructions that may trigger exception-dispatch construction").
    pub fn may_throw(&self) -> bool {
        matches!(
            self,
            NodeKind::Throw { .. } | NodeKind::MonitorExit { .. } | NodeKind::Invoke(_)
        )
    }
}

/// A fully-formed node: shared header plus its [`NodeKind`] payload.
#[derive(Debug, Clone)]
pub struct IrNode {
    pub id: NodeId,
    pub kind: NodeKind,
    pub value_kind: Kind,
    /// Attached only for nodes that can observe control flow (calls,
    /// allocations, throws, and anything with a `state_before`/`_after`).
    pub frame_state: Option<FrameStateId>,
}
