//! The value model: IR node types plus the arena that owns them (spec §2
//! "Value model", §3 "IR node").

mod arena;
mod node;

pub use arena::GraphArena;
pub use node::{
    BeginData, BranchCond, DeoptReason, DispatchData, InvokeData, InvokeKind, IrNode, NodeId,
    NodeKind,
};
