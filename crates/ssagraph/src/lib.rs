//! ssagraph — bytecode-to-SSA graph builder for a stack-machine JIT front end.
//!
//! This crate provides the abstract-interpretation engine and
//! graph-construction algorithm that turn one method's bytecode into a
//! typed SSA control-flow graph: [`compile_method`] is the entry point.

pub mod block_index;
mod builder;
pub mod collab;
pub mod error;
pub mod frame_state;
pub mod graph;
pub mod worklist;

pub use collab::{BlockMap, BytecodeStream, ConstantPoolResolver, MethodHandle, RuntimeDescriptor};
pub use error::{BailoutKind, BuildError, Result};
pub use graph::{GraphArena, IrNode, NodeId, NodeKind};

use builder::build;

/// Configuration for one [`compile_method`] call. Frozen and passed by
/// reference — there are no process-global settings anywhere in this crate.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// 0 = silent, 1 = block-level trace, 2 = instruction-level trace
    /// (spec §10.1). Traced via `eprintln!`, gated at the call site so a
    /// disabled trace costs only the level check.
    pub trace_parser_level: u8,
    /// Skip the verifier-equivalent shape/kind checks the merge engine
    /// and frame-state builder would otherwise perform. Only safe when
    /// the bytecode is already known-verified (e.g. by a prior class-file
    /// verification pass upstream of this crate).
    pub assume_verified_bytecode: bool,
    /// Resolve the callee's declaring class before emitting a static
    /// invoke, forcing class initialization to be accounted for at that
    /// point rather than deferred to the call itself.
    pub resolve_class_before_static_invoke: bool,
    /// Hard cap on the number of nodes the arena will allocate before the
    /// build bails out with `BailoutKind::MethodTooLarge`.
    pub max_node_count: usize,
    /// Allow speculative runtime assumptions (e.g. no-finalizable-subclass)
    /// to elide otherwise-required guard code. Disabling this is a
    /// conservative fallback when the runtime cannot cheaply invalidate
    /// such assumptions.
    pub use_assumptions: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            trace_parser_level: 0,
            assume_verified_bytecode: false,
            resolve_class_before_static_invoke: true,
            max_node_count: 1_000_000,
            use_assumptions: true,
        }
    }
}

/// Build the SSA graph for one method.
///
/// `block_map` must already partition the method's bytecode into basic
/// blocks (including loop-header identification); `stream` is driven from
/// bci 0 internally. `pool` and `runtime` answer constant-pool and
/// runtime-fact queries on demand — this crate does no class-file parsing
/// or runtime introspection of its own.
pub fn compile_method(
    options: &CompileOptions,
    method: &MethodHandle,
    block_map: &dyn BlockMap,
    stream: &mut dyn BytecodeStream,
    pool: &dyn ConstantPoolResolver,
    runtime: &dyn RuntimeDescriptor,
) -> Result<GraphArena> {
    build(options, method, block_map, stream, pool, runtime)
}
