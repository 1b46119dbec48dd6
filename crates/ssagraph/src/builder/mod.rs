//! # Graph builder
//!
//! Drives one method's bytecode through abstract interpretation into an
//! SSA graph.
//!
//! ## Pipeline overview
//!
//! ```text
//! MethodHandle + BlockMap + BytecodeStream
//!      │
//!      └─[driver]───────────────────────────────────────────────────┐
//!         build()                                                   │
//!           ├── materialize one begin-node per block-map entry      │
//!           ├── seed the start block's frame state                  │
//!           ├── wrap in synchronized-method enter/exit if needed    │
//!           └── drain the worklist:                                 │
//!                 for each block ─►[dispatch]───────────────────┐   │
//!                   decode+translate each instruction           │   │
//!                     ├── constants / locals / arrays / arith   │   │
//!                     ├── fields / invokes / allocation / casts │   │
//!                     └── on terminator: wire successors via    │   │
//!                           [merge]──► merge()/insert_loop_phis │   │
//!                   instructions that may throw consult         │   │
//!                     [exception]──► dispatch-chain construction│   │
//!                 ─► GraphArena                                 │   │
//!      └─ finalize deferred synthetic blocks (unwind, sync-unlock)   │
//! ```
//!
//! ## Architecture
//!
//! | Module        | Responsibility                                          |
//! |---------------|----------------------------------------------------------|
//! | [`core`]      | `GraphBuilder` state, collaborator handles               |
//! | [`dispatch`]  | Opcode → IR node translation                             |
//! | [`exception`] | Lazy exception-dispatch chain construction               |
//! | [`merge`]     | Block-join merge engine and loop-φ insertion             |
//! | [`driver`]    | Top-level worklist draining and method-level wrapping    |

mod core;
mod dispatch;
mod driver;
mod exception;
mod merge;

pub(crate) use driver::build;
