//! Scenario 4: a synchronized instance method whose body is just
//! `RETURN`. Exercises eager construction of the implicit catch-all
//! unlock handler: it must be reachable, and produce its own
//! monitor-exit + unwind, even though nothing in the body ever throws.

mod support;

use ssagraph::{compile_method, CompileOptions, NodeKind};
use support::*;

#[test]
fn synchronized_method_gets_reachable_unlock_handler() {
    let block_map = FakeBlockMap(vec![block(0, 0, 1, false)]);

    let mut stream = FakeStream::new(vec![instr(0, Opcode::Return { kind: None })], 1);
    let resolver = FakeResolver::default();
    let runtime = FakeRuntime::default();
    let method = MethodHandle {
        is_static: false,
        is_synchronized: true,
        return_kind: None,
        max_locals: 1,
        max_stack: 1,
        ..void_method(1, 1, 1)
    };

    let arena = compile_method(
        &CompileOptions::default(),
        &method,
        &block_map,
        &mut stream,
        &resolver,
        &runtime,
    )
    .expect("compile should succeed");

    let monitor_enters = arena.nodes().iter().filter(|n| matches!(n.kind, NodeKind::MonitorEnter { .. })).count();
    assert_eq!(monitor_enters, 1, "method entry should emit exactly one monitor-enter");

    let monitor_exits = arena.nodes().iter().filter(|n| matches!(n.kind, NodeKind::MonitorExit { .. })).count();
    assert_eq!(
        monitor_exits, 2,
        "one monitor-exit on the normal return path, one in the implicit unlock handler"
    );

    let unwinds = arena.nodes().iter().filter(|n| matches!(n.kind, NodeKind::Unwind { .. })).count();
    assert_eq!(unwinds, 1, "the implicit unlock handler unwinds after releasing the monitor");

    // The implicit handler must actually have been reached: its
    // terminator is Unwind, not Unreachable, which only happens if a
    // state was merged into it before finalize_sync_unlock ran.
    let unreachables = arena.nodes().iter().filter(|n| matches!(n.kind, NodeKind::Unreachable)).count();
    assert_eq!(unreachables, 0, "the unlock handler is reachable even with no explicit throw in the body");
}
