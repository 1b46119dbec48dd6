//! Scenario 6: `ALOAD_0; CHECKCAST <unresolved>; ARETURN`. An unresolved
//! cast target deoptimizes rather than emitting a type-test node, and
//! the value forwarded past it is a null constant rather than the
//! (never actually cast) receiver.

mod support;

use ssagraph::{compile_method, CompileOptions, NodeKind};
use support::*;

#[test]
fn unresolved_cast_deoptimizes_and_forwards_null() {
    let block_map = FakeBlockMap(vec![block(0, 0, 3, false)]);

    let mut stream = FakeStream::new(
        vec![
            instr(0, Opcode::Load { index: 0, kind: Kind::Object }),
            instr(1, Opcode::CheckCast { cpi: 9 }), // cpi 9 is never registered with the resolver, so it stays unresolved
            instr(2, Opcode::Return { kind: Some(Kind::Object) }),
        ],
        3,
    );
    let resolver = FakeResolver::default();
    let runtime = FakeRuntime::default();
    let method = MethodHandle {
        is_static: false,
        return_kind: Some(Kind::Object),
        max_locals: 1,
        max_stack: 1,
        ..void_method(1, 1, 3)
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

    assert_eq!(
        arena.nodes().iter().filter(|n| matches!(n.kind, NodeKind::Deoptimize { .. })).count(),
        1,
        "the unresolved cast should deoptimize"
    );
    assert_eq!(
        arena.nodes().iter().filter(|n| matches!(n.kind, NodeKind::CheckCast { .. } | NodeKind::InstanceOf { .. })).count(),
        0,
        "no type-test node should be emitted for an unresolved target"
    );

    let returned = arena
        .nodes()
        .iter()
        .find_map(|n| match &n.kind {
            NodeKind::Return { value: Some(v) } => Some(*v),
            _ => None,
        })
        .expect("a return node should exist");
    assert!(
        matches!(arena.get(returned).kind, NodeKind::Const(ssagraph::collab::ConstValue::Null)),
        "the value forwarded to return should be a null constant, not the deoptimize node itself"
    );
}
