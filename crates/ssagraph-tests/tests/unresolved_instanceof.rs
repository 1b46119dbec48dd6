//! `ALOAD_0; INSTANCEOF <unresolved>; IRETURN`. An unresolved instanceof
//! target deoptimizes rather than emitting a type-test node, and the
//! value forwarded past it is the zero outcome (`false`), not the
//! deoptimize node itself.

mod support;

use ssagraph::{compile_method, CompileOptions, NodeKind};
use support::*;

#[test]
fn unresolved_instanceof_deoptimizes_and_forwards_zero() {
    let block_map = FakeBlockMap(vec![block(0, 0, 3, false)]);

    let mut stream = FakeStream::new(
        vec![
            instr(0, Opcode::Load { index: 0, kind: Kind::Object }),
            instr(1, Opcode::InstanceOf { cpi: 9 }), // cpi 9 is never registered with the resolver, so it stays unresolved
            instr(2, Opcode::Return { kind: Some(Kind::Int) }),
        ],
        3,
    );
    let resolver = FakeResolver::default();
    let runtime = FakeRuntime::default();
    let method = MethodHandle {
        is_static: false,
        return_kind: Some(Kind::Int),
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
        "the unresolved instanceof check should deoptimize"
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
        matches!(
            arena.get(returned).kind,
            NodeKind::Const(ssagraph::collab::ConstValue::Int(0))
        ),
        "the value forwarded to return should be the zero outcome, not the deoptimize node itself"
    );
}
