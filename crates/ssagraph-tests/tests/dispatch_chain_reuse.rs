//! Dispatch-chain reuse (spec §8): two throw sites covered by the same
//! handler range and catch type should route through the identical
//! dispatch node rather than building a duplicate chain.

mod support;

use ssagraph::graph::InvokeData;
use ssagraph::{compile_method, CompileOptions, NodeKind};
use support::*;

#[test]
fn two_invokes_under_the_same_handler_share_a_dispatch_node() {
    let block_map = FakeBlockMap(vec![
        block(0, 0, 6, false), // ALOAD_0; INVOKEVIRTUAL m; POP? no: two invokes back to back, then RETURN
        block(1, 6, 7, false), // handler entry
    ]);

    let mut stream = FakeStream::new(
        vec![
            instr(0, Opcode::Load { index: 0, kind: Kind::Object }),
            instr(1, Opcode::InvokeVirtual { cpi: 1 }),
            instr(2, Opcode::Pop),
            instr(3, Opcode::Load { index: 0, kind: Kind::Object }),
            instr(4, Opcode::InvokeVirtual { cpi: 1 }),
            instr(5, Opcode::Return { kind: None }),
            instr(6, Opcode::Return { kind: None }),
        ],
        7,
    );

    let mut resolver = FakeResolver::default();
    resolver.methods.insert(
        1,
        MethodRef {
            cpi: 1,
            is_resolved: true,
            declaring_type: Some(TypeRef {
                cpi: 0,
                is_resolved: true,
                name: "Test".to_string(),
                is_exact: false,
                is_initialized: true,
            }),
            param_kinds: Vec::new(),
            return_kind: Some(Kind::Object),
            is_statically_bindable: false,
            is_concrete: true,
        },
    );
    let runtime = FakeRuntime::default();

    let handler = ExceptionHandlerRecord {
        start_bci: 0,
        end_bci: 6,
        handler_bci: 6,
        catch_type: Some(TypeRef {
            cpi: 2,
            is_resolved: true,
            name: "java.lang.Exception".to_string(),
            is_exact: true,
            is_initialized: true,
        }),
    };
    let method = MethodHandle {
        is_static: false,
        return_kind: None,
        max_locals: 1,
        max_stack: 1,
        handlers: vec![handler],
        ..void_method(1, 1, 7)
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

    let invokes: Vec<_> = arena.nodes().iter().filter(|n| matches!(n.kind, NodeKind::Invoke(_))).collect();
    assert_eq!(invokes.len(), 2, "both call sites should be present");

    let dispatch_of = |n: &ssagraph::IrNode| match &n.kind {
        NodeKind::Invoke(InvokeData { exception_edge, .. }) => exception_edge.expect("covered by a handler"),
        _ => unreachable!(),
    };
    assert_eq!(
        dispatch_of(invokes[0]),
        dispatch_of(invokes[1]),
        "two throw sites sharing the same handler and catch type should reuse the same dispatch node"
    );

    // Only one Dispatch terminator total should have been built for this
    // single handler, regardless of how many sites route into it.
    let dispatch_terminators = arena.nodes().iter().filter(|n| matches!(n.kind, NodeKind::Dispatch(_))).count();
    assert_eq!(dispatch_terminators, 1);
}
