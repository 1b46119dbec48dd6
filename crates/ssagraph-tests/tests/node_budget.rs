//! Node-budget property (spec §8): a build must bail out cleanly, not
//! panic or return a truncated graph, once the arena would exceed its
//! configured node cap.

mod support;

use ssagraph::collab::{BinOp, ConstValue};
use ssagraph::{compile_method, BuildError, CompileOptions};
use support::*;

#[test]
fn exceeding_max_node_count_raises_a_bailout() {
    let block_map = FakeBlockMap(vec![block(0, 0, 7, false)]);

    // ICONST_1; ICONST_1; IADD, three times over, then RETURN: each
    // triplet allocates two Const nodes and one BinOp node (operands
    // aren't constant-folded against each other across iterations since
    // each reloads its own pair of literals), comfortably past a tiny cap.
    let mut stream = FakeStream::new(
        vec![
            instr(0, Opcode::Const { value: ConstValue::Int(1) }),
            instr(1, Opcode::Const { value: ConstValue::Int(2) }),
            instr(2, Opcode::BinOp { op: BinOp::Add, kind: Kind::Int }),
            instr(3, Opcode::Const { value: ConstValue::Int(3) }),
            instr(4, Opcode::BinOp { op: BinOp::Add, kind: Kind::Int }),
            instr(5, Opcode::Store { index: 0, kind: Kind::Int }),
            instr(6, Opcode::Return { kind: None }),
        ],
        7,
    );
    let resolver = FakeResolver::default();
    let runtime = FakeRuntime::default();
    let method = MethodHandle { is_static: true, max_locals: 1, max_stack: 2, ..void_method(1, 2, 7) };

    let options = CompileOptions { max_node_count: 3, ..CompileOptions::default() };
    let err = compile_method(&options, &method, &block_map, &mut stream, &resolver, &runtime)
        .expect_err("a 3-node cap should be exceeded by this method");

    assert!(matches!(err, BuildError::Bailout(ssagraph::BailoutKind::MethodTooLarge { limit: 3 })));
}
