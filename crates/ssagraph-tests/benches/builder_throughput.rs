//! Throughput benchmark for the graph builder: a synthetic method whose
//! loop body is repeated many times, run through `compile_method` end to
//! end. Standalone rather than reusing `tests/support` — benches don't
//! share Cargo's test-harness module tree with `tests/`.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use ssagraph::collab::{
    BinOp, BlockInfo, BranchOp, ConstValue, Instruction, Kind, MethodHandle, Opcode, TypeRef,
};
use ssagraph::{compile_method, BlockMap, BytecodeStream, CompileOptions, ConstantPoolResolver, RuntimeDescriptor};

struct FixedBlockMap(Vec<BlockInfo>);
impl BlockMap for FixedBlockMap {
    fn blocks(&self) -> &[BlockInfo] {
        &self.0
    }
}

struct ReplayStream {
    instrs: Vec<Instruction>,
    pos: usize,
    code_length: u32,
}
impl BytecodeStream for ReplayStream {
    fn current_bci(&self) -> u32 {
        self.instrs.get(self.pos).map(|i| i.bci).unwrap_or(self.code_length)
    }
    fn next_bci(&self) -> u32 {
        self.instrs.get(self.pos + 1).map(|i| i.bci).unwrap_or(self.code_length)
    }
    fn set_bci(&mut self, bci: u32) {
        self.pos = self.instrs.iter().position(|i| i.bci == bci).unwrap_or(self.instrs.len());
    }
    fn decode(&mut self) -> anyhow::Result<Instruction> {
        let instr = self
            .instrs
            .get(self.pos)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("decode past end at pos {}", self.pos))?;
        self.pos += 1;
        Ok(instr)
    }
}

struct EmptyResolver;
impl ConstantPoolResolver for EmptyResolver {
    fn lookup_type(&self, cpi: u16) -> TypeRef {
        TypeRef { cpi, is_resolved: false, name: String::new(), is_exact: false, is_initialized: false }
    }
    fn lookup_field(&self, cpi: u16) -> ssagraph::collab::FieldRef {
        ssagraph::collab::FieldRef { cpi, is_resolved: false, declaring_type: None, kind: Kind::Int, is_static: false, constant_value: None }
    }
    fn lookup_method(&self, cpi: u16) -> ssagraph::collab::MethodRef {
        ssagraph::collab::MethodRef { cpi, is_resolved: false, declaring_type: None, param_kinds: Vec::new(), return_kind: None, is_statically_bindable: false, is_concrete: false }
    }
    fn lookup_constant(&self, cpi: u16) -> ssagraph::collab::ConstantRef {
        ssagraph::collab::ConstantRef { cpi, is_resolved: false, value: None }
    }
}

struct DefaultRuntime;
impl RuntimeDescriptor for DefaultRuntime {
    fn size_of_basic_lock_record(&self) -> usize {
        8
    }
    fn type_of(&self, _constant: ConstValue) -> TypeRef {
        TypeRef { cpi: 0, is_resolved: true, name: "java.lang.Object".to_string(), is_exact: false, is_initialized: true }
    }
    fn register_no_finalizable_subclass_assumption(&self, _ty: &TypeRef) -> bool {
        true
    }
    fn is_no_safepoints(&self, _method: &MethodHandle) -> bool {
        false
    }
}

/// A straight-line chain of `iterations` independent `i = i + 1; j = j + i`
/// statements (no back edges at all, unlike `loop_accumulator`'s test):
/// this exercises the worklist/merge machinery's per-block overhead
/// without loop-phi construction dominating the measurement.
fn straight_line_method(iterations: u32) -> (MethodHandle, FixedBlockMap, Vec<Instruction>, u32) {
    let mut instrs = Vec::new();
    let mut bci = 0u32;
    instrs.push(Instruction { bci, opcode: Opcode::Const { value: ConstValue::Int(0) } });
    bci += 1;
    instrs.push(Instruction { bci, opcode: Opcode::Store { index: 0, kind: Kind::Int } });
    bci += 1;

    for _ in 0..iterations {
        instrs.push(Instruction { bci, opcode: Opcode::Load { index: 0, kind: Kind::Int } });
        bci += 1;
        instrs.push(Instruction { bci, opcode: Opcode::Const { value: ConstValue::Int(1) } });
        bci += 1;
        instrs.push(Instruction { bci, opcode: Opcode::BinOp { op: BinOp::Add, kind: Kind::Int } });
        bci += 1;
        instrs.push(Instruction { bci, opcode: Opcode::Store { index: 0, kind: Kind::Int } });
        bci += 1;
    }
    instrs.push(Instruction { bci, opcode: Opcode::Load { index: 0, kind: Kind::Int } });
    bci += 1;
    instrs.push(Instruction { bci, opcode: Opcode::Return { kind: Some(Kind::Int) } });
    bci += 1;

    let code_length = bci;
    let blocks = FixedBlockMap(vec![BlockInfo { id: 0, start_bci: 0, end_bci: code_length, is_loop_header: false }]);

    let method = MethodHandle {
        name: "bench".to_string(),
        declaring_type: TypeRef { cpi: 0, is_resolved: true, name: "Bench".to_string(), is_exact: true, is_initialized: true },
        is_static: true,
        is_synchronized: false,
        param_kinds: Vec::new(),
        return_kind: Some(Kind::Int),
        max_locals: 1,
        max_stack: 2,
        code_length,
        handlers: Vec::new(),
        is_root_constructor: false,
        is_constructor: false,
        is_strict_fp: false,
    };
    (method, blocks, instrs, code_length)
}

fn compile_straight_line(c: &mut Criterion) {
    let (method, blocks, instrs, code_length) = straight_line_method(200);
    c.bench_function("compile 200-statement straight-line method", |b| {
        b.iter(|| {
            let mut stream = ReplayStream { instrs: instrs.clone(), pos: 0, code_length };
            let arena = compile_method(&CompileOptions::default(), &method, &blocks, &mut stream, &EmptyResolver, &DefaultRuntime)
                .expect("compile should succeed");
            black_box(arena.len())
        })
    });
}

/// A single loop header reached by a prologue and a back edge, whose
/// body is an accumulator like `loop_accumulator`'s test but iterated
/// far more times at runtime than at *build* time — the builder itself
/// only ever parses the one loop block once, so this instead measures
/// the branch-and-merge path (`IfIcmp` + loop-phi widening) in isolation.
fn compile_loop(c: &mut Criterion) {
    let block_map = FixedBlockMap(vec![
        BlockInfo { id: 0, start_bci: 0, end_bci: 2, is_loop_header: false },
        BlockInfo { id: 1, start_bci: 2, end_bci: 9, is_loop_header: true },
        BlockInfo { id: 2, start_bci: 9, end_bci: 11, is_loop_header: false },
    ]);
    let instrs = vec![
        Instruction { bci: 0, opcode: Opcode::Const { value: ConstValue::Int(0) } },
        Instruction { bci: 1, opcode: Opcode::Store { index: 0, kind: Kind::Int } },
        Instruction { bci: 2, opcode: Opcode::Load { index: 0, kind: Kind::Int } },
        Instruction { bci: 3, opcode: Opcode::Const { value: ConstValue::Int(1) } },
        Instruction { bci: 4, opcode: Opcode::BinOp { op: BinOp::Add, kind: Kind::Int } },
        Instruction { bci: 5, opcode: Opcode::Store { index: 0, kind: Kind::Int } },
        Instruction { bci: 6, opcode: Opcode::Load { index: 0, kind: Kind::Int } },
        Instruction { bci: 7, opcode: Opcode::Const { value: ConstValue::Int(10_000) } },
        Instruction { bci: 8, opcode: Opcode::IfIcmp { op: BranchOp::Lt, target: 2 } },
        Instruction { bci: 9, opcode: Opcode::Load { index: 0, kind: Kind::Int } },
        Instruction { bci: 10, opcode: Opcode::Return { kind: Some(Kind::Int) } },
    ];
    let method = MethodHandle {
        name: "bench_loop".to_string(),
        declaring_type: TypeRef { cpi: 0, is_resolved: true, name: "Bench".to_string(), is_exact: true, is_initialized: true },
        is_static: true,
        is_synchronized: false,
        param_kinds: Vec::new(),
        return_kind: Some(Kind::Int),
        max_locals: 1,
        max_stack: 2,
        code_length: 11,
        handlers: Vec::new(),
        is_root_constructor: false,
        is_constructor: false,
        is_strict_fp: false,
    };

    c.bench_function("compile single-loop accumulator method", |b| {
        b.iter(|| {
            let mut stream = ReplayStream { instrs: instrs.clone(), pos: 0, code_length: 11 };
            let arena = compile_method(&CompileOptions::default(), &method, &block_map, &mut stream, &EmptyResolver, &DefaultRuntime)
                .expect("compile should succeed");
            black_box(arena.len())
        })
    });
}

criterion_group!(benches, compile_straight_line, compile_loop);
criterion_main!(benches);
