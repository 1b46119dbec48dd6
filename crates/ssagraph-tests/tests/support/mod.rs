//! Shared fakes for the four collaborator traits `ssagraph` depends on.
//! Each test builds its own tiny bytecode program by hand; nothing here
//! parses a class file.

use std::collections::HashMap;

use ssagraph::{BlockMap, BytecodeStream, ConstantPoolResolver, RuntimeDescriptor};
pub use ssagraph::collab::{
    BlockInfo, ConstantRef, ExceptionHandlerRecord, FieldRef, Instruction, Kind, MethodHandle,
    MethodRef, Opcode, TypeRef,
};

pub struct FakeBlockMap(pub Vec<BlockInfo>);

impl BlockMap for FakeBlockMap {
    fn blocks(&self) -> &[BlockInfo] {
        &self.0
    }
}

/// Replays a fixed instruction list in bci order. `decode` panics if asked
/// to step past the last instruction — every test program must end in an
/// explicit terminator opcode.
pub struct FakeStream {
    instrs: Vec<Instruction>,
    pos: usize,
    code_length: u32,
}

impl FakeStream {
    pub fn new(instrs: Vec<Instruction>, code_length: u32) -> Self {
        Self { instrs, pos: 0, code_length }
    }
}

impl BytecodeStream for FakeStream {
    fn current_bci(&self) -> u32 {
        self.instrs.get(self.pos).map(|i| i.bci).unwrap_or(self.code_length)
    }

    fn next_bci(&self) -> u32 {
        self.instrs.get(self.pos + 1).map(|i| i.bci).unwrap_or(self.code_length)
    }

    fn set_bci(&mut self, bci: u32) {
        self.pos = self
            .instrs
            .iter()
            .position(|i| i.bci == bci)
            .unwrap_or(self.instrs.len());
    }

    fn decode(&mut self) -> anyhow::Result<Instruction> {
        let instr = self
            .instrs
            .get(self.pos)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("decode past end of fake stream at pos {}", self.pos))?;
        self.pos += 1;
        Ok(instr)
    }
}

#[derive(Default)]
pub struct FakeResolver {
    pub types: HashMap<u16, TypeRef>,
    pub fields: HashMap<u16, FieldRef>,
    pub methods: HashMap<u16, MethodRef>,
    pub constants: HashMap<u16, ConstantRef>,
}

impl ConstantPoolResolver for FakeResolver {
    fn lookup_type(&self, cpi: u16) -> TypeRef {
        self.types.get(&cpi).cloned().unwrap_or(TypeRef {
            cpi,
            is_resolved: false,
            name: format!("unresolved#{cpi}"),
            is_exact: false,
            is_initialized: false,
        })
    }

    fn lookup_field(&self, cpi: u16) -> FieldRef {
        self.fields.get(&cpi).cloned().unwrap_or(FieldRef {
            cpi,
            is_resolved: false,
            declaring_type: None,
            kind: Kind::Int,
            is_static: false,
            constant_value: None,
        })
    }

    fn lookup_method(&self, cpi: u16) -> MethodRef {
        self.methods.get(&cpi).cloned().unwrap_or(MethodRef {
            cpi,
            is_resolved: false,
            declaring_type: None,
            param_kinds: Vec::new(),
            return_kind: None,
            is_statically_bindable: false,
            is_concrete: false,
        })
    }

    fn lookup_constant(&self, cpi: u16) -> ConstantRef {
        self.constants.get(&cpi).cloned().unwrap_or(ConstantRef {
            cpi,
            is_resolved: false,
            value: None,
        })
    }
}

pub struct FakeRuntime {
    pub lock_record_size: usize,
    pub no_finalizable_subclass: bool,
    pub no_safepoints: bool,
}

impl Default for FakeRuntime {
    fn default() -> Self {
        Self {
            lock_record_size: 8,
            no_finalizable_subclass: true,
            no_safepoints: false,
        }
    }
}

impl RuntimeDescriptor for FakeRuntime {
    fn size_of_basic_lock_record(&self) -> usize {
        self.lock_record_size
    }

    fn type_of(&self, _constant: ssagraph::collab::ConstValue) -> TypeRef {
        TypeRef {
            cpi: 0,
            is_resolved: true,
            name: "java.lang.Object".to_string(),
            is_exact: false,
            is_initialized: true,
        }
    }

    fn register_no_finalizable_subclass_assumption(&self, _ty: &TypeRef) -> bool {
        self.no_finalizable_subclass
    }

    fn is_no_safepoints(&self, _method: &MethodHandle) -> bool {
        self.no_safepoints
    }
}

pub fn instr(bci: u32, opcode: Opcode) -> Instruction {
    Instruction { bci, opcode }
}

pub fn block(id: u32, start_bci: u32, end_bci: u32, is_loop_header: bool) -> BlockInfo {
    BlockInfo { id, start_bci, end_bci, is_loop_header }
}

/// A plain instance method taking no parameters and returning `void`,
/// with no declared handlers, not synchronized.
pub fn void_method(max_locals: u32, max_stack: u32, code_length: u32) -> MethodHandle {
    MethodHandle {
        name: "m".to_string(),
        declaring_type: TypeRef {
            cpi: 0,
            is_resolved: true,
            name: "Test".to_string(),
            is_exact: false,
            is_initialized: true,
        },
        is_static: false,
        is_synchronized: false,
        param_kinds: Vec::new(),
        return_kind: None,
        max_locals,
        max_stack,
        code_length,
        handlers: Vec::new(),
        is_root_constructor: false,
        is_constructor: false,
        is_strict_fp: false,
    }
}
