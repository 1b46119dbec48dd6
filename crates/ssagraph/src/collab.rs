//! Contracts for the builder's read-only collaborators: the block-map
//! analyzer, the bytecode stream, the constant-pool resolver, and the
//! runtime descriptor (spec §6). The core only ever calls through these
//! traits; it never parses a class file or owns a constant pool itself.

use std::fmt;

/// Typed value kind carried by every stack slot, local, and node result.
/// Mirrors the bytecode's own type lattice (the verifier's `int`, `long`,
/// `float`, `double`, `object`), plus `Void` for nodes that produce no
/// value (e.g. a store or a void return).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Int,
    Long,
    Float,
    Double,
    Object,
    Void,
}

impl Kind {
    /// Longs and doubles occupy two stack/local words.
    pub fn is_wide(self) -> bool {
        matches!(self, Kind::Long | Kind::Double)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Kind::Int => "int",
            Kind::Long => "long",
            Kind::Float => "float",
            Kind::Double => "double",
            Kind::Object => "object",
            Kind::Void => "void",
        };
        write!(f, "{s}")
    }
}

/// Narrow element kind for array load/store and `newarray`, which includes
/// sub-word element types that widen to `Kind::Int` once on the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayElemKind {
    Int,
    Long,
    Float,
    Double,
    Object,
    Byte,
    Char,
    Short,
    Boolean,
}

impl ArrayElemKind {
    /// The `Kind` a value of this element type has once loaded onto the stack.
    pub fn stack_kind(self) -> Kind {
        match self {
            ArrayElemKind::Long => Kind::Long,
            ArrayElemKind::Float => Kind::Float,
            ArrayElemKind::Double => Kind::Double,
            ArrayElemKind::Object => Kind::Object,
            ArrayElemKind::Int
            | ArrayElemKind::Byte
            | ArrayElemKind::Char
            | ArrayElemKind::Short
            | ArrayElemKind::Boolean => Kind::Int,
        }
    }
}

/// A resolved (or not-yet-resolved) reference to a class/array/interface type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeRef {
    pub cpi: u16,
    pub is_resolved: bool,
    /// Display name, used only for diagnostics.
    pub name: String,
    /// True if the runtime guarantees no subclass can be loaded that
    /// overrides behavior relevant to devirtualization (i.e. the type is
    /// effectively final). Meaningless when `is_resolved` is false.
    pub is_exact: bool,
    /// True if the class has already run its `<clinit>`. Meaningless when
    /// `is_resolved` is false.
    pub is_initialized: bool,
}

/// A resolved (or not) field reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    pub cpi: u16,
    pub is_resolved: bool,
    pub declaring_type: Option<TypeRef>,
    pub kind: Kind,
    pub is_static: bool,
    /// Present when the field is `static final` with a compile-time
    /// constant value (enables the `GETSTATIC`-folds-to-constant case).
    pub constant_value: Option<ConstValue>,
}

/// Devirtualization-relevant metadata about a resolved call target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodRef {
    pub cpi: u16,
    pub is_resolved: bool,
    pub declaring_type: Option<TypeRef>,
    pub param_kinds: Vec<Kind>,
    pub return_kind: Option<Kind>,
    /// True if the target is `final`, `private`, or a constructor — i.e.
    /// can be statically bound without a receiver-type check.
    pub is_statically_bindable: bool,
    /// False for abstract methods (cannot be emitted as a direct call
    /// without first proving a concrete override).
    pub is_concrete: bool,
}

/// A resolved (or not) constant-pool entry used by `LDC`/`LDC2_W`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantRef {
    pub cpi: u16,
    pub is_resolved: bool,
    pub value: Option<ConstValue>,
}

/// A constant value materialized directly into the graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstValue {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Null,
}

impl ConstValue {
    pub fn kind(self) -> Kind {
        match self {
            ConstValue::Int(_) => Kind::Int,
            ConstValue::Long(_) => Kind::Long,
            ConstValue::Float(_) => Kind::Float,
            ConstValue::Double(_) => Kind::Double,
            ConstValue::Null => Kind::Object,
        }
    }
}

/// One entry of a method's declared exception table, in declaration order
/// (spec §3: "Ordering by declaration order is significant").
#[derive(Debug, Clone)]
pub struct ExceptionHandlerRecord {
    pub start_bci: u32,
    pub end_bci: u32,
    pub handler_bci: u32,
    /// `None` means catch-all (`finally`/bare `catch (Throwable)`).
    pub catch_type: Option<TypeRef>,
}

/// Per-method metadata the driver needs that isn't bytecode itself.
#[derive(Debug, Clone)]
pub struct MethodHandle {
    pub name: String,
    pub declaring_type: TypeRef,
    pub is_static: bool,
    pub is_synchronized: bool,
    pub param_kinds: Vec<Kind>,
    pub return_kind: Option<Kind>,
    /// Declared local slot count, including parameters.
    pub max_locals: u32,
    pub max_stack: u32,
    pub code_length: u32,
    pub handlers: Vec<ExceptionHandlerRecord>,
    /// True only for `java.lang.Object.<init>` (or equivalent root
    /// constructor): its declared supertype is absent, so the finalizer
    /// registration call it would otherwise need is never inserted.
    pub is_root_constructor: bool,
    /// True if this method is a constructor (finalizer-registration is
    /// only ever considered on `RETURN` from a constructor).
    pub is_constructor: bool,
    /// `strictfp`-equivalent: floating-point arithmetic in this method
    /// must not use extended-precision intermediates.
    pub is_strict_fp: bool,
}

/// One basic block as partitioned by the (out-of-scope) block-map analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    pub id: u32,
    pub start_bci: u32,
    pub end_bci: u32,
    pub is_loop_header: bool,
}

/// Read-only partitioning of a method's bytecode into basic blocks.
pub trait BlockMap {
    fn blocks(&self) -> &[BlockInfo];
}

/// A decoded bytecode instruction. Branch/switch targets and CPIs are
/// already resolved to absolute BCIs and indices by the stream — the
/// builder never does its own byte-level decoding.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub bci: u32,
    pub opcode: Opcode,
}

/// Decoded opcode semantics. One variant per semantic group from spec
/// §4.2; immediates are bundled with the opcode the way a decoded
/// instruction stream naturally presents them.
#[derive(Debug, Clone)]
pub enum Opcode {
    AconstNull,
    Const { value: ConstValue },
    Ldc { cpi: u16 },

    Load { index: u16, kind: Kind },
    Store { index: u16, kind: Kind },
    Iinc { index: u16, delta: i32 },

    ArrayLoad { elem_kind: ArrayElemKind },
    ArrayStore { elem_kind: ArrayElemKind },
    ArrayLength,

    BinOp { op: BinOp, kind: Kind },
    Negate { kind: Kind },
    Convert { op: ConvertOp },
    LongCompare,
    FloatCompare { nan_is_greater: bool },
    DoubleCompare { nan_is_greater: bool },

    Pop,
    Pop2,
    Dup,
    DupX1,
    DupX2,
    Dup2,
    Dup2X1,
    Dup2X2,
    Swap,

    IfZero { op: BranchOp, target: u32 },
    IfIcmp { op: BranchOp, target: u32 },
    IfAcmp { is_eq: bool, target: u32 },
    IfNull { target: u32 },
    IfNonNull { target: u32 },
    Goto { target: u32 },
    Jsr { target: u32 },
    Ret { index: u16 },
    TableSwitch { low: i32, targets: Vec<u32>, default: u32 },
    LookupSwitch { pairs: Vec<(i32, u32)>, default: u32 },

    GetStatic { cpi: u16 },
    PutStatic { cpi: u16 },
    GetField { cpi: u16 },
    PutField { cpi: u16 },

    InvokeStatic { cpi: u16 },
    InvokeSpecial { cpi: u16 },
    InvokeVirtual { cpi: u16 },
    InvokeInterface { cpi: u16 },

    New { cpi: u16 },
    NewArray { elem_kind: ArrayElemKind },
    ANewArray { cpi: u16 },
    MultiANewArray { cpi: u16, dims: u8 },

    CheckCast { cpi: u16 },
    InstanceOf { cpi: u16 },

    MonitorEnter,
    MonitorExit,

    Return { kind: Option<Kind> },
    AThrow,

    Nop,
    Breakpoint,
}

/// Binary arithmetic/logic/shift operations (produce one stack word of
/// the same kind as their operands).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Ushr,
}

/// Numeric conversions (widening/narrowing, `i2l`, `l2f`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertOp {
    I2L,
    I2F,
    I2D,
    L2I,
    L2F,
    L2D,
    F2I,
    F2L,
    F2D,
    D2I,
    D2L,
    D2F,
    I2B,
    I2C,
    I2S,
}

/// Comparison used to synthesize a two-successor branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchOp {
    Eq,
    Ne,
    Lt,
    Ge,
    Gt,
    Le,
}

impl BranchOp {
    pub fn negate(self) -> BranchOp {
        match self {
            BranchOp::Eq => BranchOp::Ne,
            BranchOp::Ne => BranchOp::Eq,
            BranchOp::Lt => BranchOp::Ge,
            BranchOp::Ge => BranchOp::Lt,
            BranchOp::Gt => BranchOp::Le,
            BranchOp::Le => BranchOp::Gt,
        }
    }
}

/// Random-access view over a method's bytecode.
pub trait BytecodeStream {
    fn current_bci(&self) -> u32;
    fn next_bci(&self) -> u32;
    fn set_bci(&mut self, bci: u32);
    /// Decode the instruction at `current_bci()` and advance the cursor
    /// past it (so that afterwards `current_bci() == next_bci()`, the old
    /// `next_bci()`).
    fn decode(&mut self) -> anyhow::Result<Instruction>;
}

/// Resolution results from the constant pool. `is_resolved == false`
/// triggers the builder's deoptimize-in-place behavior.
pub trait ConstantPoolResolver {
    fn lookup_type(&self, cpi: u16) -> TypeRef;
    fn lookup_field(&self, cpi: u16) -> FieldRef;
    fn lookup_method(&self, cpi: u16) -> MethodRef;
    fn lookup_constant(&self, cpi: u16) -> ConstantRef;
}

/// Runtime facts the builder needs but does not compute itself.
pub trait RuntimeDescriptor {
    fn size_of_basic_lock_record(&self) -> usize;
    fn type_of(&self, constant: ConstValue) -> TypeRef;
    /// Attempt to register a speculative "no loaded subclass overrides
    /// finalize()" assumption for `ty`. Returns `false` if the runtime
    /// won't grant it (e.g. `use_assumptions` is off or a subclass is
    /// already loaded), in which case the caller must emit a real
    /// finalizer-registration call.
    fn register_no_finalizable_subclass_assumption(&self, ty: &TypeRef) -> bool;
    fn is_no_safepoints(&self, method: &MethodHandle) -> bool;
}
