//! Opcode dispatcher: translates one decoded [`Instruction`] at a time
//! into IR nodes and mutates the working [`crate::frame_state::FrameStateBuilder`]
//! exactly as the abstract interpreter would (spec §4.2, §4.3).
//!
//! Grouped the way the spec groups them rather than by JVM opcode number:
//! constants, locals, arrays, arithmetic/compare/convert, stack shuffles,
//! branches, fields, invokes, allocation, type checks, synchronization,
//! return, throw. Each group pops its operands, builds zero or more
//! nodes, and pushes at most one result — mirroring a real stack machine.

use super::core::GraphBuilder;
use crate::collab::{BinOp as CollabBinOp, ConstValue, Instruction, Kind, Opcode};
use crate::error::{BuildError, Result};
use crate::graph::{BranchCond, DeoptReason, InvokeData, InvokeKind, NodeId, NodeKind};

impl<'a> GraphBuilder<'a> {
    /// Drive one basic block to completion: decode instructions starting
    /// at `begin`'s bci until a terminator is produced, or the block's
    /// bytecode range runs out (an implicit fallthrough `Goto`).
    pub(crate) fn parse_block(&mut self, begin: NodeId, end_bci: u32) -> Result<()> {
        let state = self
            .begin_state_before(begin)
            .ok_or_else(|| BuildError::internal("parsing a block with no seeded frame state"))?;
        let snapshot = self.arena.frame_state(state).clone();
        self.frame.restore(&snapshot);
        self.current_block = Some(begin);

        loop {
            let bci = self.stream.current_bci();
            if bci >= end_bci {
                // Fallthrough into the next block map entry.
                let next = self.successor_begin(end_bci)?;
                self.wire_fallthrough(begin, next)?;
                return Ok(());
            }
            let instr = self.stream.decode().map_err(BuildError::from)?;
            self.trace(2, || format!("bci={} opcode={:?}", instr.bci, instr.opcode));
            if self.translate_instruction(begin, instr)? {
                return Ok(());
            }
        }
    }

    fn successor_begin(&self, bci: u32) -> Result<NodeId> {
        self.block_index
            .begin_at_bci(bci)
            .ok_or_else(|| BuildError::internal(format!("no block begins at bci {bci}")))
    }

    fn wire_fallthrough(&mut self, from: NodeId, target: NodeId) -> Result<()> {
        let terminator = self.arena.push(NodeKind::Goto { target }, Kind::Void)?;
        self.set_begin_end(from, terminator);
        let is_loop = self.arena_is_loop_header(target);
        let snapshot = self.frame.snapshot(self.stream.current_bci());
        self.merge(target, from, &snapshot, is_loop)
    }

    fn arena_is_loop_header(&self, begin: NodeId) -> bool {
        matches!(&self.arena.get(begin).kind, NodeKind::Begin(b) if b.is_loop_header)
    }

    /// Translate one instruction. Returns `true` if it was a terminator
    /// (the block is now finished).
    fn translate_instruction(&mut self, begin: NodeId, instr: Instruction) -> Result<bool> {
        let bci = instr.bci;
        match instr.opcode {
            Opcode::Nop => {}
            Opcode::Breakpoint => {
                return Err(BuildError::Bailout(crate::error::BailoutKind::UnsupportedOpcode(
                    "breakpoint".to_string(),
                )))
            }

            Opcode::AconstNull => self.push_const(ConstValue::Null)?,
            Opcode::Const { value } => self.push_const(value)?,
            Opcode::Ldc { cpi } => {
                let constant = self.pool.lookup_constant(cpi);
                match constant.value {
                    Some(value) if constant.is_resolved => self.push_const(value)?,
                    _ => {
                        let kind = Kind::Object;
                        let node = self.arena.push(
                            NodeKind::Deoptimize {
                                reason: DeoptReason::UnresolvedType,
                                resume_bci: bci,
                            },
                            kind,
                        )?;
                        self.frame.push(kind, node)?;
                    }
                }
            }

            Opcode::Load { index, kind } => {
                let value = self.frame.load_local(index as usize, kind)?;
                self.frame.push(kind, value)?;
            }
            Opcode::Store { index, kind } => {
                let value = self.frame.pop(kind)?;
                self.frame.store_local(index as usize, kind, value)?;
            }
            Opcode::Iinc { index, delta } => {
                let current = self.frame.load_local(index as usize, Kind::Int)?;
                let delta_node = self.arena.push(NodeKind::Const(ConstValue::Int(delta)), Kind::Int)?;
                let result = self.fold_or_binop(CollabBinOp::Add, Kind::Int, current, delta_node)?;
                self.frame.store_local(index as usize, Kind::Int, result)?;
            }

            Opcode::ArrayLoad { elem_kind } => {
                let index = self.frame.pop(Kind::Int)?;
                let array = self.frame.pop(Kind::Object)?;
                let stack_kind = elem_kind.stack_kind();
                let node = self.arena.push(NodeKind::LoadIndexed { array, index, elem_kind }, stack_kind)?;
                self.frame.push(stack_kind, node)?;
            }
            Opcode::ArrayStore { elem_kind } => {
                let value = self.frame.pop(elem_kind.stack_kind())?;
                let index = self.frame.pop(Kind::Int)?;
                let array = self.frame.pop(Kind::Object)?;
                self.arena.push(
                    NodeKind::StoreIndexed { array, index, value, elem_kind },
                    Kind::Void,
                )?;
            }
            Opcode::ArrayLength => {
                let array = self.frame.pop(Kind::Object)?;
                let node = self.arena.push(NodeKind::ArrayLength { array }, Kind::Int)?;
                self.frame.push(Kind::Int, node)?;
            }

            Opcode::BinOp { op, kind } => {
                let rhs = self.frame.pop(kind)?;
                let lhs = self.frame.pop(kind)?;
                let result = self.fold_or_binop(op, kind, lhs, rhs)?;
                self.frame.push(kind, result)?;
            }
            Opcode::Negate { kind } => {
                let input = self.frame.pop(kind)?;
                let node = if let Some(folded) = self.fold_negate(input, kind)? {
                    folded
                } else {
                    self.arena
                        .push(NodeKind::Negate { input, is_strict_fp: self.method.is_strict_fp }, kind)?
                };
                self.frame.push(kind, node)?;
            }
            Opcode::Convert { op } => {
                let (from_kind, to_kind) = convert_kinds(op);
                let input = self.frame.pop(from_kind)?;
                let node = self.arena.push(NodeKind::Convert { op, input }, to_kind)?;
                self.frame.push(to_kind, node)?;
            }
            Opcode::LongCompare => {
                let rhs = self.frame.pop(Kind::Long)?;
                let lhs = self.frame.pop(Kind::Long)?;
                let node = self.arena.push(NodeKind::LongCompare { lhs, rhs }, Kind::Int)?;
                self.frame.push(Kind::Int, node)?;
            }
            Opcode::FloatCompare { nan_is_greater } => {
                let rhs = self.frame.pop(Kind::Float)?;
                let lhs = self.frame.pop(Kind::Float)?;
                let node = self.arena.push(
                    NodeKind::FloatCompare { lhs, rhs, nan_is_greater, is_double: false },
                    Kind::Int,
                )?;
                self.frame.push(Kind::Int, node)?;
            }
            Opcode::DoubleCompare { nan_is_greater } => {
                let rhs = self.frame.pop(Kind::Double)?;
                let lhs = self.frame.pop(Kind::Double)?;
                let node = self.arena.push(
                    NodeKind::FloatCompare { lhs, rhs, nan_is_greater, is_double: true },
                    Kind::Int,
                )?;
                self.frame.push(Kind::Int, node)?;
            }

            Opcode::Pop => {
                self.frame.xpop()?;
            }
            Opcode::Pop2 => {
                self.frame.xpop()?;
                self.frame.xpop()?;
            }
            Opcode::Dup => {
                let top = self.frame.xpeek(0)?;
                self.frame.xpush(top)?;
            }
            Opcode::DupX1 => {
                let a = self.frame.xpop()?;
                let b = self.frame.xpop()?;
                self.frame.xpush(a)?;
                self.frame.xpush(b)?;
                self.frame.xpush(a)?;
            }
            Opcode::DupX2 => {
                let a = self.frame.xpop()?;
                let b = self.frame.xpop()?;
                let c = self.frame.xpop()?;
                self.frame.xpush(a)?;
                self.frame.xpush(c)?;
                self.frame.xpush(b)?;
                self.frame.xpush(a)?;
            }
            Opcode::Dup2 => {
                let a = self.frame.xpeek(1)?;
                let b = self.frame.xpeek(0)?;
                self.frame.xpush(a)?;
                self.frame.xpush(b)?;
            }
            Opcode::Dup2X1 => {
                let a = self.frame.xpop()?;
                let b = self.frame.xpop()?;
                let c = self.frame.xpop()?;
                self.frame.xpush(b)?;
                self.frame.xpush(a)?;
                self.frame.xpush(c)?;
                self.frame.xpush(b)?;
                self.frame.xpush(a)?;
            }
            Opcode::Dup2X2 => {
                let a = self.frame.xpop()?;
                let b = self.frame.xpop()?;
                let c = self.frame.xpop()?;
                let d = self.frame.xpop()?;
                self.frame.xpush(b)?;
                self.frame.xpush(a)?;
                self.frame.xpush(d)?;
                self.frame.xpush(c)?;
                self.frame.xpush(b)?;
                self.frame.xpush(a)?;
            }
            Opcode::Swap => {
                let a = self.frame.xpop()?;
                let b = self.frame.xpop()?;
                self.frame.xpush(a)?;
                self.frame.xpush(b)?;
            }

            Opcode::IfZero { op, target } => {
                let lhs = self.frame.pop(Kind::Int)?;
                let rhs = self.arena.push(NodeKind::Const(ConstValue::Int(0)), Kind::Int)?;
                self.finish_branch(begin, BranchCond::Int { op, lhs, rhs }, target)?;
                return Ok(true);
            }
            Opcode::IfIcmp { op, target } => {
                let rhs = self.frame.pop(Kind::Int)?;
                let lhs = self.frame.pop(Kind::Int)?;
                self.finish_branch(begin, BranchCond::Int { op, lhs, rhs }, target)?;
                return Ok(true);
            }
            Opcode::IfAcmp { is_eq, target } => {
                let rhs = self.frame.pop(Kind::Object)?;
                let lhs = self.frame.pop(Kind::Object)?;
                self.finish_branch(begin, BranchCond::Ref { is_eq, lhs, rhs }, target)?;
                return Ok(true);
            }
            Opcode::IfNull { target } => {
                let lhs = self.frame.pop(Kind::Object)?;
                let rhs = self.arena.push(NodeKind::Const(ConstValue::Null), Kind::Object)?;
                self.finish_branch(begin, BranchCond::Ref { is_eq: true, lhs, rhs }, target)?;
                return Ok(true);
            }
            Opcode::IfNonNull { target } => {
                let lhs = self.frame.pop(Kind::Object)?;
                let rhs = self.arena.push(NodeKind::Const(ConstValue::Null), Kind::Object)?;
                self.finish_branch(begin, BranchCond::Ref { is_eq: false, lhs, rhs }, target)?;
                return Ok(true);
            }
            Opcode::Goto { target } => {
                let target_begin = self.successor_begin(target)?;
                let terminator = self.arena.push(NodeKind::Goto { target: target_begin }, Kind::Void)?;
                self.set_begin_end(begin, terminator);
                let is_loop = self.arena_is_loop_header(target_begin);
                let snapshot = self.frame.snapshot(target);
                self.merge(target_begin, begin, &snapshot, is_loop)?;
                return Ok(true);
            }
            Opcode::Jsr { .. } | Opcode::Ret { .. } => {
                return Err(BuildError::Bailout(crate::error::BailoutKind::UnsupportedSubroutine))
            }
            Opcode::TableSwitch { low, targets, default } => {
                let index = self.frame.pop(Kind::Int)?;
                let target_begins: Vec<NodeId> =
                    targets.iter().map(|t| self.successor_begin(*t)).collect::<Result<_>>()?;
                let default_begin = self.successor_begin(default)?;
                let _ = low;
                self.finish_switch(begin, index, target_begins, default_begin, bci)?;
                return Ok(true);
            }
            Opcode::LookupSwitch { pairs, default } => {
                let index = self.frame.pop(Kind::Int)?;
                let target_begins: Vec<NodeId> =
                    pairs.iter().map(|(_, t)| self.successor_begin(*t)).collect::<Result<_>>()?;
                let default_begin = self.successor_begin(default)?;
                self.finish_switch(begin, index, target_begins, default_begin, bci)?;
                return Ok(true);
            }

            Opcode::GetStatic { cpi } => self.translate_get_field(cpi, bci, true)?,
            Opcode::PutStatic { cpi } => self.translate_put_field(cpi, true)?,
            Opcode::GetField { cpi } => self.translate_get_field(cpi, bci, false)?,
            Opcode::PutField { cpi } => self.translate_put_field(cpi, false)?,

            Opcode::InvokeStatic { cpi } => self.translate_invoke(InvokeKind::Static, cpi, bci, false)?,
            Opcode::InvokeSpecial { cpi } => self.translate_invoke(InvokeKind::Special, cpi, bci, true)?,
            Opcode::InvokeVirtual { cpi } => self.translate_invoke(InvokeKind::Virtual, cpi, bci, true)?,
            Opcode::InvokeInterface { cpi } => self.translate_invoke(InvokeKind::Interface, cpi, bci, true)?,

            Opcode::New { cpi } => {
                let ty = self.pool.lookup_type(cpi);
                let node = if ty.is_resolved {
                    let n = self.arena.push(NodeKind::NewInstance { ty }, Kind::Object)?;
                    self.attach_snapshot(n, bci);
                    n
                } else {
                    self.arena.push(NodeKind::Deoptimize { reason: DeoptReason::UnresolvedType, resume_bci: bci }, Kind::Object)?
                };
                self.frame.push(Kind::Object, node)?;
            }
            Opcode::NewArray { elem_kind } => {
                let length = self.frame.pop(Kind::Int)?;
                let node = self.arena.push(NodeKind::NewTypeArray { elem_kind, length }, Kind::Object)?;
                self.attach_snapshot(node, bci);
                self.frame.push(Kind::Object, node)?;
            }
            Opcode::ANewArray { cpi } => {
                let ty = self.pool.lookup_type(cpi);
                let length = self.frame.pop(Kind::Int)?;
                let node = if ty.is_resolved {
                    let n = self.arena.push(NodeKind::NewObjectArray { ty, length }, Kind::Object)?;
                    self.attach_snapshot(n, bci);
                    n
                } else {
                    self.arena.push(NodeKind::Deoptimize { reason: DeoptReason::UnresolvedType, resume_bci: bci }, Kind::Object)?
                };
                self.frame.push(Kind::Object, node)?;
            }
            Opcode::MultiANewArray { cpi, dims } => {
                let ty = self.pool.lookup_type(cpi);
                let dim_values = self.frame.pop_arguments(&vec![Kind::Int; dims as usize])?;
                let node = if ty.is_resolved {
                    let n = self.arena.push(NodeKind::NewMultiArray { ty, dims: dim_values }, Kind::Object)?;
                    self.attach_snapshot(n, bci);
                    n
                } else {
                    self.arena.push(NodeKind::Deoptimize { reason: DeoptReason::UnresolvedType, resume_bci: bci }, Kind::Object)?
                };
                self.frame.push(Kind::Object, node)?;
            }
            Opcode::CheckCast { cpi } => {
                let ty = self.pool.lookup_type(cpi);
                let object = self.frame.pop(Kind::Object)?;
                if ty.is_resolved {
                    let node = self.arena.push(NodeKind::CheckCast { ty, object }, Kind::Object)?;
                    self.frame.push(Kind::Object, node)?;
                } else {
                    // Unresolved: the cast itself never runs, so there is
                    // no object to forward — substitute a null constant
                    // rather than reuse the deoptimize node as a value.
                    self.arena.push(NodeKind::Deoptimize { reason: DeoptReason::UnresolvedType, resume_bci: bci }, Kind::Void)?;
                    self.push_const(ConstValue::Null)?;
                }
            }
            Opcode::InstanceOf { cpi } => {
                let ty = self.pool.lookup_type(cpi);
                let object = self.frame.pop(Kind::Object)?;
                if ty.is_resolved {
                    let node = self.arena.push(NodeKind::InstanceOf { ty, object }, Kind::Int)?;
                    self.frame.push(Kind::Int, node)?;
                } else {
                    // Unresolved: the check itself never runs, so
                    // substitute the zero outcome (`false`) rather than
                    // reuse the deoptimize node as a value.
                    self.arena.push(NodeKind::Deoptimize { reason: DeoptReason::UnresolvedType, resume_bci: bci }, Kind::Void)?;
                    self.push_const(ConstValue::Int(0))?;
                }
            }

            Opcode::MonitorEnter => {
                let object = self.frame.pop(Kind::Object)?;
                self.frame.lock(object);
                self.arena.push(NodeKind::MonitorEnter { object }, Kind::Void)?;
            }
            Opcode::MonitorExit => {
                let object = self.frame.pop(Kind::Object)?;
                self.frame.unlock()?;
                let node = self.arena.push(NodeKind::MonitorExit { object }, Kind::Void)?;
                self.attach_snapshot(node, bci);
                self.exception_edge_for(bci)?;
            }

            Opcode::Return { kind } => {
                self.translate_return(kind)?;
                return Ok(true);
            }
            Opcode::AThrow => {
                let exception = self.frame.pop(Kind::Object)?;
                let exception_edge = self.exception_edge_for(bci)?;
                let terminator = self.arena.push(NodeKind::Throw { exception, exception_edge }, Kind::Void)?;
                self.attach_snapshot(terminator, bci);
                self.set_begin_end(begin, terminator);
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn push_const(&mut self, value: ConstValue) -> Result<()> {
        let kind = value.kind();
        let node = self.arena.push(NodeKind::Const(value), kind)?;
        self.frame.push(kind, node)
    }

    fn fold_or_binop(&mut self, op: CollabBinOp, kind: Kind, lhs: NodeId, rhs: NodeId) -> Result<NodeId> {
        if let (Some(l), Some(r)) = (self.arena.as_const(lhs), self.arena.as_const(rhs)) {
            if let Some(folded) = fold_binop(op, l, r) {
                return self.arena.push(NodeKind::Const(folded), kind);
            }
        }
        self.arena
            .push(NodeKind::BinOp { op, lhs, rhs, is_strict_fp: self.method.is_strict_fp }, kind)
    }

    fn fold_negate(&mut self, input: NodeId, _kind: Kind) -> Result<Option<NodeId>> {
        Ok(match self.arena.as_const(input) {
            Some(ConstValue::Int(v)) => Some(self.arena.push(NodeKind::Const(ConstValue::Int(v.wrapping_neg())), Kind::Int)?),
            Some(ConstValue::Long(v)) => Some(self.arena.push(NodeKind::Const(ConstValue::Long(v.wrapping_neg())), Kind::Long)?),
            Some(ConstValue::Float(v)) => Some(self.arena.push(NodeKind::Const(ConstValue::Float(-v)), Kind::Float)?),
            Some(ConstValue::Double(v)) => Some(self.arena.push(NodeKind::Const(ConstValue::Double(-v)), Kind::Double)?),
            _ => None,
        })
    }

    fn finish_branch(&mut self, begin: NodeId, cond: BranchCond, target_bci: u32) -> Result<()> {
        let if_true = self.successor_begin(target_bci)?;
        let if_false = self.successor_begin(self.stream.current_bci())?;
        let terminator = self.arena.push(NodeKind::If { cond, if_true, if_false }, Kind::Void)?;
        self.set_begin_end(begin, terminator);

        let fall_bci = self.stream.current_bci();
        let snap_true = self.frame.snapshot(target_bci);
        let loop_true = self.arena_is_loop_header(if_true);
        self.merge(if_true, begin, &snap_true, loop_true)?;

        let snap_false = self.frame.snapshot(fall_bci);
        let loop_false = self.arena_is_loop_header(if_false);
        self.merge(if_false, begin, &snap_false, loop_false)
    }

    fn finish_switch(
        &mut self,
        begin: NodeId,
        index: NodeId,
        targets: Vec<NodeId>,
        default: NodeId,
        bci: u32,
    ) -> Result<()> {
        let has_backward_edge = targets.iter().chain(std::iter::once(&default)).any(|t| self.arena_is_loop_header(*t));
        let snapshot = self.frame.snapshot(bci);
        let safepoint_state = if has_backward_edge && !self.runtime.is_no_safepoints(self.method) {
            Some(self.arena.intern_frame_state(snapshot.clone()))
        } else {
            None
        };
        let terminator = self.arena.push(
            NodeKind::Switch { index, targets: targets.clone(), default, safepoint_state },
            Kind::Void,
        )?;
        self.set_begin_end(begin, terminator);
        for target in targets.iter().chain(std::iter::once(&default)) {
            let is_loop = self.arena_is_loop_header(*target);
            self.merge(*target, begin, &snapshot, is_loop)?;
        }
        Ok(())
    }

    fn translate_get_field(&mut self, cpi: u16, bci: u32, is_static: bool) -> Result<()> {
        let field = self.pool.lookup_field(cpi);
        let kind = field.kind;
        let object = if is_static { None } else { Some(self.frame.pop(Kind::Object)?) };

        if !field.is_resolved {
            // Unresolved: the load itself never runs, so there is no
            // field value to forward — substitute the kind's typed
            // default rather than reuse the deoptimize node as a value.
            self.arena.push(
                NodeKind::Deoptimize { reason: DeoptReason::UnresolvedField, resume_bci: bci },
                Kind::Void,
            )?;
            let default = match kind {
                Kind::Int => ConstValue::Int(0),
                Kind::Long => ConstValue::Long(0),
                Kind::Float => ConstValue::Float(0.0),
                Kind::Double => ConstValue::Double(0.0),
                Kind::Object => ConstValue::Null,
                Kind::Void => return Err(BuildError::internal("field load of kind void")),
            };
            self.push_const(default)?;
            return Ok(());
        }
        if let Some(constant) = field.constant_value {
            self.push_const(constant)?;
            return Ok(());
        }
        let node = self.arena.push(NodeKind::LoadField { object, field }, kind)?;
        self.frame.push(kind, node)
    }

    fn translate_put_field(&mut self, cpi: u16, is_static: bool) -> Result<()> {
        let field = self.pool.lookup_field(cpi);
        let value = self.frame.pop(field.kind)?;
        let object = if is_static { None } else { Some(self.frame.pop(Kind::Object)?) };
        self.arena.push(NodeKind::StoreField { object, field, value }, Kind::Void)?;
        Ok(())
    }

    fn translate_invoke(&mut self, requested_kind: InvokeKind, cpi: u16, bci: u32, has_receiver: bool) -> Result<()> {
        let callee = self.pool.lookup_method(cpi);

        if !callee.is_resolved {
            let args = self.frame.pop_arguments(&callee.param_kinds)?;
            let receiver = if has_receiver { Some(self.frame.pop(Kind::Object)?) } else { None };
            let _ = args;
            let kind = callee.return_kind.unwrap_or(Kind::Void);
            let node = self.arena.push(
                NodeKind::Deoptimize { reason: DeoptReason::UnresolvedMethod, resume_bci: bci },
                kind,
            )?;
            let _ = receiver;
            if callee.return_kind.is_some() {
                self.frame.push(kind, node)?;
            }
            return Ok(());
        }

        let args = self.frame.pop_arguments(&callee.param_kinds)?;
        let receiver = if has_receiver { Some(self.frame.pop(Kind::Object)?) } else { None };
        let kind = self.devirtualize(requested_kind, &callee);

        if matches!(requested_kind, InvokeKind::Static) && self.options.resolve_class_before_static_invoke {
            if let Some(decl) = &callee.declaring_type {
                if decl.is_resolved && !decl.is_initialized {
                    self.arena.push(NodeKind::ResolveClass { ty: decl.clone() }, Kind::Void)?;
                }
            }
        }

        let exception_edge = self.exception_edge_for(bci)?;

        let return_kind = callee.return_kind;
        let node = self.arena.push(
            NodeKind::Invoke(InvokeData { kind, callee, receiver, args, exception_edge }),
            return_kind.unwrap_or(Kind::Void),
        )?;
        self.attach_snapshot(node, bci);
        if let Some(rk) = return_kind {
            self.frame.push(rk, node)?;
        }
        Ok(())
    }

    /// Devirtualization protocol (spec §4.5): statically-bindable targets
    /// (final/private/constructor) bind directly; otherwise a concrete
    /// target on a provably-exact declaring type also binds directly;
    /// everything else falls back to indirect dispatch.
    fn devirtualize(&self, requested: InvokeKind, callee: &crate::collab::MethodRef) -> InvokeKind {
        if callee.is_statically_bindable {
            return InvokeKind::Direct;
        }
        if callee.is_concrete {
            if let Some(decl) = &callee.declaring_type {
                if decl.is_exact {
                    return InvokeKind::Direct;
                }
            }
        }
        requested
    }

    fn translate_return(&mut self, kind: Option<Kind>) -> Result<()> {
        let value = match kind {
            Some(k) => Some(self.frame.pop(k)?),
            None => None,
        };

        if self.method.is_synchronized {
            if let Some(lock) = self.sync_lock_object {
                self.arena.push(NodeKind::MonitorExit { object: lock }, Kind::Void)?;
            }
        }

        if self.method.is_constructor && !self.method.is_root_constructor {
            let receiver = self.frame.load_local(0, Kind::Object)?;
            let elided = self.options.use_assumptions
                && self
                    .runtime
                    .register_no_finalizable_subclass_assumption(&self.method.declaring_type);
            if !elided {
                self.arena.push(NodeKind::FinalizerRegister { object: receiver }, Kind::Void)?;
            }
        }

        let begin = self.current_block.ok_or_else(|| BuildError::internal("return with no current block"))?;
        let terminator = self.arena.push(NodeKind::Return { value }, Kind::Void)?;
        self.set_begin_end(begin, terminator);
        Ok(())
    }
}

fn convert_kinds(op: crate::collab::ConvertOp) -> (Kind, Kind) {
    use crate::collab::ConvertOp::*;
    match op {
        I2L => (Kind::Int, Kind::Long),
        I2F => (Kind::Int, Kind::Float),
        I2D => (Kind::Int, Kind::Double),
        L2I => (Kind::Long, Kind::Int),
        L2F => (Kind::Long, Kind::Float),
        L2D => (Kind::Long, Kind::Double),
        F2I => (Kind::Float, Kind::Int),
        F2L => (Kind::Float, Kind::Long),
        F2D => (Kind::Float, Kind::Double),
        D2I => (Kind::Double, Kind::Int),
        D2L => (Kind::Double, Kind::Long),
        D2F => (Kind::Double, Kind::Float),
        I2B | I2C | I2S => (Kind::Int, Kind::Int),
    }
}

fn fold_binop(op: CollabBinOp, lhs: ConstValue, rhs: ConstValue) -> Option<ConstValue> {
    use CollabBinOp::*;
    match (lhs, rhs) {
        (ConstValue::Int(a), ConstValue::Int(b)) => Some(ConstValue::Int(match op {
            Add => a.wrapping_add(b),
            Sub => a.wrapping_sub(b),
            Mul => a.wrapping_mul(b),
            Div if b != 0 => a.wrapping_div(b),
            Rem if b != 0 => a.wrapping_rem(b),
            And => a & b,
            Or => a | b,
            Xor => a ^ b,
            Shl => a.wrapping_shl(b as u32),
            Shr => a.wrapping_shr(b as u32),
            Ushr => ((a as u32).wrapping_shr(b as u32)) as i32,
            Div | Rem => return None,
        })),
        (ConstValue::Long(a), ConstValue::Long(b)) => Some(ConstValue::Long(match op {
            Add => a.wrapping_add(b),
            Sub => a.wrapping_sub(b),
            Mul => a.wrapping_mul(b),
            Div if b != 0 => a.wrapping_div(b),
            Rem if b != 0 => a.wrapping_rem(b),
            And => a & b,
            Or => a | b,
            Xor => a ^ b,
            Shl => a.wrapping_shl(b as u32),
            Shr => a.wrapping_shr(b as u32),
            Ushr => ((a as u64).wrapping_shr(b as u32)) as i64,
            Div | Rem => return None,
        })),
        (ConstValue::Float(a), ConstValue::Float(b)) => Some(ConstValue::Float(match op {
            Add => a + b,
            Sub => a - b,
            Mul => a * b,
            Div => a / b,
            Rem => a % b,
            And | Or | Xor | Shl | Shr | Ushr => return None,
        })),
        (ConstValue::Double(a), ConstValue::Double(b)) => Some(ConstValue::Double(match op {
            Add => a + b,
            Sub => a - b,
            Mul => a * b,
            Div => a / b,
            Rem => a % b,
            And | Or | Xor | Shl | Shr | Ushr => return None,
        })),
        _ => None,
    }
}
