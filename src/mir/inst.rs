// This module defines the Instruction type and its closed category enum.
// The source design relied on open-ended dynamic type tests over an
// instruction class hierarchy; here the categories the passes dispatch on
// are a tagged variant so every match is checked for exhaustiveness when a
// category is added. Opcode identity stays opaque to this crate: the
// instruction selector and the latency model agree on the numbering, the
// scheduler only compares and hashes it.

//! Instructions and instruction categories.

use super::operand::{Operand, OperandKind};
use crate::target::{RegMask, RegisterRef};

/// Opaque opcode identity assigned by instruction selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Opcode(pub u16);

/// What the passes need to know about an instruction's role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrKind {
    /// Plain computation.
    Ordinary,
    /// Register-to-register copy: one register def, one register use.
    Copy,
    /// Call without clobber annotation.
    Call,
    /// Call carrying a bulk clobber mask.
    RegisterMask,
    /// Block terminator; must retire last.
    Terminator,
}

/// One machine instruction.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub opcode: Opcode,
    pub kind: InstrKind,
    pub operands: Vec<Operand>,
    /// Must stay ordered relative to other side-effecting instructions
    /// (calls, barriers, volatile accesses).
    pub has_side_effects: bool,
    /// Retires atomically with the previous instruction; the graph builder
    /// folds it into the previous scheduling unit.
    pub glued_to_prev: bool,
    /// Bulk clobber set, present exactly on `RegisterMask` instructions.
    pub reg_mask: Option<RegMask>,
}

impl Instruction {
    /// Plain instruction from opcode and operands.
    pub fn ordinary(opcode: Opcode, operands: Vec<Operand>) -> Self {
        Self {
            opcode,
            kind: InstrKind::Ordinary,
            operands,
            has_side_effects: false,
            glued_to_prev: false,
            reg_mask: None,
        }
    }

    /// Register-to-register copy `dst = src`.
    pub fn copy(opcode: Opcode, dst: RegisterRef, src: RegisterRef) -> Self {
        Self {
            opcode,
            kind: InstrKind::Copy,
            operands: vec![Operand::reg_def(dst), Operand::reg_use(src)],
            has_side_effects: false,
            glued_to_prev: false,
            reg_mask: None,
        }
    }

    /// Call instruction. A clobber mask upgrades the category to
    /// [`InstrKind::RegisterMask`]. Calls are always side-effecting.
    pub fn call(opcode: Opcode, operands: Vec<Operand>, mask: Option<RegMask>) -> Self {
        let kind = if mask.is_some() {
            InstrKind::RegisterMask
        } else {
            InstrKind::Call
        };
        Self {
            opcode,
            kind,
            operands,
            has_side_effects: true,
            glued_to_prev: false,
            reg_mask: mask,
        }
    }

    /// Block terminator.
    pub fn terminator(opcode: Opcode, operands: Vec<Operand>) -> Self {
        Self {
            opcode,
            kind: InstrKind::Terminator,
            operands,
            has_side_effects: false,
            glued_to_prev: false,
            reg_mask: None,
        }
    }

    /// Mark as side-effecting (volatile access, barrier).
    pub fn with_side_effects(mut self) -> Self {
        self.has_side_effects = true;
        self
    }

    /// Glue to the previous instruction for atomic scheduling.
    pub fn glued(mut self) -> Self {
        self.glued_to_prev = true;
        self
    }

    pub fn is_copy(&self) -> bool {
        self.kind == InstrKind::Copy
    }

    pub fn is_call(&self) -> bool {
        matches!(self.kind, InstrKind::Call | InstrKind::RegisterMask)
    }

    pub fn is_terminator(&self) -> bool {
        self.kind == InstrKind::Terminator
    }

    /// Destination and source of a copy, if this is one.
    pub fn copy_operands(&self) -> Option<(RegisterRef, RegisterRef)> {
        if !self.is_copy() || self.operands.len() < 2 {
            return None;
        }
        match (self.operands[0], self.operands[1]) {
            (
                Operand {
                    kind: OperandKind::Reg(dst),
                    is_def: true,
                    ..
                },
                Operand {
                    kind: OperandKind::Reg(src),
                    is_def: false,
                    ..
                },
            ) => Some((dst, src)),
            _ => None,
        }
    }

    /// Register def operands with their operand indices.
    pub fn reg_defs(&self) -> impl Iterator<Item = (usize, RegisterRef)> + '_ {
        self.operands.iter().enumerate().filter_map(|(idx, op)| {
            if !op.is_def {
                return None;
            }
            match op.kind {
                OperandKind::Reg(reg) => Some((idx, reg)),
                _ => None,
            }
        })
    }

    /// Registers read by this instruction: non-def register operands plus
    /// memory-operand base registers. Yields the undef flag alongside.
    pub fn reg_reads(&self) -> impl Iterator<Item = (RegisterRef, bool)> + '_ {
        self.operands.iter().filter_map(|op| {
            if op.is_def {
                return None;
            }
            op.reg().map(|reg| (reg, op.is_undef))
        })
    }

    /// Number of register definitions.
    pub fn num_reg_defs(&self) -> u32 {
        self.reg_defs().count() as u32
    }
}
