//! Instruction operands.
//!
//! An operand is a closed sum over the three storage locations an
//! instruction can name: a register, an immediate, or a memory reference.
//! Def/use direction, the undef flag (the value read is unspecified), and
//! the kill flag (the register's live range ends here) ride alongside the
//! location. Operands are owned by their instruction and never shared.

use crate::target::RegisterRef;

/// A memory reference: base register plus a constant byte offset and the
/// access width in bytes. The base register is read by the instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemRef {
    pub base: RegisterRef,
    pub offset: i64,
    pub width: u8,
}

/// Storage location named by an operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    Reg(RegisterRef),
    Imm(i64),
    Mem(MemRef),
}

/// One operand of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operand {
    pub kind: OperandKind,
    /// Defined (written) by the instruction; otherwise read.
    pub is_def: bool,
    /// The value read is unspecified. Counts as a read for use-tracking but
    /// never as a kill.
    pub is_undef: bool,
    /// The register's live range ends at this instruction.
    pub is_kill: bool,
}

impl Operand {
    pub fn reg_def(reg: RegisterRef) -> Self {
        Self {
            kind: OperandKind::Reg(reg),
            is_def: true,
            is_undef: false,
            is_kill: false,
        }
    }

    pub fn reg_use(reg: RegisterRef) -> Self {
        Self {
            kind: OperandKind::Reg(reg),
            is_def: false,
            is_undef: false,
            is_kill: false,
        }
    }

    pub fn imm(value: i64) -> Self {
        Self {
            kind: OperandKind::Imm(value),
            is_def: false,
            is_undef: false,
            is_kill: false,
        }
    }

    pub fn mem(base: RegisterRef, offset: i64, width: u8) -> Self {
        Self {
            kind: OperandKind::Mem(MemRef {
                base,
                offset,
                width,
            }),
            is_def: false,
            is_undef: false,
            is_kill: false,
        }
    }

    /// Mark the register's live range as ending here.
    pub fn killed(mut self) -> Self {
        self.is_kill = true;
        self
    }

    /// Mark the value read as unspecified.
    pub fn undef(mut self) -> Self {
        self.is_undef = true;
        self
    }

    /// The register this operand names, if any. Memory operands report
    /// their base register, which the instruction reads.
    pub fn reg(&self) -> Option<RegisterRef> {
        match self.kind {
            OperandKind::Reg(reg) => Some(reg),
            OperandKind::Mem(mem) => Some(mem.base),
            OperandKind::Imm(_) => None,
        }
    }

    /// The memory reference, if this is a memory operand.
    pub fn mem_ref(&self) -> Option<MemRef> {
        match self.kind {
            OperandKind::Mem(mem) => Some(mem),
            _ => None,
        }
    }
}
