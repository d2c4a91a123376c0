//! Machine IR: the instruction-level program representation the passes
//! operate on.
//!
//! Instruction selection (external to this crate) hands over a [`Function`]
//! of [`Block`]s, each an ordered list of [`Instruction`]s over
//! [`Operand`]s. Blocks own their instructions in a generation-tagged slot
//! arena, so passes key maps by stable [`InstrId`]s and deletion marks a
//! slot free instead of invalidating references held elsewhere.

pub mod block;
pub mod inst;
pub mod operand;

pub use block::{Block, BlockId, Function, InstrId};
pub use inst::{InstrKind, Instruction, Opcode};
pub use operand::{MemRef, Operand, OperandKind};
