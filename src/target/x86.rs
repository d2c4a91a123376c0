//! x86-flavored test target description.
//!
//! Eight general-purpose register families with the usual sub-register
//! structure (`RAX` ⊃ `EAX` ⊃ `AX` ⊃ `AH`/`AL`), stack and frame pointer
//! families reserved. This is the description the unit and integration
//! tests run against; a production embedder supplies its own
//! [`RegisterDesc`] table.

use super::registers::{PhysReg, RegisterDesc, TargetRegisterInfo};

pub const RAX: PhysReg = PhysReg(0);
pub const EAX: PhysReg = PhysReg(1);
pub const AX: PhysReg = PhysReg(2);
pub const AH: PhysReg = PhysReg(3);
pub const AL: PhysReg = PhysReg(4);
pub const RBX: PhysReg = PhysReg(5);
pub const EBX: PhysReg = PhysReg(6);
pub const BX: PhysReg = PhysReg(7);
pub const BH: PhysReg = PhysReg(8);
pub const BL: PhysReg = PhysReg(9);
pub const RCX: PhysReg = PhysReg(10);
pub const ECX: PhysReg = PhysReg(11);
pub const CX: PhysReg = PhysReg(12);
pub const CH: PhysReg = PhysReg(13);
pub const CL: PhysReg = PhysReg(14);
pub const RDX: PhysReg = PhysReg(15);
pub const EDX: PhysReg = PhysReg(16);
pub const DX: PhysReg = PhysReg(17);
pub const DH: PhysReg = PhysReg(18);
pub const DL: PhysReg = PhysReg(19);
pub const RSI: PhysReg = PhysReg(20);
pub const ESI: PhysReg = PhysReg(21);
pub const SI: PhysReg = PhysReg(22);
pub const SIL: PhysReg = PhysReg(23);
pub const RDI: PhysReg = PhysReg(24);
pub const EDI: PhysReg = PhysReg(25);
pub const DI: PhysReg = PhysReg(26);
pub const DIL: PhysReg = PhysReg(27);
pub const RBP: PhysReg = PhysReg(28);
pub const EBP: PhysReg = PhysReg(29);
pub const BP: PhysReg = PhysReg(30);
pub const BPL: PhysReg = PhysReg(31);
pub const RSP: PhysReg = PhysReg(32);
pub const ESP: PhysReg = PhysReg(33);
pub const SP: PhysReg = PhysReg(34);
pub const SPL: PhysReg = PhysReg(35);

/// Register units: four per family, numbered low byte, high byte (or the
/// second byte for families without one), upper 16 bits, upper 32 bits.
const DESCS: &[RegisterDesc] = &[
    RegisterDesc { name: "rax", units: &[0, 1, 2, 3], reserved: false },
    RegisterDesc { name: "eax", units: &[0, 1, 2], reserved: false },
    RegisterDesc { name: "ax", units: &[0, 1], reserved: false },
    RegisterDesc { name: "ah", units: &[1], reserved: false },
    RegisterDesc { name: "al", units: &[0], reserved: false },
    RegisterDesc { name: "rbx", units: &[4, 5, 6, 7], reserved: false },
    RegisterDesc { name: "ebx", units: &[4, 5, 6], reserved: false },
    RegisterDesc { name: "bx", units: &[4, 5], reserved: false },
    RegisterDesc { name: "bh", units: &[5], reserved: false },
    RegisterDesc { name: "bl", units: &[4], reserved: false },
    RegisterDesc { name: "rcx", units: &[8, 9, 10, 11], reserved: false },
    RegisterDesc { name: "ecx", units: &[8, 9, 10], reserved: false },
    RegisterDesc { name: "cx", units: &[8, 9], reserved: false },
    RegisterDesc { name: "ch", units: &[9], reserved: false },
    RegisterDesc { name: "cl", units: &[8], reserved: false },
    RegisterDesc { name: "rdx", units: &[12, 13, 14, 15], reserved: false },
    RegisterDesc { name: "edx", units: &[12, 13, 14], reserved: false },
    RegisterDesc { name: "dx", units: &[12, 13], reserved: false },
    RegisterDesc { name: "dh", units: &[13], reserved: false },
    RegisterDesc { name: "dl", units: &[12], reserved: false },
    RegisterDesc { name: "rsi", units: &[16, 17, 18, 19], reserved: false },
    RegisterDesc { name: "esi", units: &[16, 17, 18], reserved: false },
    RegisterDesc { name: "si", units: &[16, 17], reserved: false },
    RegisterDesc { name: "sil", units: &[16], reserved: false },
    RegisterDesc { name: "rdi", units: &[20, 21, 22, 23], reserved: false },
    RegisterDesc { name: "edi", units: &[20, 21, 22], reserved: false },
    RegisterDesc { name: "di", units: &[20, 21], reserved: false },
    RegisterDesc { name: "dil", units: &[20], reserved: false },
    RegisterDesc { name: "rbp", units: &[24, 25, 26, 27], reserved: true },
    RegisterDesc { name: "ebp", units: &[24, 25, 26], reserved: true },
    RegisterDesc { name: "bp", units: &[24, 25], reserved: true },
    RegisterDesc { name: "bpl", units: &[24], reserved: true },
    RegisterDesc { name: "rsp", units: &[28, 29, 30, 31], reserved: true },
    RegisterDesc { name: "esp", units: &[28, 29, 30], reserved: true },
    RegisterDesc { name: "sp", units: &[28, 29], reserved: true },
    RegisterDesc { name: "spl", units: &[28], reserved: true },
];

/// Build the test target's alias model.
pub fn target() -> TargetRegisterInfo {
    TargetRegisterInfo::new(DESCS)
}
