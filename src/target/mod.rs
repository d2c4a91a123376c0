//! Static target description: the register alias model and the latency
//! model.
//!
//! Both are pure, precomputed views handed to the passes by reference.
//! [`registers`] answers overlap and alias-closure queries over physical
//! registers and carries the reserved set and [`RegMask`] bulk clobbers;
//! [`latency`] maps opcodes to modeled cycle counts. [`x86`] is the
//! x86-flavored description the test suites run against.

pub mod latency;
pub mod registers;
pub mod x86;

pub use latency::LatencyModel;
pub use registers::{PhysReg, RegMask, RegisterDesc, RegisterRef, TargetRegisterInfo, VirtReg};
