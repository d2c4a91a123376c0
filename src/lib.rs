//! misched - Machine-level instruction scheduling and copy propagation.
//!
//! misched is the post-instruction-selection middle end of a compiler
//! backend. It builds a dependency graph over a selected instruction stream,
//! commits a latency-aware linear order, and then strips redundant
//! register-to-register copies from the committed stream with a forward
//! dataflow pass.
//!
//! # Primary Usage
//!
//! ```ignore
//! use misched::{schedule_and_optimize, ListScheduler, SchedSession};
//! use misched::target::{x86, LatencyModel};
//! use bumpalo::Bump;
//!
//! // One session per scheduling run, arena-backed.
//! let arena = Bump::new();
//! let session = SchedSession::new(&arena);
//!
//! let tri = x86::target();
//! let latency = LatencyModel::new();
//! let mut scheduler = ListScheduler::new();
//! let stats = schedule_and_optimize(&mut function, &tri, &latency, &mut scheduler, &session)?;
//! println!("{}", session.stats());
//! ```
//!
//! # Architecture
//!
//! - [`mir`] - The instruction-level program representation
//! - [`target`] - Register alias model and latency model
//! - [`sched`] - Dependency graph construction and list scheduling
//! - [`copyprop`] - Redundant-copy elimination over the scheduled stream
//! - [`session`] - Arena-backed session and pass statistics
//! - [`pipeline`] - Stage sequencing per function

pub mod copyprop;
pub mod error;
pub mod mir;
pub mod pipeline;
pub mod sched;
pub mod session;
pub mod target;

pub use copyprop::{propagate_block, propagate_function, CopyPropStats, ElimReason};
pub use error::{SchedError, SchedResult};
pub use mir::{Block, BlockId, Function, InstrId, InstrKind, Instruction, Opcode, Operand};
pub use pipeline::schedule_and_optimize;
pub use sched::{
    build_graph, commit_schedule, verify_schedule, DepKind, ListScheduler, SchedGraph, SchedUnit,
    Scheduler, UnitId,
};
pub use session::{PassStats, SchedSession};
pub use target::{
    LatencyModel, PhysReg, RegMask, RegisterRef, TargetRegisterInfo, VirtReg,
};
