// This module defines error types for the misched library using the thiserror
// crate for idiomatic Rust error handling. SchedError covers the two hard
// failure modes of the subsystem: alias-model queries made with a non-physical
// register (a contract violation by a calling pass) and dependency-graph cycle
// detection (a defensive check for internal invariant violations that should
// never fire with a correct builder). Both abort processing of the current
// compilation unit; everything else in this crate is a total function over
// well-formed input. SchedResult<T> is the crate-wide result alias.

//! Error types for scheduling and copy propagation.
//!
//! Using thiserror for more idiomatic error handling.

use thiserror::Error;

/// Hard failures of the scheduling subsystem.
#[derive(Error, Debug)]
pub enum SchedError {
    /// An alias-model query was made with an operand that is not a physical
    /// register. Upstream passes must resolve or opaquely track virtual
    /// registers before asking about overlap.
    #[error("alias query on non-physical register {found}")]
    InvalidRegisterKind { found: String },

    /// A cycle was detected in the dependency graph, either during
    /// construction or when a scheduler re-checked its input. Indicates a
    /// builder bug, never malformed user input.
    #[error("malformed dependency graph: {reason}")]
    MalformedDependencyGraph { reason: String },
}

/// Result type alias for scheduling operations.
pub type SchedResult<T> = Result<T, SchedError>;
