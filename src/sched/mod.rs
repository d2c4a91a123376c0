//! Dependency-graph construction and instruction scheduling.
//!
//! [`graph`] holds the schedulable-unit graph, [`builder`] turns one basic
//! block into that graph, and [`list`] defines the scheduler contract plus
//! the latency-aware list scheduler that commits a new program order.

pub mod builder;
pub mod graph;
pub mod list;

pub use builder::build_graph;
pub use graph::{DepKind, SchedEdge, SchedGraph, SchedUnit, UnitId};
pub use list::{commit_schedule, verify_schedule, ListScheduler, Scheduler};
