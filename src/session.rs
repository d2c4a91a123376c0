// This module provides arena-based pass session management using the bumpalo
// crate. SchedSession owns the arena the per-block dependency graphs allocate
// their unit and edge storage in, so a whole graph is freed in one drop at
// the end of the session, and tracks pass statistics behind a RefCell so the
// pipeline can record progress through a shared reference. The session is
// single-threaded by construction; parallel drivers create one session per
// worker.

//! Pass session and statistics.

use crate::copyprop::CopyPropStats;
use crate::sched::{DepKind, SchedGraph};
use bumpalo::Bump;
use std::cell::RefCell;
use std::fmt;

/// Owns the working storage and statistics for one scheduling run.
pub struct SchedSession<'arena> {
    arena: &'arena Bump,
    stats: RefCell<PassStats>,
}

impl<'arena> SchedSession<'arena> {
    pub fn new(arena: &'arena Bump) -> Self {
        Self {
            arena,
            stats: RefCell::new(PassStats::default()),
        }
    }

    /// The arena dependency graphs allocate in.
    pub fn arena(&self) -> &'arena Bump {
        self.arena
    }

    /// Record a freshly built dependency graph.
    pub fn record_graph(&self, graph: &SchedGraph<'_>) {
        let mut stats = self.stats.borrow_mut();
        stats.units_created += graph.num_units();
        for unit in graph.units() {
            for edge in unit.succs.iter() {
                match edge.kind {
                    DepKind::Data => stats.data_edges += 1,
                    DepKind::Order => stats.order_edges += 1,
                    DepKind::Cluster => stats.cluster_edges += 1,
                }
            }
        }
    }

    /// Record a committed block schedule.
    pub fn record_block_scheduled(&self, instructions: usize) {
        let mut stats = self.stats.borrow_mut();
        stats.blocks_scheduled += 1;
        stats.instructions_scheduled += instructions;
    }

    /// Fold one block's copy propagation result into the session totals.
    pub fn record_copy_prop(&self, result: CopyPropStats) {
        self.stats.borrow_mut().copies_eliminated.merge(result);
    }

    pub fn stats(&self) -> PassStats {
        self.stats.borrow().clone()
    }
}

/// Counters accumulated across one session.
#[derive(Debug, Default, Clone)]
pub struct PassStats {
    pub blocks_scheduled: usize,
    pub instructions_scheduled: usize,
    pub units_created: usize,
    pub data_edges: usize,
    pub order_edges: usize,
    pub cluster_edges: usize,
    pub copies_eliminated: CopyPropStats,
}

impl fmt::Display for PassStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Scheduling Session Statistics:")?;
        writeln!(f, "  Blocks scheduled: {}", self.blocks_scheduled)?;
        writeln!(f, "  Instructions scheduled: {}", self.instructions_scheduled)?;
        writeln!(f, "  Scheduling units: {}", self.units_created)?;
        writeln!(
            f,
            "  Dependency edges: {} data, {} order, {} cluster",
            self.data_edges, self.order_edges, self.cluster_edges
        )?;
        let copies = &self.copies_eliminated;
        writeln!(
            f,
            "  Copies eliminated: {} ({} nop, {} clobbered, {} dead at exit)",
            copies.total(),
            copies.nop_copies,
            copies.clobbered_before_use,
            copies.dead_at_block_end
        )?;
        Ok(())
    }
}
