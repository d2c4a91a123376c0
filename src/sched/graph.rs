// This module implements the scheduling dependency graph. A SchedUnit wraps
// one instruction or a glued cluster that must retire atomically; edges carry
// a dependency kind and a latency. The pred/succ lists are mirrored
// half-edges and add_edge is the only mutation path, which keeps the
// symmetry invariant mechanical. Edge storage lives in the session arena
// (bumpalo), so a whole per-block graph is freed in one drop. Acyclicity is
// an invariant, not an input property: verify() re-checks it and a failure
// is reported as MalformedDependencyGraph rather than recovered from.

//! Schedulable units and the dependency graph over them.

use crate::error::{SchedError, SchedResult};
use crate::mir::InstrId;
use bumpalo::collections::Vec as BumpVec;
use bumpalo::Bump;
use std::collections::VecDeque;

/// Index of a unit within its graph. Units are numbered in program order of
/// their first instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub u32);

/// Why one unit must not be scheduled before another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepKind {
    /// True dependency: the source defines a value the destination reads.
    Data,
    /// Ordering required for correctness unrelated to data: side-effect
    /// order, control-flow boundaries.
    Order,
    /// Co-scheduling constraint: zero latency, adjacent placement.
    Cluster,
}

/// Half of a dependency edge, stored mirrored on both endpoints.
#[derive(Debug, Clone, Copy)]
pub struct SchedEdge {
    /// The unit on the other end: the predecessor when stored in `preds`,
    /// the successor when stored in `succs`.
    pub other: UnitId,
    pub kind: DepKind,
    pub latency: u32,
}

/// One schedulable unit: a single instruction or a glued cluster.
#[derive(Debug)]
pub struct SchedUnit<'g> {
    pub id: UnitId,
    /// Member instructions in program order. More than one only for glued
    /// clusters.
    pub instrs: BumpVec<'g, InstrId>,
    pub preds: BumpVec<'g, SchedEdge>,
    pub succs: BumpVec<'g, SchedEdge>,
    /// Modeled cycles until the unit's results are available.
    pub latency: u32,
    /// Number of register definitions across all members.
    pub num_defs: u32,
    pub is_scheduled: bool,
}

/// Dependency graph for one basic block.
pub struct SchedGraph<'g> {
    arena: &'g Bump,
    units: Vec<SchedUnit<'g>>,
}

impl<'g> SchedGraph<'g> {
    pub fn new(arena: &'g Bump) -> Self {
        Self {
            arena,
            units: Vec::new(),
        }
    }

    /// Create a unit wrapping a single instruction.
    pub fn add_unit(&mut self, instr: InstrId, latency: u32, num_defs: u32) -> UnitId {
        let id = UnitId(self.units.len() as u32);
        let mut instrs = BumpVec::new_in(self.arena);
        instrs.push(instr);
        self.units.push(SchedUnit {
            id,
            instrs,
            preds: BumpVec::new_in(self.arena),
            succs: BumpVec::new_in(self.arena),
            latency,
            num_defs,
            is_scheduled: false,
        });
        id
    }

    /// Fold a glued instruction into an existing unit.
    pub fn append_to_unit(&mut self, unit: UnitId, instr: InstrId, latency: u32, num_defs: u32) {
        let unit = &mut self.units[unit.0 as usize];
        unit.instrs.push(instr);
        unit.latency = unit.latency.max(latency);
        unit.num_defs += num_defs;
    }

    pub fn unit(&self, id: UnitId) -> &SchedUnit<'g> {
        &self.units[id.0 as usize]
    }

    pub fn unit_mut(&mut self, id: UnitId) -> &mut SchedUnit<'g> {
        &mut self.units[id.0 as usize]
    }

    pub fn num_units(&self) -> usize {
        self.units.len()
    }

    pub fn units(&self) -> impl Iterator<Item = &SchedUnit<'g>> + '_ {
        self.units.iter()
    }

    /// Is there already an edge `from → to` of this kind?
    pub fn has_edge(&self, from: UnitId, to: UnitId, kind: DepKind) -> bool {
        self.units[from.0 as usize]
            .succs
            .iter()
            .any(|edge| edge.other == to && edge.kind == kind)
    }

    /// Insert a dependency edge `from → to`. Mirrored on both endpoints;
    /// duplicate (to, kind) pairs are ignored. Cluster edges always carry
    /// zero latency. A self-edge is a builder bug and reported as a
    /// malformed graph.
    pub fn add_edge(
        &mut self,
        from: UnitId,
        to: UnitId,
        kind: DepKind,
        latency: u32,
    ) -> SchedResult<()> {
        if from == to {
            return Err(SchedError::MalformedDependencyGraph {
                reason: format!("self edge on unit {}", from.0),
            });
        }
        if self.has_edge(from, to, kind) {
            return Ok(());
        }
        let latency = match kind {
            DepKind::Cluster => 0,
            DepKind::Data | DepKind::Order => latency,
        };
        self.units[from.0 as usize].succs.push(SchedEdge {
            other: to,
            kind,
            latency,
        });
        self.units[to.0 as usize].preds.push(SchedEdge {
            other: from,
            kind,
            latency,
        });
        Ok(())
    }

    /// Is `to` reachable from `from` along successor edges?
    pub fn reaches(&self, from: UnitId, to: UnitId) -> bool {
        if from == to {
            return true;
        }
        let mut visited = vec![false; self.units.len()];
        let mut stack = vec![from];
        while let Some(unit) = stack.pop() {
            if visited[unit.0 as usize] {
                continue;
            }
            visited[unit.0 as usize] = true;
            for edge in self.units[unit.0 as usize].succs.iter() {
                if edge.other == to {
                    return true;
                }
                stack.push(edge.other);
            }
        }
        false
    }

    /// Check the graph invariants: mirrored pred/succ symmetry and
    /// acyclicity over all edge kinds.
    pub fn verify(&self) -> SchedResult<()> {
        for unit in &self.units {
            for edge in unit.succs.iter() {
                let mirrored = self.units[edge.other.0 as usize]
                    .preds
                    .iter()
                    .any(|back| back.other == unit.id && back.kind == edge.kind);
                if !mirrored {
                    return Err(SchedError::MalformedDependencyGraph {
                        reason: format!(
                            "edge {} -> {} has no mirrored predecessor",
                            unit.id.0, edge.other.0
                        ),
                    });
                }
            }
            for edge in unit.preds.iter() {
                let mirrored = self.units[edge.other.0 as usize]
                    .succs
                    .iter()
                    .any(|fwd| fwd.other == unit.id && fwd.kind == edge.kind);
                if !mirrored {
                    return Err(SchedError::MalformedDependencyGraph {
                        reason: format!(
                            "predecessor {} of {} has no mirrored successor",
                            edge.other.0, unit.id.0
                        ),
                    });
                }
            }
        }
        self.check_acyclic()
    }

    /// Kahn's algorithm over all edge kinds. Every unit must be emitted,
    /// otherwise a cycle exists.
    fn check_acyclic(&self) -> SchedResult<()> {
        let mut indegree: Vec<usize> = self.units.iter().map(|u| u.preds.len()).collect();
        let mut queue: VecDeque<UnitId> = self
            .units
            .iter()
            .filter(|u| u.preds.is_empty())
            .map(|u| u.id)
            .collect();
        let mut emitted = 0usize;
        while let Some(unit) = queue.pop_front() {
            emitted += 1;
            for edge in self.units[unit.0 as usize].succs.iter() {
                let entry = &mut indegree[edge.other.0 as usize];
                *entry -= 1;
                if *entry == 0 {
                    queue.push_back(edge.other);
                }
            }
        }
        if emitted != self.units.len() {
            return Err(SchedError::MalformedDependencyGraph {
                reason: format!(
                    "cycle among {} of {} units",
                    self.units.len() - emitted,
                    self.units.len()
                ),
            });
        }
        Ok(())
    }
}
