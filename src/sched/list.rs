// This module defines the scheduler contract and the default list scheduler.
// A scheduler consumes the dependency graph for one block and produces a
// total order of units that respects every Data/Order/Cluster edge; the
// heuristic is pluggable, the contract is not. The list scheduler ranks
// ready units by critical-path height (latency-weighted longest path to the
// block exit) and packs up to issue-width units per cycle. Cluster-linked
// units form an emission group that always leaves the ready set atomically,
// in original relative order, which is what keeps them contiguous in the
// committed schedule.

//! Scheduler contract, list scheduling, and schedule commit.

use super::graph::{DepKind, SchedGraph, UnitId};
use crate::error::{SchedError, SchedResult};
use crate::mir::{Block, InstrId};
use crate::target::TargetRegisterInfo;
use log::{debug, trace};
use std::collections::VecDeque;

/// Produces a valid topological order of the unit graph.
///
/// Implementations must guarantee that no unit appears before any of its
/// Data/Order/Cluster predecessors and that cluster-linked units stay
/// contiguous in their original relative order. A cyclic input graph is an
/// internal invariant violation and fails with
/// [`SchedError::MalformedDependencyGraph`].
pub trait Scheduler {
    fn schedule(&mut self, graph: &mut SchedGraph<'_>) -> SchedResult<Vec<UnitId>>;
}

/// Latency-aware list scheduler.
pub struct ListScheduler {
    issue_width: usize,
}

impl ListScheduler {
    pub fn new() -> Self {
        Self { issue_width: 4 }
    }

    /// Superscalar width: how many units may issue per cycle.
    pub fn with_issue_width(issue_width: usize) -> Self {
        Self {
            issue_width: issue_width.max(1),
        }
    }

    /// Critical-path height of every unit: its own latency plus the longest
    /// latency-weighted path to any exit.
    fn heights(graph: &SchedGraph<'_>) -> SchedResult<Vec<u64>> {
        let n = graph.num_units();
        let mut indegree: Vec<usize> = (0..n)
            .map(|idx| graph.unit(UnitId(idx as u32)).preds.len())
            .collect();
        let mut queue: VecDeque<UnitId> = (0..n)
            .map(|idx| UnitId(idx as u32))
            .filter(|&id| indegree[id.0 as usize] == 0)
            .collect();
        let mut topo: Vec<UnitId> = Vec::with_capacity(n);
        while let Some(unit) = queue.pop_front() {
            topo.push(unit);
            for edge in graph.unit(unit).succs.iter() {
                let entry = &mut indegree[edge.other.0 as usize];
                *entry -= 1;
                if *entry == 0 {
                    queue.push_back(edge.other);
                }
            }
        }
        if topo.len() != n {
            return Err(SchedError::MalformedDependencyGraph {
                reason: "cyclic unit graph handed to scheduler".into(),
            });
        }

        let mut heights = vec![0u64; n];
        for &unit in topo.iter().rev() {
            let mut best = 0u64;
            for edge in graph.unit(unit).succs.iter() {
                best = best.max(u64::from(edge.latency) + heights[edge.other.0 as usize]);
            }
            heights[unit.0 as usize] = u64::from(graph.unit(unit).latency) + best;
        }
        Ok(heights)
    }
}

impl Default for ListScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for ListScheduler {
    fn schedule(&mut self, graph: &mut SchedGraph<'_>) -> SchedResult<Vec<UnitId>> {
        graph.verify()?;
        let n = graph.num_units();
        let heights = Self::heights(graph)?;

        // Cluster components become atomic emission groups. Members are
        // mutually unordered by construction, so contiguous emission in id
        // (program) order is always legal.
        let mut group_of: Vec<usize> = (0..n).collect();
        for idx in 0..n {
            let unit = UnitId(idx as u32);
            for edge in graph.unit(unit).succs.iter() {
                if edge.kind == DepKind::Cluster {
                    let root = group_of[idx];
                    let other = group_of[edge.other.0 as usize];
                    let merged = root.min(other);
                    for slot in group_of.iter_mut() {
                        if *slot == root || *slot == other {
                            *slot = merged;
                        }
                    }
                }
            }
        }
        let mut members: Vec<Vec<UnitId>> = vec![Vec::new(); n];
        for idx in 0..n {
            members[group_of[idx]].push(UnitId(idx as u32));
        }

        let mut ext_indegree = vec![0usize; n];
        for idx in 0..n {
            for edge in graph.unit(UnitId(idx as u32)).preds.iter() {
                if group_of[edge.other.0 as usize] != group_of[idx] {
                    ext_indegree[group_of[idx]] += 1;
                }
            }
        }

        let mut ready: Vec<usize> = (0..n)
            .filter(|&g| !members[g].is_empty() && ext_indegree[g] == 0)
            .collect();
        let group_priority = |g: usize| -> u64 {
            members[g]
                .iter()
                .map(|&u| heights[u.0 as usize])
                .max()
                .unwrap_or(0)
        };

        let mut order: Vec<UnitId> = Vec::with_capacity(n);
        while !ready.is_empty() {
            ready.sort_by(|&a, &b| group_priority(b).cmp(&group_priority(a)).then(a.cmp(&b)));

            let mut issued: Vec<usize> = Vec::new();
            let mut slots = 0usize;
            for &group in ready.iter() {
                if slots >= self.issue_width {
                    break;
                }
                issued.push(group);
                slots += members[group].len();
            }
            ready.retain(|g| !issued.contains(g));

            for group in issued {
                for &unit in &members[group] {
                    trace!("issue unit {} (height {})", unit.0, heights[unit.0 as usize]);
                    order.push(unit);
                    graph.unit_mut(unit).is_scheduled = true;
                }
                for &unit in &members[group] {
                    for edge in graph.unit(unit).succs.iter() {
                        let succ_group = group_of[edge.other.0 as usize];
                        if succ_group == group {
                            continue;
                        }
                        ext_indegree[succ_group] -= 1;
                        if ext_indegree[succ_group] == 0 {
                            ready.push(succ_group);
                        }
                    }
                }
            }
        }

        if order.len() != n {
            return Err(SchedError::MalformedDependencyGraph {
                reason: "scheduler could not emit every unit".into(),
            });
        }
        debug!("scheduled {} units", n);
        Ok(order)
    }
}

/// Check a unit order against the graph contract: every edge runs forward
/// and cluster-linked units sit adjacent in original relative order.
pub fn verify_schedule(graph: &SchedGraph<'_>, order: &[UnitId]) -> SchedResult<()> {
    let mut position = vec![usize::MAX; graph.num_units()];
    for (pos, &unit) in order.iter().enumerate() {
        position[unit.0 as usize] = pos;
    }
    for unit in graph.units() {
        for edge in unit.succs.iter() {
            let from = position[unit.id.0 as usize];
            let to = position[edge.other.0 as usize];
            if from >= to {
                return Err(SchedError::MalformedDependencyGraph {
                    reason: format!(
                        "schedule places {} at {} but its successor {} at {}",
                        unit.id.0, from, edge.other.0, to
                    ),
                });
            }
            if edge.kind == DepKind::Cluster && to != from + 1 {
                return Err(SchedError::MalformedDependencyGraph {
                    reason: format!(
                        "cluster {} -> {} not contiguous in schedule",
                        unit.id.0, edge.other.0
                    ),
                });
            }
        }
    }
    Ok(())
}

/// Commit a unit order to the block: rewrite the program order and bring
/// operand kill flags back in sync with it.
pub fn commit_schedule(
    block: &mut Block,
    graph: &SchedGraph<'_>,
    order: &[UnitId],
    tri: &TargetRegisterInfo,
) {
    let new_order: Vec<InstrId> = order
        .iter()
        .flat_map(|&unit| graph.unit(unit).instrs.iter().copied())
        .collect();
    block.set_order(new_order);
    block.recompute_kill_flags(tri);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sched::builder::build_graph;
    use crate::mir::{Instruction, Opcode, Operand};
    use crate::target::x86::{self, EAX, EBX, ECX, EDX, RDI};
    use crate::target::{LatencyModel, RegisterRef};
    use bumpalo::Bump;

    const MOV: Opcode = Opcode(1);
    const ADD: Opcode = Opcode(2);
    const LOAD: Opcode = Opcode(3);
    const RET: Opcode = Opcode(5);

    fn phys(reg: crate::target::PhysReg) -> RegisterRef {
        RegisterRef::Phys(reg)
    }

    #[test]
    fn test_schedule_is_topologically_valid() {
        let tri = x86::target();
        let latency = LatencyModel::new();

        let mut block = Block::new();
        block.push(Instruction::ordinary(
            MOV,
            vec![Operand::reg_def(phys(EAX))],
        ));
        block.push(Instruction::ordinary(
            ADD,
            vec![Operand::reg_def(phys(ECX)), Operand::reg_use(phys(EAX))],
        ));
        block.push(Instruction::ordinary(
            ADD,
            vec![Operand::reg_def(phys(EDX)), Operand::reg_use(phys(ECX))],
        ));
        block.push(Instruction::terminator(RET, vec![]));

        let arena = Bump::new();
        let mut graph = build_graph(&arena, &block, &tri, &latency).unwrap();
        let order = ListScheduler::new().schedule(&mut graph).unwrap();
        verify_schedule(&graph, &order).unwrap();
        assert!(graph.units().all(|unit| unit.is_scheduled));
    }

    #[test]
    fn test_independent_units_ranked_by_height() {
        let tri = x86::target();
        let mut latency = LatencyModel::new();
        latency.set_opcode_latency(LOAD, 4);

        // The load feeds a chain, the mov feeds nothing; the load must come
        // out first even though it is later in program order.
        let mut block = Block::new();
        block.push(Instruction::ordinary(
            MOV,
            vec![Operand::reg_def(phys(EBX))],
        ));
        block.push(Instruction::ordinary(
            LOAD,
            vec![Operand::reg_def(phys(EAX)), Operand::mem(phys(RDI), 0, 4)],
        ));
        block.push(Instruction::ordinary(
            ADD,
            vec![Operand::reg_def(phys(ECX)), Operand::reg_use(phys(EAX))],
        ));

        let arena = Bump::new();
        let mut graph = build_graph(&arena, &block, &tri, &latency).unwrap();
        let order = ListScheduler::with_issue_width(1).schedule(&mut graph).unwrap();
        verify_schedule(&graph, &order).unwrap();
        assert_eq!(order[0], UnitId(1));
    }

    #[test]
    fn test_cluster_members_stay_adjacent() {
        let tri = x86::target();
        let mut latency = LatencyModel::new();
        latency.set_opcode_latency(LOAD, 4);

        let mut block = Block::new();
        block.push(Instruction::ordinary(
            LOAD,
            vec![Operand::reg_def(phys(EAX)), Operand::mem(phys(RDI), 0, 4)],
        ));
        block.push(Instruction::ordinary(
            MOV,
            vec![Operand::reg_def(phys(EBX))],
        ));
        block.push(Instruction::ordinary(
            LOAD,
            vec![Operand::reg_def(phys(ECX)), Operand::mem(phys(RDI), 4, 4)],
        ));

        let arena = Bump::new();
        let mut graph = build_graph(&arena, &block, &tri, &latency).unwrap();
        assert!(graph.has_edge(UnitId(0), UnitId(2), DepKind::Cluster));
        let order = ListScheduler::with_issue_width(1).schedule(&mut graph).unwrap();
        verify_schedule(&graph, &order).unwrap();

        let first = order.iter().position(|&u| u == UnitId(0)).unwrap();
        assert_eq!(order[first + 1], UnitId(2));
    }

    #[test]
    fn test_commit_rewrites_block_order() {
        let tri = x86::target();
        let mut latency = LatencyModel::new();
        latency.set_opcode_latency(LOAD, 4);

        let mut block = Block::new();
        let mov = block.push(Instruction::ordinary(
            MOV,
            vec![Operand::reg_def(phys(EBX))],
        ));
        let load = block.push(Instruction::ordinary(
            LOAD,
            vec![Operand::reg_def(phys(EAX)), Operand::mem(phys(RDI), 0, 4)],
        ));
        let add = block.push(Instruction::ordinary(
            ADD,
            vec![Operand::reg_def(phys(ECX)), Operand::reg_use(phys(EAX))],
        ));

        let arena = Bump::new();
        let mut graph = build_graph(&arena, &block, &tri, &latency).unwrap();
        let order = ListScheduler::with_issue_width(1).schedule(&mut graph).unwrap();
        commit_schedule(&mut block, &graph, &order, &tri);

        assert_eq!(block.order(), &[load, mov, add]);
        // eax dies at the add in this successor-less block.
        assert!(block.get(add).unwrap().operands[1].is_kill);
    }
}
