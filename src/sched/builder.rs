// This module converts one basic block into a SchedUnit graph. The walk is
// strictly program order: glued instructions fold into the unit of their
// predecessor, a live-definition map (expanded over register alias closures)
// yields Data edges with modeled latency, side-effecting instructions chain
// through Order edges, and the terminator collects an exit barrier so nothing
// drifts past the end of the block. Anti and output dependencies are not
// modeled here; they are the register allocator's concern. Because units are
// numbered in program order, every legitimate edge runs from a lower id to a
// higher one, which doubles as a cheap cycle guard on insertion; a full
// acyclicity verification still runs before the graph is handed out.

//! Dependency graph construction.

use super::graph::{DepKind, SchedGraph, UnitId};
use crate::error::{SchedError, SchedResult};
use crate::mir::{Block, Opcode};
use crate::target::{LatencyModel, PhysReg, RegisterRef, TargetRegisterInfo, VirtReg};
use bumpalo::Bump;
use hashbrown::HashMap;
use log::{debug, trace};

/// Which unit last defined a register, and through which def operand.
#[derive(Debug, Clone, Copy)]
struct DefRecord {
    unit: UnitId,
    opcode: Opcode,
    /// Def operand position within the defining instruction. `None` for
    /// bulk clobbers, where only the opcode's generic latency applies.
    operand_idx: Option<usize>,
}

/// Insert an edge between distinct units, rejecting anything that runs
/// against program order. Units are created in program order, so an edge
/// from a higher id to a lower one could only close a cycle.
fn add_dep(
    graph: &mut SchedGraph<'_>,
    from: UnitId,
    to: UnitId,
    kind: DepKind,
    latency: u32,
) -> SchedResult<()> {
    if from == to {
        // Intra-cluster dependency; members already retire together.
        return Ok(());
    }
    if from > to {
        return Err(SchedError::MalformedDependencyGraph {
            reason: format!("edge {} -> {} runs against program order", from.0, to.0),
        });
    }
    graph.add_edge(from, to, kind, latency)
}

/// Build the dependency graph for one block.
pub fn build_graph<'g>(
    arena: &'g Bump,
    block: &Block,
    tri: &TargetRegisterInfo,
    latency: &LatencyModel,
) -> SchedResult<SchedGraph<'g>> {
    let mut graph = SchedGraph::new(arena);

    let mut phys_defs: HashMap<PhysReg, DefRecord> = HashMap::new();
    let mut virt_defs: HashMap<VirtReg, DefRecord> = HashMap::new();
    let mut last_side_effect: Option<UnitId> = None;
    let mut current_unit: Option<UnitId> = None;
    let mut terminator_unit: Option<UnitId> = None;
    // Candidate loads for cluster formation: (unit, base, offset, width).
    let mut loads: Vec<(UnitId, RegisterRef, i64, u8)> = Vec::new();

    for (id, instr) in block.iter() {
        let instr_latency = latency.latency(instr.opcode, None);
        let num_defs = instr.num_reg_defs();

        let unit = match current_unit {
            Some(unit) if instr.glued_to_prev => {
                graph.append_to_unit(unit, id, instr_latency, num_defs);
                unit
            }
            _ => graph.add_unit(id, instr_latency, num_defs),
        };
        current_unit = Some(unit);

        // Reads first: they see definitions from strictly earlier
        // instructions, not this one's own defs.
        for (reg, _undef) in instr.reg_reads() {
            match reg {
                RegisterRef::Phys(r) => {
                    for &alias in tri.aliases_of_phys(r) {
                        if let Some(rec) = phys_defs.get(&alias) {
                            let cycles = latency.latency(rec.opcode, rec.operand_idx);
                            trace!(
                                "data dep {} -> {} on {} ({} cycles)",
                                rec.unit.0,
                                unit.0,
                                tri.name(alias),
                                cycles
                            );
                            add_dep(&mut graph, rec.unit, unit, DepKind::Data, cycles)?;
                        }
                    }
                }
                RegisterRef::Virt(v) => {
                    if let Some(rec) = virt_defs.get(&v) {
                        let cycles = latency.latency(rec.opcode, rec.operand_idx);
                        add_dep(&mut graph, rec.unit, unit, DepKind::Data, cycles)?;
                    }
                }
            }
        }

        // Bulk clobbers before explicit defs: a call's return-value def must
        // win over its own mask for later readers.
        if let Some(mask) = &instr.reg_mask {
            for idx in 0..tri.num_regs() {
                let reg = PhysReg(idx as u16);
                if mask.clobbers(reg) {
                    phys_defs.insert(
                        reg,
                        DefRecord {
                            unit,
                            opcode: instr.opcode,
                            operand_idx: None,
                        },
                    );
                }
            }
        }

        for (idx, reg) in instr.reg_defs() {
            let rec = DefRecord {
                unit,
                opcode: instr.opcode,
                operand_idx: Some(idx),
            };
            match reg {
                RegisterRef::Phys(r) => {
                    for &alias in tri.aliases_of_phys(r) {
                        phys_defs.insert(alias, rec);
                    }
                }
                RegisterRef::Virt(v) => {
                    virt_defs.insert(v, rec);
                }
            }
        }

        if instr.has_side_effects {
            if let Some(prev) = last_side_effect {
                add_dep(&mut graph, prev, unit, DepKind::Order, 0)?;
            }
            last_side_effect = Some(unit);
        }

        if instr.is_terminator() {
            terminator_unit = Some(unit);
        }

        if !instr.has_side_effects && num_defs > 0 {
            if let Some(mem) = instr.operands.iter().find_map(|op| {
                if op.is_def {
                    None
                } else {
                    op.mem_ref()
                }
            }) {
                loads.push((unit, mem.base, mem.offset, mem.width));
            }
        }
    }

    // Exit barrier: nothing may drift past the terminator.
    if let Some(term) = terminator_unit {
        for idx in 0..term.0 {
            let unit = UnitId(idx);
            if graph.unit(unit).succs.is_empty() {
                add_dep(&mut graph, unit, term, DepKind::Order, 0)?;
            }
        }
    }

    cluster_adjacent_loads(&mut graph, &loads)?;

    graph.verify()?;
    debug!(
        "built {} scheduling units for block of {} instructions",
        graph.num_units(),
        block.len()
    );
    Ok(graph)
}

/// Cluster loads off the same base register at provably adjacent offsets.
/// Purely a locality heuristic: the merge is skipped whenever the two units
/// are already ordered either way, so it can neither close a cycle nor force
/// an impossible contiguous placement.
fn cluster_adjacent_loads(
    graph: &mut SchedGraph<'_>,
    loads: &[(UnitId, RegisterRef, i64, u8)],
) -> SchedResult<()> {
    for window in loads.windows(2) {
        let (first, first_base, first_off, first_width) = window[0];
        let (second, second_base, second_off, _) = window[1];
        if first_base != second_base {
            continue;
        }
        if second_off != first_off + i64::from(first_width) {
            continue;
        }
        if graph.reaches(first, second) || graph.reaches(second, first) {
            continue;
        }
        trace!("clustering adjacent loads {} and {}", first.0, second.0);
        graph.add_edge(first, second, DepKind::Cluster, 0)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mir::{Block, Instruction, Opcode, Operand};
    use crate::target::x86::{self, EAX, EBX, ECX, EDX, RDI};
    use crate::target::{RegMask, RegisterRef};

    const MOV: Opcode = Opcode(1);
    const ADD: Opcode = Opcode(2);
    const LOAD: Opcode = Opcode(3);
    const STORE: Opcode = Opcode(4);
    const RET: Opcode = Opcode(5);
    const MUL: Opcode = Opcode(6);

    fn phys(reg: crate::target::PhysReg) -> RegisterRef {
        RegisterRef::Phys(reg)
    }

    #[test]
    fn test_data_edge_carries_modeled_latency() {
        let tri = x86::target();
        let mut latency = LatencyModel::new();
        latency.set_opcode_latency(MUL, 3);

        let mut block = Block::new();
        block.push(Instruction::ordinary(
            MUL,
            vec![Operand::reg_def(phys(EAX)), Operand::reg_use(phys(ECX))],
        ));
        block.push(Instruction::ordinary(
            ADD,
            vec![Operand::reg_def(phys(EBX)), Operand::reg_use(phys(EAX))],
        ));

        let arena = Bump::new();
        let graph = build_graph(&arena, &block, &tri, &latency).unwrap();
        assert_eq!(graph.num_units(), 2);
        let edge = graph.unit(UnitId(0)).succs[0];
        assert_eq!(edge.other, UnitId(1));
        assert_eq!(edge.kind, DepKind::Data);
        assert_eq!(edge.latency, 3);
    }

    #[test]
    fn test_subregister_def_feeds_superregister_read() {
        let tri = x86::target();
        let latency = LatencyModel::new();

        let mut block = Block::new();
        block.push(Instruction::ordinary(
            MOV,
            vec![Operand::reg_def(phys(x86::AX))],
        ));
        block.push(Instruction::ordinary(
            ADD,
            vec![Operand::reg_def(phys(EBX)), Operand::reg_use(phys(EAX))],
        ));

        let arena = Bump::new();
        let graph = build_graph(&arena, &block, &tri, &latency).unwrap();
        assert!(graph.has_edge(UnitId(0), UnitId(1), DepKind::Data));
    }

    #[test]
    fn test_side_effects_chain_in_order() {
        let tri = x86::target();
        let latency = LatencyModel::new();

        let mut block = Block::new();
        block.push(
            Instruction::ordinary(STORE, vec![Operand::mem(phys(RDI), 0, 4)])
                .with_side_effects(),
        );
        block.push(Instruction::ordinary(
            ADD,
            vec![Operand::reg_def(phys(EAX)), Operand::reg_use(phys(ECX))],
        ));
        block.push(
            Instruction::ordinary(STORE, vec![Operand::mem(phys(RDI), 8, 4)])
                .with_side_effects(),
        );

        let arena = Bump::new();
        let graph = build_graph(&arena, &block, &tri, &latency).unwrap();
        assert!(graph.has_edge(UnitId(0), UnitId(2), DepKind::Order));
        assert!(!graph.has_edge(UnitId(0), UnitId(1), DepKind::Order));
    }

    #[test]
    fn test_glued_instructions_share_a_unit() {
        let tri = x86::target();
        let latency = LatencyModel::new();

        let mut block = Block::new();
        block.push(Instruction::ordinary(
            MUL,
            vec![Operand::reg_def(phys(EAX)), Operand::reg_use(phys(ECX))],
        ));
        block.push(
            Instruction::ordinary(
                MOV,
                vec![Operand::reg_def(phys(EDX)), Operand::reg_use(phys(EAX))],
            )
            .glued(),
        );

        let arena = Bump::new();
        let graph = build_graph(&arena, &block, &tri, &latency).unwrap();
        assert_eq!(graph.num_units(), 1);
        assert_eq!(graph.unit(UnitId(0)).instrs.len(), 2);
        assert_eq!(graph.unit(UnitId(0)).num_defs, 2);
    }

    #[test]
    fn test_terminator_collects_exit_barrier() {
        let tri = x86::target();
        let latency = LatencyModel::new();

        let mut block = Block::new();
        block.push(Instruction::ordinary(
            MOV,
            vec![Operand::reg_def(phys(EAX))],
        ));
        block.push(Instruction::ordinary(
            MOV,
            vec![Operand::reg_def(phys(ECX))],
        ));
        block.push(Instruction::terminator(RET, vec![]));

        let arena = Bump::new();
        let graph = build_graph(&arena, &block, &tri, &latency).unwrap();
        assert!(graph.has_edge(UnitId(0), UnitId(2), DepKind::Order));
        assert!(graph.has_edge(UnitId(1), UnitId(2), DepKind::Order));
    }

    #[test]
    fn test_adjacent_loads_cluster() {
        let tri = x86::target();
        let latency = LatencyModel::new();

        let mut block = Block::new();
        block.push(Instruction::ordinary(
            LOAD,
            vec![Operand::reg_def(phys(EAX)), Operand::mem(phys(RDI), 0, 4)],
        ));
        block.push(Instruction::ordinary(
            LOAD,
            vec![Operand::reg_def(phys(ECX)), Operand::mem(phys(RDI), 4, 4)],
        ));
        block.push(Instruction::ordinary(
            LOAD,
            vec![Operand::reg_def(phys(EDX)), Operand::mem(phys(RDI), 16, 4)],
        ));

        let arena = Bump::new();
        let graph = build_graph(&arena, &block, &tri, &latency).unwrap();
        assert!(graph.has_edge(UnitId(0), UnitId(1), DepKind::Cluster));
        assert!(!graph.has_edge(UnitId(1), UnitId(2), DepKind::Cluster));
    }

    #[test]
    fn test_dependent_loads_do_not_cluster() {
        let tri = x86::target();
        let latency = LatencyModel::new();

        // Second load's base is the first load's result: already ordered,
        // the heuristic must stay out.
        let mut block = Block::new();
        block.push(Instruction::ordinary(
            LOAD,
            vec![Operand::reg_def(phys(RDI)), Operand::mem(phys(RDI), 0, 8)],
        ));
        block.push(Instruction::ordinary(
            LOAD,
            vec![Operand::reg_def(phys(EAX)), Operand::mem(phys(RDI), 8, 8)],
        ));

        let arena = Bump::new();
        let graph = build_graph(&arena, &block, &tri, &latency).unwrap();
        assert!(!graph.has_edge(UnitId(0), UnitId(1), DepKind::Cluster));
        assert!(graph.has_edge(UnitId(0), UnitId(1), DepKind::Data));
    }

    #[test]
    fn test_mask_clobber_orders_later_reader() {
        let tri = x86::target();
        let latency = LatencyModel::new();

        let mut block = Block::new();
        block.push(Instruction::call(
            Opcode(9),
            vec![],
            Some(RegMask::clobber_all(&tri)),
        ));
        block.push(Instruction::ordinary(
            ADD,
            vec![Operand::reg_def(phys(EBX)), Operand::reg_use(phys(EAX))],
        ));

        let arena = Bump::new();
        let graph = build_graph(&arena, &block, &tri, &latency).unwrap();
        assert!(graph.has_edge(UnitId(0), UnitId(1), DepKind::Data));
    }
}
