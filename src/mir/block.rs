// This module implements the basic-block container: a generation-tagged slot
// arena for instructions plus the program-order list. The source keyed its
// per-pass maps by raw instruction pointers; here every instruction has a
// stable InstrId (slot index + generation) that stays valid as the block is
// reordered and survives as a safely-dangling key when the instruction is
// deleted mid-pass. A freed slot bumps its generation, so a stale id resolves
// to None instead of aliasing whatever reuses the slot.

//! Basic blocks, functions, and kill-flag maintenance.

use super::inst::Instruction;
use super::operand::OperandKind;
use crate::target::{PhysReg, RegisterRef, TargetRegisterInfo, VirtReg};
use hashbrown::HashSet;

/// Index of a block within its function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub u32);

/// Stable, generation-tagged handle to an instruction in a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstrId {
    index: u32,
    generation: u32,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    instr: Option<Instruction>,
}

/// A basic block: instruction arena plus program order.
///
/// The program order is a separate list of ids so the scheduler can commit a
/// permutation without moving instruction storage.
#[derive(Debug, Default)]
pub struct Block {
    slots: Vec<Slot>,
    free: Vec<u32>,
    order: Vec<InstrId>,
    succs: Vec<BlockId>,
}

impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an instruction at the end of the program order.
    pub fn push(&mut self, instr: Instruction) -> InstrId {
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.instr = Some(instr);
                InstrId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    instr: Some(instr),
                });
                InstrId {
                    index,
                    generation: 0,
                }
            }
        };
        self.order.push(id);
        id
    }

    /// Resolve an id, failing on stale generations.
    pub fn get(&self, id: InstrId) -> Option<&Instruction> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.instr.as_ref()
    }

    pub fn get_mut(&mut self, id: InstrId) -> Option<&mut Instruction> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.instr.as_mut()
    }

    /// Delete an instruction: the slot is marked free with a bumped
    /// generation and the id disappears from the program order. Stale ids
    /// held by passes resolve to `None` from now on.
    pub fn remove(&mut self, id: InstrId) -> Option<Instruction> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let instr = slot.instr.take()?;
        slot.generation += 1;
        self.free.push(id.index);
        self.order.retain(|&other| other != id);
        Some(instr)
    }

    /// Current program order.
    pub fn order(&self) -> &[InstrId] {
        &self.order
    }

    /// Commit a new program order. Must be a permutation of the current one.
    pub fn set_order(&mut self, order: Vec<InstrId>) {
        debug_assert_eq!(order.len(), self.order.len());
        debug_assert!(order.iter().all(|&id| self.get(id).is_some()));
        self.order = order;
    }

    /// Position of an instruction in the program order.
    pub fn position_of(&self, id: InstrId) -> Option<usize> {
        self.order.iter().position(|&other| other == id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Instructions in program order with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (InstrId, &Instruction)> + '_ {
        self.order.iter().filter_map(move |&id| {
            self.get(id).map(|instr| (id, instr))
        })
    }

    pub fn add_successor(&mut self, succ: BlockId) {
        if !self.succs.contains(&succ) {
            self.succs.push(succ);
        }
    }

    pub fn successors(&self) -> &[BlockId] {
        &self.succs
    }

    /// Does control flow leave this block?
    pub fn has_successors(&self) -> bool {
        !self.succs.is_empty()
    }

    /// Recompute operand kill flags to match the current program order.
    ///
    /// Backward walk tracking which registers may still be read later. A use
    /// is a kill only when no alias is read again before being fully
    /// redefined and the block cannot fall through to a successor that might
    /// read it. Undef reads and memory base registers never carry kills;
    /// marking a flag false is always safe, so the walk only asserts kills it
    /// can prove.
    pub fn recompute_kill_flags(&mut self, tri: &TargetRegisterInfo) {
        let live_out = self.has_successors();
        let mut live_phys: HashSet<PhysReg> = HashSet::new();
        let mut live_virt: HashSet<VirtReg> = HashSet::new();

        for pos in (0..self.order.len()).rev() {
            let id = self.order[pos];
            let Some(instr) = self.get(id) else { continue };

            // Decide kills against the state below this instruction.
            let mut kills: Vec<(usize, bool)> = Vec::new();
            for (idx, op) in instr.operands.iter().enumerate() {
                if op.is_def {
                    continue;
                }
                let OperandKind::Reg(reg) = op.kind else {
                    if op.reg().is_some() {
                        kills.push((idx, false));
                    }
                    continue;
                };
                let kill = if op.is_undef || live_out {
                    false
                } else {
                    match reg {
                        RegisterRef::Phys(r) => !tri
                            .aliases_of_phys(r)
                            .iter()
                            .any(|alias| live_phys.contains(alias)),
                        RegisterRef::Virt(v) => !live_virt.contains(&v),
                    }
                };
                kills.push((idx, kill));
            }

            // Defs overwrite: drop every register the def fully covers.
            let defs: Vec<RegisterRef> = instr.reg_defs().map(|(_, reg)| reg).collect();
            let mask = instr.reg_mask.clone();
            let reads: Vec<(RegisterRef, bool)> = instr.reg_reads().collect();

            for def in defs {
                match def {
                    RegisterRef::Phys(d) => {
                        live_phys.retain(|&r| !tri.covers(d, r));
                    }
                    RegisterRef::Virt(v) => {
                        live_virt.remove(&v);
                    }
                }
            }
            if let Some(mask) = &mask {
                live_phys.retain(|&r| !mask.clobbers(r));
            }
            for (reg, undef) in reads {
                if undef {
                    continue;
                }
                match reg {
                    RegisterRef::Phys(r) => {
                        live_phys.extend(tri.aliases_of_phys(r).iter().copied());
                    }
                    RegisterRef::Virt(v) => {
                        live_virt.insert(v);
                    }
                }
            }

            let instr = self.get_mut(id).expect("id resolved above");
            for (idx, kill) in kills {
                instr.operands[idx].is_kill = kill;
            }
        }
    }
}

/// A function: blocks in layout order.
#[derive(Debug, Default)]
pub struct Function {
    pub blocks: Vec<Block>,
}

impl Function {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_block(&mut self, block: Block) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(block);
        id
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0 as usize]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[id.0 as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mir::{Instruction, Opcode, Operand};
    use crate::target::x86::{self, EAX, ECX};
    use crate::target::RegisterRef;

    const NOP: Opcode = Opcode(0);
    const ADD: Opcode = Opcode(1);

    fn phys(reg: crate::target::PhysReg) -> RegisterRef {
        RegisterRef::Phys(reg)
    }

    #[test]
    fn test_stale_id_after_removal() {
        let mut block = Block::new();
        let a = block.push(Instruction::ordinary(NOP, vec![]));
        let b = block.push(Instruction::ordinary(NOP, vec![]));

        assert!(block.get(a).is_some());
        block.remove(a);
        assert!(block.get(a).is_none());
        assert_eq!(block.order(), &[b]);

        // Slot reuse hands out a fresh generation; the stale id stays dead.
        let c = block.push(Instruction::ordinary(ADD, vec![]));
        assert!(block.get(a).is_none());
        assert!(block.get(c).is_some());
        assert_ne!(a, c);
    }

    #[test]
    fn test_set_order_permutes_program_order() {
        let mut block = Block::new();
        let a = block.push(Instruction::ordinary(NOP, vec![]));
        let b = block.push(Instruction::ordinary(ADD, vec![]));
        block.set_order(vec![b, a]);
        assert_eq!(block.order(), &[b, a]);
        assert_eq!(block.position_of(a), Some(1));
    }

    #[test]
    fn test_kill_flags_in_successorless_block() {
        let tri = x86::target();
        let mut block = Block::new();
        // eax = ...; ecx = add eax, eax; (eax dies at the add)
        block.push(Instruction::ordinary(NOP, vec![Operand::reg_def(phys(EAX))]));
        let add = block.push(Instruction::ordinary(
            ADD,
            vec![
                Operand::reg_def(phys(ECX)),
                Operand::reg_use(phys(EAX)),
                Operand::reg_use(phys(EAX)),
            ],
        ));
        block.recompute_kill_flags(&tri);
        let instr = block.get(add).unwrap();
        assert!(instr.operands[1].is_kill);
        assert!(instr.operands[2].is_kill);
    }

    #[test]
    fn test_no_kills_when_block_has_successors() {
        let tri = x86::target();
        let mut block = Block::new();
        block.add_successor(BlockId(1));
        block.push(Instruction::ordinary(NOP, vec![Operand::reg_def(phys(EAX))]));
        let add = block.push(Instruction::ordinary(
            ADD,
            vec![Operand::reg_def(phys(ECX)), Operand::reg_use(phys(EAX))],
        ));
        block.recompute_kill_flags(&tri);
        assert!(!block.get(add).unwrap().operands[1].is_kill);
    }

    #[test]
    fn test_use_before_later_read_is_not_a_kill() {
        let tri = x86::target();
        let mut block = Block::new();
        block.push(Instruction::ordinary(NOP, vec![Operand::reg_def(phys(EAX))]));
        let first = block.push(Instruction::ordinary(
            ADD,
            vec![Operand::reg_def(phys(ECX)), Operand::reg_use(phys(EAX))],
        ));
        let second = block.push(Instruction::ordinary(
            ADD,
            vec![Operand::reg_def(phys(ECX)), Operand::reg_use(phys(EAX))],
        ));
        block.recompute_kill_flags(&tri);
        assert!(!block.get(first).unwrap().operands[1].is_kill);
        assert!(block.get(second).unwrap().operands[1].is_kill);
    }
}
