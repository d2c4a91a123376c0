// This module implements machine copy propagation: a forward per-block
// dataflow walk over the scheduled instruction stream that deletes
// register-to-register copies proven redundant. The tracker keeps three maps
// plus the candidate set, all keyed by physical register and maintained over
// alias closures. avail surviving for a register proves neither the copy's
// destination nor its source has been clobbered since, which is what makes
// the reverse-copy check sufficient for nop elimination. Cross-block state
// is deliberately not kept: live-in lists are not trusted, so candidates are
// only deleted when the block has no successors and every map resets at
// block entry. Virtual-register copies are outside the model and are
// processed like ordinary instructions.

//! Redundant-copy elimination over the scheduled linear order.

use crate::mir::{Block, Function, InstrId, Instruction};
use crate::target::{PhysReg, RegMask, RegisterRef, TargetRegisterInfo};
use hashbrown::{HashMap, HashSet};
use log::{debug, trace};

/// Why a copy was deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElimReason {
    /// Copied back a value an earlier, still-valid copy established in the
    /// reverse direction.
    NopCopy,
    /// Destination clobbered by a register mask before any read.
    ClobberedBeforeUse,
    /// Destination never read and the block has no successors.
    DeadAtBlockEnd,
}

/// Per-run elimination counts, broken down by reason.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CopyPropStats {
    pub nop_copies: u32,
    pub clobbered_before_use: u32,
    pub dead_at_block_end: u32,
}

impl CopyPropStats {
    pub fn total(&self) -> u32 {
        self.nop_copies + self.clobbered_before_use + self.dead_at_block_end
    }

    pub fn merge(&mut self, other: CopyPropStats) {
        self.nop_copies += other.nop_copies;
        self.clobbered_before_use += other.clobbered_before_use;
        self.dead_at_block_end += other.dead_at_block_end;
    }

    fn record(&mut self, reason: ElimReason) {
        match reason {
            ElimReason::NopCopy => self.nop_copies += 1,
            ElimReason::ClobberedBeforeUse => self.clobbered_before_use += 1,
            ElimReason::DeadAtBlockEnd => self.dead_at_block_end += 1,
        }
    }
}

/// Dataflow state for one block. Reset at block entry; never shared.
#[derive(Default)]
struct CopyTracker {
    /// Most recent copy whose destination still holds its copied value,
    /// unclobbered since. Keyed over every alias of the destination.
    avail: HashMap<PhysReg, InstrId>,
    /// Most recent copy that defined the register, available or not. Keyed
    /// over every alias of the destination.
    last_copy: HashMap<PhysReg, InstrId>,
    /// Destinations currently holding a copy of this source register.
    sources: HashMap<PhysReg, Vec<PhysReg>>,
    /// Copies whose destination has not been read since they executed.
    maybe_dead: HashSet<InstrId>,
}

impl CopyTracker {
    /// The register is overwritten: drop every tracked copy it invalidates.
    /// Copies sourced from an overlapping register lose their availability
    /// through `sources`; their `last_copy` entries stay so a later read can
    /// still rescue them from the candidate set.
    fn clobber(&mut self, tri: &TargetRegisterInfo, reg: PhysReg) {
        for &alias in tri.aliases_of_phys(reg) {
            self.avail.remove(&alias);
            self.last_copy.remove(&alias);
            if let Some(dests) = self.sources.remove(&alias) {
                for dest in dests {
                    for &dest_alias in tri.aliases_of_phys(dest) {
                        self.avail.remove(&dest_alias);
                    }
                }
            }
        }
    }

    /// A register is read: any copy that last defined an overlapping
    /// register is observably used and no longer a deletion candidate.
    fn read(&mut self, tri: &TargetRegisterInfo, reg: PhysReg) {
        for alias in tri.aliases_of_phys(reg) {
            if let Some(copy) = self.last_copy.get(alias) {
                self.maybe_dead.remove(copy);
            }
        }
    }

    /// Record a committed copy `dst = src` as the newest definition of every
    /// alias of `dst`.
    fn track_copy(&mut self, tri: &TargetRegisterInfo, id: InstrId, dst: PhysReg, src: PhysReg) {
        for &alias in tri.aliases_of_phys(dst) {
            self.avail.insert(alias, id);
            self.last_copy.insert(alias, id);
        }
        self.sources.entry(src).or_default().push(dst);
    }
}

/// Run copy propagation over every block of a function.
pub fn propagate_function(function: &mut Function, tri: &TargetRegisterInfo) -> CopyPropStats {
    let mut stats = CopyPropStats::default();
    for block in &mut function.blocks {
        stats.merge(propagate_block(block, tri));
    }
    stats
}

/// Run copy propagation over one block. Pure optimization: the worst case
/// is zero eliminations, never an error.
pub fn propagate_block(block: &mut Block, tri: &TargetRegisterInfo) -> CopyPropStats {
    let mut tracker = CopyTracker::default();
    let mut stats = CopyPropStats::default();

    let order: Vec<InstrId> = block.order().to_vec();
    for id in order {
        let Some(instr) = block.get(id).cloned() else {
            continue;
        };

        if let Some((RegisterRef::Phys(dst), RegisterRef::Phys(src))) = instr.copy_operands() {
            if try_erase_nop_copy(block, tri, &tracker, id, dst, src) {
                stats.record(ElimReason::NopCopy);
                continue;
            }

            // Reading the source proves whichever copy last defined it is
            // observably used.
            tracker.read(tri, src);
            if !tri.is_reserved(dst) {
                tracker.maybe_dead.insert(id);
            }
            tracker.clobber(tri, dst);
            tracker.track_copy(tri, id, dst, src);
            continue;
        }

        process_generic(block, tri, &mut tracker, &mut stats, &instr);
    }

    // A block control flow never leaves proves its unread copies dead.
    // Anything else might be live-out; live-in lists are not trusted.
    if !block.has_successors() {
        let order: Vec<InstrId> = block.order().to_vec();
        for id in order {
            if tracker.maybe_dead.contains(&id) {
                erase(block, tri, id, ElimReason::DeadAtBlockEnd);
                stats.record(ElimReason::DeadAtBlockEnd);
            }
        }
    }

    if stats.total() > 0 {
        debug!(
            "copy propagation removed {} copies ({} nop, {} clobbered, {} dead at exit)",
            stats.total(),
            stats.nop_copies,
            stats.clobbered_before_use,
            stats.dead_at_block_end
        );
    }
    stats
}

/// `dst = COPY src` where an available copy `src = COPY dst` still holds:
/// the value is already in place. Kill flags on `dst` between the two are
/// cleared so the earlier value's live range covers the gap, then the copy
/// is deleted.
fn try_erase_nop_copy(
    block: &mut Block,
    tri: &TargetRegisterInfo,
    tracker: &CopyTracker,
    id: InstrId,
    dst: PhysReg,
    src: PhysReg,
) -> bool {
    if tri.is_reserved(dst) {
        return false;
    }
    let Some(&prev_id) = tracker.avail.get(&src) else {
        return false;
    };
    let Some(prev) = block.get(prev_id) else {
        return false;
    };
    let inverse = Some((RegisterRef::Phys(src), RegisterRef::Phys(dst)));
    if prev.copy_operands() != inverse {
        return false;
    }

    // avail[src] surviving means neither src nor dst was clobbered since
    // prev: a clobber of src drops the entry directly, a clobber of dst
    // drops it through sources. The reverse copy is therefore a nop.
    let from = block
        .position_of(prev_id)
        .expect("available copy is in the block");
    let to = block.position_of(id).expect("current instruction is in the block");
    let span: Vec<InstrId> = block.order()[from..to].to_vec();
    for gap_id in span {
        let Some(gap) = block.get_mut(gap_id) else {
            continue;
        };
        for op in &mut gap.operands {
            if op.is_def || !op.is_kill {
                continue;
            }
            if let Some(RegisterRef::Phys(reg)) = op.reg() {
                if tri.overlaps_phys(reg, dst) {
                    op.is_kill = false;
                }
            }
        }
    }

    erase(block, tri, id, ElimReason::NopCopy);
    true
}

fn process_generic(
    block: &mut Block,
    tri: &TargetRegisterInfo,
    tracker: &mut CopyTracker,
    stats: &mut CopyPropStats,
    instr: &Instruction,
) {
    // Undef reads count as reads here (the copy's result is named) though
    // they never carry kills.
    for (reg, _undef) in instr.reg_reads() {
        if let RegisterRef::Phys(reg) = reg {
            tracker.read(tri, reg);
        }
    }

    for (_, reg) in instr.reg_defs() {
        if let RegisterRef::Phys(reg) = reg {
            tracker.clobber(tri, reg);
        }
    }

    if let Some(mask) = &instr.reg_mask {
        apply_reg_mask(block, tri, tracker, stats, mask);
    }
}

/// A bulk clobber destroys any candidate copy whose destination it covers
/// before that copy was read: those are deleted on the spot. The candidate
/// set is then cleared and all tracked state for mask-covered registers
/// purged.
fn apply_reg_mask(
    block: &mut Block,
    tri: &TargetRegisterInfo,
    tracker: &mut CopyTracker,
    stats: &mut CopyPropStats,
    mask: &RegMask,
) {
    let candidates: Vec<InstrId> = block
        .order()
        .iter()
        .copied()
        .filter(|id| tracker.maybe_dead.contains(id))
        .collect();
    for id in candidates {
        let Some(instr) = block.get(id) else { continue };
        let Some((RegisterRef::Phys(dst), _)) = instr.copy_operands() else {
            continue;
        };
        if mask.clobbers(dst) {
            erase(block, tri, id, ElimReason::ClobberedBeforeUse);
            stats.record(ElimReason::ClobberedBeforeUse);
        }
    }
    tracker.maybe_dead.clear();

    for idx in 0..tri.num_regs() {
        let reg = PhysReg(idx as u16);
        if mask.clobbers(reg) {
            tracker.clobber(tri, reg);
        }
    }
}

fn erase(block: &mut Block, tri: &TargetRegisterInfo, id: InstrId, reason: ElimReason) {
    if let Some(instr) = block.remove(id) {
        if let Some((RegisterRef::Phys(dst), RegisterRef::Phys(src))) = instr.copy_operands() {
            trace!(
                "erased copy {} = {} ({:?})",
                tri.name(dst),
                tri.name(src),
                reason
            );
        }
    }
}
