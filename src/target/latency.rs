// Latency lookup for the dependency-graph builder: per (opcode, def-operand
// index) with a per-opcode default behind it. The builder asks with the
// exact operand index of the matched definition; a bulk clobber has no
// operand position, so it falls through to the opcode default, and an
// unmodeled opcode costs one cycle.

//! Per-opcode instruction latencies.

use crate::mir::Opcode;
use hashbrown::HashMap;

const DEFAULT_LATENCY: u32 = 1;

/// Modeled cycle counts, keyed by opcode and optionally by which def
/// operand produced the value.
#[derive(Debug, Clone, Default)]
pub struct LatencyModel {
    per_opcode: HashMap<Opcode, u32>,
    per_operand: HashMap<(Opcode, usize), u32>,
}

impl LatencyModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default latency of every def of this opcode.
    pub fn set_opcode_latency(&mut self, opcode: Opcode, cycles: u32) {
        self.per_opcode.insert(opcode, cycles);
    }

    /// Latency of one specific def operand, overriding the opcode default.
    /// A multi-result operation can make its results available in
    /// different cycles.
    pub fn set_operand_latency(&mut self, opcode: Opcode, operand_idx: usize, cycles: u32) {
        self.per_operand.insert((opcode, operand_idx), cycles);
    }

    /// Cycles until the value defined by `opcode` (through def operand
    /// `operand_idx`, when known) is available to a consumer.
    pub fn latency(&self, opcode: Opcode, operand_idx: Option<usize>) -> u32 {
        if let Some(idx) = operand_idx {
            if let Some(&cycles) = self.per_operand.get(&(opcode, idx)) {
                return cycles;
            }
        }
        self.per_opcode
            .get(&opcode)
            .copied()
            .unwrap_or(DEFAULT_LATENCY)
    }
}
