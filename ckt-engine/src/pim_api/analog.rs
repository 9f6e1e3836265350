//! Analog (Triple-Row-Activation) PIM-API C++ emitter (spec §4.7).
//!
//! `analog_pimeval_code_generator.py` in the original is an empty
//! subclass (`pass`) — the original never targeted the analog substrate
//! through this code path — so this module is grounded directly on
//! spec.md §4.7's TRA prose and on `digital.rs`'s sibling structure
//! (shared temp-packing, include-guard skeleton, sense-amplifier
//! read/write staging) rather than on a Python counterpart.
//!
//! Register storage is one `regFile` row-group plus a dual-contact
//! reference `regFileNot` exposing every register's complement for
//! free; a register is addressed as an `(object, index)` pair. Indices
//! 0-13 are the usable row-register budget (`num_regs` for analog mode
//! is capped at 14); index 14 holds the single allocated zero constant,
//! whose `regFileNot` complement at the same index stands in for the
//! one constant, so `zero`/`one` share one allocation and index 15 is
//! left reserved and unused.

use super::{distinct_temp_indices, format_operand, function_signature, sanitize_ident, temp_bit_width};
use ckt::ir::{Opcode, Sym, PIM_REGISTERS};
use ckt_gobble::PackedInstr;

/// Row-register indices `0..13` are available to the scheduler; `14`
/// and `15` are reserved for the constant row and its spare.
pub const USABLE_REGFILE_SLOTS: usize = 14;

/// The reserved `regFile` index holding the broadcast zero constant;
/// `one` is this same row read through `regFileNot`.
const ZERO_ROW_INDEX: usize = 14;

/// Emits analog PIM-API code for a packed bit-serial stream (the output
/// of `ckt-gobble`'s `pack_analog_copies`).
pub struct AnalogPimApiGenerator {
    function_name: String,
    ports: Vec<Sym>,
}

impl AnalogPimApiGenerator {
    /// Builds an emitter over the sorted, deduplicated union of a
    /// module's input and output ports.
    pub fn new(function_name: impl Into<String>, in_ports: &[Sym], out_ports: &[Sym]) -> Self {
        let mut ports: Vec<Sym> = in_ports.iter().chain(out_ports.iter()).cloned().collect();
        ports.sort();
        ports.dedup();
        AnalogPimApiGenerator { function_name: function_name.into(), ports }
    }

    /// Renders the full translation unit.
    pub fn generate(&self, stream: &[PackedInstr]) -> String {
        let first_port = self.ports.first().cloned().unwrap_or_else(|| Sym::new("io"));
        let first = sanitize_ident(first_port.as_str());

        let temp_indices = distinct_temp_indices(
            stream.iter().flat_map(|p| p.sources.iter().chain(p.destinations.iter())),
        );
        let width = temp_bit_width(temp_indices.len().max(1));
        let num_temp_objs = temp_indices.len().div_ceil(width);

        let mut out = function_signature(&self.function_name, &self.ports);
        out.push_str("{\n");
        out.push_str(&format!("\tPimObjId regFile = pimAllocAssociated({first}, PIM_INT{width});\n"));
        out.push_str("\tPimObjId regFileNot = pimCreateDualContactRef(regFile);\n");
        out.push_str("\tPimObjId scratchRow = pimAllocAssociated(regFile, PIM_INT1);\n");
        out.push_str(&format!("\tpimBroadcastUInt(regFile, {ZERO_ROW_INDEX}, 0);\n"));
        for i in 0..num_temp_objs {
            out.push_str(&format!("\tPimObjId tempObj{i} = pimAllocAssociated({first}, PIM_INT{width});\n"));
        }
        out.push_str("\n\n");

        for instr in stream {
            out.push_str(&self.instr_code(instr, &first_port, width));
        }

        out.push('\n');
        for i in 0..num_temp_objs {
            out.push_str(&format!("\tpimFree(tempObj{i});\n"));
        }
        out.push_str("\tpimFree(scratchRow);\n");
        out.push_str("\tpimFree(regFileNot);\n");
        out.push_str("\tpimFree(regFile);\n");
        out.push_str("\n}\n#endif\n\n");
        out
    }

    fn comment(&self, instr: &PackedInstr) -> String {
        let dests: Vec<&str> = instr.destinations.iter().map(Sym::as_str).collect();
        let srcs: Vec<&str> = instr.sources.iter().map(Sym::as_str).collect();
        format!(
            "\t// {} {} -> {} (Line: {})\n",
            instr.opcode.mnemonic(),
            srcs.join(", "),
            dests.join(", "),
            instr.source_line
        )
    }

    fn instr_code(&self, instr: &PackedInstr, first_port: &Sym, width: usize) -> String {
        match instr.opcode {
            Opcode::Read => self.read_code(instr, first_port, width),
            Opcode::Write => self.write_code(instr, first_port, width),
            Opcode::Zero => self.const_broadcast_code(instr, false),
            Opcode::One => self.const_broadcast_code(instr, true),
            Opcode::Copy | Opcode::Mv | Opcode::CopyInout => self.copy_code(instr),
            Opcode::Inv1 => self.inv_code(instr),
            Opcode::And2 => self.and_or_code(instr, false),
            Opcode::Or2 => self.and_or_code(instr, true),
            Opcode::Maj3 { inverted } => self.maj3_code(instr, inverted),
            other => unreachable!("{other:?} has no analog TRA expansion"),
        }
    }

    fn read_code(&self, instr: &PackedInstr, first_port: &Sym, width: usize) -> String {
        let mut code = self.comment(instr);
        let source = format_operand(&instr.sources[0], width, true);
        code.push_str(&format!("\tpimOpReadRowToSa({source});\n"));
        let dest = reg_ref(&instr.destinations[0], false);
        code.push_str(&format!("\tpimOpMove({}, PIM_RREG_SA, {dest});\n\n", sanitize_ident(first_port.as_str())));
        code
    }

    fn write_code(&self, instr: &PackedInstr, first_port: &Sym, width: usize) -> String {
        let mut code = self.comment(instr);
        let source = reg_ref(&instr.sources[0], false);
        code.push_str(&format!("\tpimOpMove({}, {source}, PIM_RREG_SA);\n", sanitize_ident(first_port.as_str())));
        let dest = format_operand(&instr.destinations[0], width, false);
        code.push_str(&format!("\tpimOpWriteSaToRow({dest});\n\n"));
        code
    }

    /// `zero`/`one` read the shared reserved constant row — complemented,
    /// through `regFileNot`, for `one` — and fan it out to every packed
    /// destination in a single AAP.
    fn const_broadcast_code(&self, instr: &PackedInstr, one: bool) -> String {
        let mut code = self.comment(instr);
        let object = if one { "regFileNot" } else { "regFile" };
        let dests: Vec<String> = instr.destinations.iter().map(|d| reg_ref(d, false)).collect();
        code.push_str(&format!(
            "\tpimOpAAP(1, {}, {object}, {ZERO_ROW_INDEX}, {});\n\n",
            instr.destinations.len(),
            dests.join(", ")
        ));
        code
    }

    fn copy_code(&self, instr: &PackedInstr) -> String {
        let mut code = self.comment(instr);
        let source = reg_ref(&instr.sources[0], false);
        let dests: Vec<String> = instr.destinations.iter().map(|d| reg_ref(d, false)).collect();
        code.push_str(&format!(
            "\tpimOpAAP(1, {}, {source}, {});\n\n",
            instr.destinations.len(),
            dests.join(", ")
        ));
        code
    }

    /// `inv1` writes its destination through the source's dual-contact
    /// complement reference — no TRA majority needed, just a single-row
    /// activate-precharge off the inverted contact.
    fn inv_code(&self, instr: &PackedInstr) -> String {
        let mut code = self.comment(instr);
        let source = reg_ref(&instr.sources[0], true);
        let dest = reg_ref(&instr.destinations[0], false);
        code.push_str(&format!("\tpimOpAAP(1, 1, {source}, {dest});\n\n"));
        code
    }

    /// `and2`/`or2` have no direct TRA primitive; they ride the
    /// three-input majority with the third operand pinned to the
    /// identity constant (`0` for AND, `1` for OR). The constant row
    /// can't be fed to the majority directly — TRA destroys every
    /// participating row, and the reserved constant must survive for
    /// the next gate — so it's refreshed into `scratchRow` first.
    fn and_or_code(&self, instr: &PackedInstr, is_or: bool) -> String {
        let mut code = self.comment(instr);
        let const_object = if is_or { "regFileNot" } else { "regFile" };
        code.push_str(&format!("\tpimOpAAP(1, 1, {const_object}, {ZERO_ROW_INDEX}, scratchRow, 0);\n"));
        let a = reg_ref(&instr.sources[0], false);
        let b = reg_ref(&instr.sources[1], false);
        let dest = reg_ref(&instr.destinations[0], false);
        code.push_str(&format!("\tpimOpAAP(3, 1, {a}, {b}, scratchRow, 0, {dest});\n\n"));
        code
    }

    /// `maj3__n<bits>`'s inversion suffix selects, per source operand,
    /// whether the majority reads through `regFile` or its dual-contact
    /// complement `regFileNot` — at no additional TRA cost.
    fn maj3_code(&self, instr: &PackedInstr, inverted: [bool; 3]) -> String {
        let mut code = self.comment(instr);
        let operands: Vec<String> =
            instr.sources.iter().zip(inverted).map(|(s, inv)| reg_ref(s, inv)).collect();
        let dest = reg_ref(&instr.destinations[0], false);
        code.push_str(&format!("\tpimOpAAP(3, 1, {}, {dest});\n\n", operands.join(", ")));
        code
    }
}

/// A named PIM register (`t0..s11`) as an `(object, index)` pair into
/// `regFile`/`regFileNot`, or a `temp<k>`/port operand via the shared
/// [`format_operand`] convention — used wherever a register vs.
/// temp/port distinction matters for analog addressing.
fn reg_ref(sym: &Sym, complement: bool) -> String {
    if let Some(idx) = PIM_REGISTERS.iter().position(|r| *r == sym.as_str()) {
        let object = if complement { "regFileNot" } else { "regFile" };
        return format!("{object}, {idx}");
    }
    let object = if complement { "regFileNot" } else { "regFile" };
    format!("{object}, {}", sanitize_ident(sym.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ckt::ir::Statement;

    fn packed(opcode: Opcode, sources: &[&str], destinations: &[&str], line: usize) -> PackedInstr {
        PackedInstr {
            opcode,
            sources: sources.iter().map(|s| Sym::new(*s)).collect(),
            destinations: destinations.iter().map(|s| Sym::new(*s)).collect(),
            source_line: line,
        }
    }

    #[test]
    fn identity_copy_emits_a_single_aap() {
        let stream = vec![packed(Opcode::Copy, &["t0"], &["t1"], 1)];
        let gen = AnalogPimApiGenerator::new("identity", &[Sym::new("a")], &[Sym::new("b")]);
        let code = gen.generate(&stream);
        assert!(code.contains("pimOpAAP(1, 1, regFile, 0, regFile, 1);"));
    }

    #[test]
    fn and2_refreshes_the_zero_constant_before_the_majority_tra() {
        let stream = vec![packed(Opcode::And2, &["t0", "t1"], &["t2"], 1)];
        let gen = AnalogPimApiGenerator::new("m", &[Sym::new("a")], &[]);
        let code = gen.generate(&stream);
        assert!(code.contains(&format!("pimOpAAP(1, 1, regFile, {ZERO_ROW_INDEX}, scratchRow, 0);")));
        assert!(code.contains("pimOpAAP(3, 1, regFile, 0, regFile, 1, scratchRow, 0, regFile, 2);"));
    }

    #[test]
    fn maj3_selects_regfilenot_for_inverted_operands() {
        let stream = vec![packed(Opcode::Maj3 { inverted: [true, false, false] }, &["t0", "t1", "t2"], &["t3"], 1)];
        let gen = AnalogPimApiGenerator::new("m", &[Sym::new("a")], &[]);
        let code = gen.generate(&stream);
        assert!(code.contains("pimOpAAP(3, 1, regFileNot, 0, regFile, 1, regFile, 2, regFile, 3);"));
    }

    #[test]
    fn zero_and_one_broadcast_to_every_packed_destination() {
        let stream = vec![packed(Opcode::Zero, &[], &["t0", "t1"], 1), packed(Opcode::One, &[], &["t2"], 2)];
        let gen = AnalogPimApiGenerator::new("m", &[Sym::new("a")], &[]);
        let code = gen.generate(&stream);
        assert!(code.contains(&format!("pimOpAAP(1, 2, regFile, {ZERO_ROW_INDEX}, regFile, 0, regFile, 1);")));
        assert!(code.contains(&format!("pimOpAAP(1, 1, regFileNot, {ZERO_ROW_INDEX}, regFile, 2);")));
    }
}
