//! Digital PIM-API C++ emitter (spec §4.7): translates the optimized
//! bit-serial statement stream into `libpimeval.h` calls against the
//! nineteen named row registers (`PIM_RREG_R1..R19`).
//!
//! Grounded on
//! `original_source/src/asm-parser/digital_pimeval_code_generator.py`'s
//! `PimEvalAPIDigitalCodeGenerator`: the register/opcode maps, the
//! sense-amplifier staging `read`/`write` expand into, and the
//! `tempObjN`-bit-packed representation of any surviving spill temp.

use super::{distinct_temp_indices, format_operand, function_signature, pim_rreg_name, sanitize_ident, temp_bit_width};
use ckt::ir::{LinkedInstruction, Opcode, Statement, Sym};

/// Emits digital PIM-API code for an optimized bit-serial stream (the
/// output of `ckt-gobble`'s `shrink_temp_variables` ->
/// `remove_redundant_copies` -> `simplify_port_spills` pipeline).
pub struct DigitalPimApiGenerator {
    function_name: String,
    ports: Vec<Sym>,
}

impl DigitalPimApiGenerator {
    /// Builds an emitter over the sorted, deduplicated union of a
    /// module's input and output ports (`sorted(list(ports))` in the
    /// original).
    pub fn new(function_name: impl Into<String>, in_ports: &[Sym], out_ports: &[Sym]) -> Self {
        let mut ports: Vec<Sym> = in_ports.iter().chain(out_ports.iter()).cloned().collect();
        ports.sort();
        ports.dedup();
        DigitalPimApiGenerator { function_name: function_name.into(), ports }
    }

    /// Renders the full translation unit.
    pub fn generate(&self, stream: &[LinkedInstruction]) -> String {
        let first_port = self.ports.first().cloned().unwrap_or_else(|| Sym::new("io"));
        let temp_indices = distinct_temp_indices(stream.iter().flat_map(|i| i.statement.operands.iter()));
        let width = temp_bit_width(temp_indices.len().max(1));
        let num_temp_objs = temp_indices.len().div_ceil(width);

        let mut out = function_signature(&self.function_name, &self.ports);
        out.push_str("{\n");
        for i in 0..num_temp_objs {
            out.push_str(&format!(
                "\tPimObjId tempObj{i} = pimAllocAssociated({}, PIM_INT{width});\n",
                sanitize_ident(first_port.as_str())
            ));
        }
        out.push_str("\n\n");
        for instr in stream {
            out.push_str(&self.statement_code(&instr.statement, &first_port, width));
        }
        out.push('\n');
        for i in 0..num_temp_objs {
            out.push_str(&format!("\tpimFree(tempObj{i});\n"));
        }
        out.push_str("\n}\n#endif\n\n");
        out
    }

    fn statement_code(&self, stmt: &Statement, first_port: &Sym, width: usize) -> String {
        match stmt.opcode {
            Opcode::Read => self.read_code(stmt, first_port, width),
            Opcode::Write => self.write_code(stmt, first_port, width),
            Opcode::Zero => self.set_code(stmt, first_port, false),
            Opcode::One => self.set_code(stmt, first_port, true),
            _ => self.logic_code(stmt, first_port),
        }
    }

    fn comment(&self, stmt: &Statement) -> String {
        let operands: Vec<&str> = stmt.operands.iter().map(Sym::as_str).collect();
        format!("\t// {} {} (Line: {})\n", stmt.opcode.mnemonic(), operands.join(", "), stmt.source_line)
    }

    fn read_code(&self, stmt: &Statement, first_port: &Sym, width: usize) -> String {
        let mut code = self.comment(stmt);
        let source = format_operand(&stmt.sources()[0], width, true);
        code.push_str(&format!("\tpimOpReadRowToSa({source});\n"));
        let dest = pim_rreg_name(stmt.destination()).expect("read destination must be a PIM register");
        code.push_str(&format!(
            "\tpimOpMove({}, PIM_RREG_SA, {dest});\n\n",
            sanitize_ident(first_port.as_str())
        ));
        code
    }

    fn write_code(&self, stmt: &Statement, first_port: &Sym, width: usize) -> String {
        let mut code = self.comment(stmt);
        let source = pim_rreg_name(&stmt.sources()[0]).expect("write source must be a PIM register");
        code.push_str(&format!(
            "\tpimOpMove({}, {source}, PIM_RREG_SA);\n",
            sanitize_ident(first_port.as_str())
        ));
        let dest = format_operand(stmt.destination(), width, false);
        code.push_str(&format!("\tpimOpWriteSaToRow({dest});\n\n"));
        code
    }

    fn set_code(&self, stmt: &Statement, first_port: &Sym, value: bool) -> String {
        let mut code = self.comment(stmt);
        let dest = pim_rreg_name(stmt.destination()).expect("set destination must be a PIM register");
        code.push_str(&format!(
            "\tpimOpSet({}, {dest}, {value});\n\n",
            sanitize_ident(first_port.as_str())
        ));
        code
    }

    fn logic_code(&self, stmt: &Statement, first_port: &Sym) -> String {
        let mut code = self.comment(stmt);
        let func = logic_function_name(stmt.opcode);
        let mut operands: Vec<String> = stmt
            .sources()
            .iter()
            .map(|s| pim_rreg_name(s).expect("logic operand must resolve to a PIM register"))
            .collect();
        operands.push(pim_rreg_name(stmt.destination()).expect("logic destination must be a PIM register"));
        code.push_str(&format!(
            "\t{func}({}, {});\n\n",
            sanitize_ident(first_port.as_str()),
            operands.join(", ")
        ));
        code
    }
}

/// `mapPimAsmOpCodeToPimEvalAPI`'s opcode table.
fn logic_function_name(opcode: Opcode) -> &'static str {
    match opcode {
        Opcode::Inv1 => "pimOpNot",
        Opcode::Mv | Opcode::Copy | Opcode::CopyInout => "pimOpMove",
        Opcode::And2 => "pimOpAnd",
        Opcode::Or2 => "pimOpOr",
        Opcode::Xor2 => "pimOpXor",
        Opcode::Nand2 => "pimOpNand",
        Opcode::Nor2 => "pimOpNor",
        Opcode::Xnor2 => "pimOpXnor",
        Opcode::Maj3 { .. } => "pimOpMaj",
        Opcode::Mux2 => "pimOpSel",
        Opcode::Zero | Opcode::One | Opcode::Read | Opcode::Write => {
            unreachable!("handled by dedicated statement_code branches")
        }
    }
}
