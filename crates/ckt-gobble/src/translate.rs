//! The assembly reverse translator (spec §4.5).
//!
//! Walks a parsed RISC-V statement stream and rebuilds a bit-serial
//! statement stream grounded in the original PIM register and port names,
//! using a [`SymbolTable`] and [`TempAllocator`]. The resolution algorithm
//! (`resolve_operand` / `resolve_linked_instruction`) is ported from
//! `original_source/src/asm-parser/asm_translator.py`'s
//! `AsmTranslator.resolveOperand` / `resolveLinkedInstruction`, which spells
//! out the precise recursive chain-walk mechanics this module implements.

use crate::types::{AppMarker, DebugValue, PimOpLine, RiscvInstruction, RiscvStatement};
use ckt::ir::{LinkedInstruction, Opcode, Statement, Sym, SymbolTable, SymbolValue, TempAllocator};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

/// The nineteen PIM row-register names, re-exported from `ckt::ir` so
/// callers that only need the register table don't have to depend on it
/// directly.
pub use ckt::ir::PIM_REGISTERS;

/// True iff `sym` names one of the nineteen reserved PIM row registers —
/// a concrete, already-resolved value, as opposed to a stack-slot alias
/// or synthesized `temp<k>`.
pub fn is_pim_register(sym: &Sym) -> bool {
    ckt::ir::is_pim_register_name(sym.as_str())
}

fn is_temp(sym: &Sym) -> bool {
    sym.as_str().contains("temp")
}

fn port_name(dv: &DebugValue) -> &str {
    dv.port_name.split_once(':').map(|(_, port)| port).unwrap_or(&dv.port_name)
}

/// Reverse-translates a parsed RISC-V statement stream into a bit-serial
/// [`LinkedInstruction`] stream.
pub struct AsmTranslator {
    riscv: Vec<RiscvStatement>,
    in_ports: HashSet<String>,
    out_ports: Vec<Sym>,
    written_ports: HashSet<String>,
    statements: Vec<Rc<RefCell<LinkedInstruction>>>,
    symbols: SymbolTable,
    temps: TempAllocator,
}

impl AsmTranslator {
    /// Builds a translator over an already-parsed statement stream.
    pub fn new(riscv: Vec<RiscvStatement>, in_ports: &[Sym], out_ports: &[Sym]) -> Self {
        AsmTranslator {
            riscv,
            in_ports: in_ports.iter().map(|s| s.to_string()).collect(),
            out_ports: out_ports.to_vec(),
            written_ports: HashSet::new(),
            statements: Vec::new(),
            symbols: SymbolTable::new(),
            temps: TempAllocator::new(),
        }
    }

    /// Runs the translation, consuming `self`.
    ///
    /// Terminates early, ignoring the remainder of the stream, once every
    /// primary output port has been written (spec §4.5's "the translator
    /// terminates as soon as every output port ... has been written").
    pub fn translate(mut self) -> Vec<LinkedInstruction> {
        let mut i = 0;
        while i < self.riscv.len() {
            let advance = match &self.riscv[i] {
                RiscvStatement::Instruction(instr) if instr.is_load() => {
                    self.translate_load(i);
                    1
                }
                RiscvStatement::Instruction(instr) if instr.is_store() => {
                    self.translate_store(i);
                    1
                }
                RiscvStatement::AppMarker(AppMarker::Begin) => {
                    let end = self.translate_inline_asm(i);
                    end.saturating_sub(i).max(1)
                }
                _ => 1,
            };
            i += advance;
            if self.all_output_ports_written() {
                break;
            }
        }
        self.statements
            .into_iter()
            .map(|rc| match Rc::try_unwrap(rc) {
                Ok(cell) => cell.into_inner(),
                Err(rc) => rc.borrow().clone(),
            })
            .collect()
    }

    fn all_output_ports_written(&self) -> bool {
        !self.out_ports.is_empty()
            && self.out_ports.iter().all(|p| self.written_ports.contains(p.as_str()))
    }

    fn append_bit_serial_instruction(
        &mut self,
        opcode: Opcode,
        operands: Vec<Sym>,
        line: usize,
        suspended: bool,
    ) -> Rc<RefCell<LinkedInstruction>> {
        let statement = Statement::new(opcode, operands, line);
        let source_instructions = statement.sources().iter().map(|s| self.symbols.get(s).cloned()).collect();
        let dest = statement.destination().clone();
        if matches!(opcode, Opcode::Write) && self.out_ports.contains(&dest) {
            self.written_ports.insert(dest.to_string());
        }
        let linked = Rc::new(RefCell::new(LinkedInstruction::new(statement, source_instructions, suspended)));
        self.statements.push(linked.clone());
        self.symbols.set(dest, SymbolValue::Instruction(linked.clone()));
        linked
    }

    /// Recovers the physical symbol (register, port, or `temp<k>`) a
    /// symbol-table entry ultimately resolves to, unsuspending any
    /// instruction whose upstream dependency this walk just resolved.
    fn resolve_operand(&self, symbol: &Sym) -> Option<Sym> {
        match self.symbols.get(symbol)? {
            SymbolValue::Alias(alias) => self.resolve_temp(alias),
            SymbolValue::Instruction(instr) => self.resolve_linked_instruction(instr),
        }
    }

    fn resolve_temp(&self, alias: &Sym) -> Option<Sym> {
        if is_temp(alias) {
            self.resolve_operand(alias)
        } else {
            Some(alias.clone())
        }
    }

    fn resolve_linked_instruction(&self, instr: &Rc<RefCell<LinkedInstruction>>) -> Option<Sym> {
        let source_entry = instr.borrow().source_instructions.first().cloned().flatten();
        let Some(source_entry) = source_entry else {
            return instr.borrow().statement.sources().first().cloned();
        };
        match source_entry {
            SymbolValue::Alias(s) => Some(s),
            SymbolValue::Instruction(src_instr) => {
                let src_dest = src_instr.borrow().statement.destination().clone();
                let resolved = if is_pim_register(&src_dest) {
                    Some(src_dest)
                } else {
                    self.resolve_operand(&src_dest)
                };

                let my_dest = instr.borrow().statement.destination().clone();
                let my_src = instr.borrow().statement.sources().first().cloned();
                if is_temp(&my_dest) && my_src.is_some_and(|s| !is_temp(&s)) {
                    instr.borrow_mut().unsuspend();
                }
                resolved
            }
        }
    }

    fn resolve_destination_operand(&mut self, dest: &Sym) -> (Option<Sym>, bool) {
        if is_pim_register(dest) {
            return (Some(dest.clone()), false);
        }
        let resolved = match self.symbols.get(dest).cloned() {
            Some(SymbolValue::Alias(a)) => a,
            _ => {
                let t = self.temps.alloc_sym();
                self.symbols.set(dest.clone(), SymbolValue::Alias(t.clone()));
                t
            }
        };
        if is_temp(&resolved) {
            (None, true)
        } else {
            (Some(resolved), false)
        }
    }

    fn translate_load(&mut self, idx: usize) {
        let (dest_raw, src_raw, line) = match &self.riscv[idx] {
            RiscvStatement::Instruction(i) => {
                (Sym::new(i.operands[0].as_str()), Sym::new(i.operands[1].as_str()), i.line)
            }
            _ => return,
        };
        let Some(RiscvStatement::DebugValue(port_info)) = self.riscv.get(idx + 1).cloned() else {
            return;
        };

        let (dest, suspended) = self.resolve_destination_operand(&dest_raw);
        let Some(dest) = dest else { return };

        let source = if self.in_ports.contains(port_name(&port_info)) {
            Some(Sym::new(port_name(&port_info)))
        } else {
            self.resolve_operand(&src_raw)
        };
        let Some(source) = source else { return };

        self.append_bit_serial_instruction(Opcode::Read, vec![dest, source], line, suspended);
    }

    fn translate_store(&mut self, idx: usize) {
        let (src_raw, ref_raw, line) = match &self.riscv[idx] {
            RiscvStatement::Instruction(i) => {
                (Sym::new(i.operands[0].as_str()), Sym::new(i.operands[1].as_str()), i.line)
            }
            _ => return,
        };

        let source = self.resolve_source_operand_for_store(&src_raw);
        let dest = self.map_to_temporary_variable(&ref_raw);
        self.handle_pointer_operation(&source, &dest);

        self.append_bit_serial_instruction(Opcode::Write, vec![source, dest], line, true);
    }

    fn resolve_source_operand_for_store(&mut self, src: &Sym) -> Sym {
        if is_pim_register(src) {
            return src.clone();
        }
        match self.symbols.get(src).cloned() {
            Some(SymbolValue::Alias(a)) => a,
            _ => {
                let t = self.temps.alloc_sym();
                self.symbols.set(src.clone(), SymbolValue::Alias(t.clone()));
                t
            }
        }
    }

    fn map_to_temporary_variable(&mut self, reference: &Sym) -> Sym {
        let t = self.temps.alloc_sym();
        self.symbols.set(reference.clone(), SymbolValue::Alias(t.clone()));
        t
    }

    /// When a store's register operand was itself an alias for an output
    /// port and its reference operand has just been mapped to a fresh
    /// temp, re-point that alias at the temp — so a store through a
    /// pointer that ultimately targets an output port is still
    /// recognizable as such once [`crate::optimize::PortSpillSimplifier`]
    /// walks the stream (`handlePointerOperation` in the original).
    fn handle_pointer_operation(&mut self, source: &Sym, dest: &Sym) {
        if !is_pim_register(source) || !is_temp(dest) {
            return;
        }
        if let Some(SymbolValue::Alias(value)) = self.symbols.get(source).cloned() {
            if self.out_ports.iter().any(|p| p == &value) {
                self.symbols.remove(source);
                self.symbols.set(dest.clone(), SymbolValue::Alias(value));
            }
        }
    }

    /// Scans from an `#APP` marker to its matching `#NO_APP`, recovers the
    /// `#PIM_OP` opcode/operand line if present (falling back to
    /// [`infer_fused_opcode`] on the real RISC-V mnemonics otherwise), and
    /// emits the corresponding bit-serial instruction. Returns the index
    /// of the `#NO_APP` marker (or the stream length if unterminated).
    fn translate_inline_asm(&mut self, idx: usize) -> usize {
        let mut i = idx + 1;
        let mut op: Option<(String, Vec<String>)> = None;
        let mut real_instrs: Vec<RiscvInstruction> = Vec::new();
        let mut last_line = 0;
        while i < self.riscv.len() {
            match &self.riscv[i] {
                RiscvStatement::AppMarker(AppMarker::End) => break,
                RiscvStatement::PimOp(PimOpLine::Op { opcode, operands, .. }) => {
                    op = Some((opcode.clone(), operands.clone()));
                }
                RiscvStatement::Instruction(instr) => {
                    last_line = instr.line;
                    real_instrs.push(instr.clone());
                }
                _ => {}
            }
            i += 1;
        }
        let end_idx = i;

        let recovered = op.or_else(|| {
            let refs: Vec<&RiscvInstruction> = real_instrs.iter().collect();
            let opcode = infer_fused_opcode(&refs)?;
            let operands = refs.first()?.operands.clone();
            Some((opcode.to_string(), operands))
        });

        if let Some((opcode_str, operand_names)) = recovered {
            if let Some(opcode) = Opcode::from_mnemonic(&opcode_str) {
                let operands: Vec<Sym> = operand_names
                    .iter()
                    .map(|name| {
                        let sym = Sym::new(name.as_str());
                        if is_pim_register(&sym) {
                            sym.clone()
                        } else {
                            self.resolve_operand(&sym).unwrap_or(sym)
                        }
                    })
                    .collect();
                let linked = self.append_bit_serial_instruction(opcode, operands, last_line, false);

                if let Some(RiscvStatement::DebugValue(dv)) = self.riscv.get(end_idx + 1) {
                    let name = port_name(dv);
                    if self.out_ports.iter().any(|p| p.as_str() == name) {
                        let result = linked.borrow().statement.destination().clone();
                        self.append_bit_serial_instruction(
                            Opcode::Write,
                            vec![result.clone(), Sym::new(name)],
                            last_line,
                            false,
                        );
                        self.symbols.set(result, SymbolValue::Alias(Sym::new(name)));
                    }
                }
            }
        }

        end_idx
    }
}

/// Recovers an opcode the C compiler's peephole optimizer fused from two
/// real RISC-V mnemonics, for the (rare) case an inline-assembly block's
/// `#PIM_OP` comment was itself optimized away. Grounded on
/// `AsmTranslator.getInstrunctionSequenceOpCode`'s translation table.
pub fn infer_fused_opcode(instrs: &[&RiscvInstruction]) -> Option<&'static str> {
    let opcodes: Vec<&str> = instrs.iter().map(|i| i.opcode.as_str()).collect();
    match opcodes.as_slice() {
        ["xor", "not"] => Some("xnor2"),
        ["and", "not"] => Some("nand2"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    #[test]
    fn translates_a_read_of_an_input_port_into_a_register() {
        let text = "#DEBUG_VALUE: half_adder:a <- $t0\nlw t0, -4(s0)\n";
        let stmts = parser::parse(text);
        let translator = AsmTranslator::new(stmts, &[Sym::new("a"), Sym::new("b")], &[Sym::new("sum")]);
        let out = translator.translate();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].statement.opcode, Opcode::Read);
        assert_eq!(out[0].statement.operands[0].as_str(), "t0");
        assert_eq!(out[0].statement.operands[1].as_str(), "a");
    }

    #[test]
    fn recovers_inline_asm_pim_op_and_writes_output_port() {
        let text = concat!(
            "#DEBUG_VALUE: half_adder:a <- $t0\n",
            "lw t0, -4(s0)\n",
            "#DEBUG_VALUE: half_adder:b <- $t1\n",
            "lw t1, -8(s0)\n",
            "#APP\n",
            "#PIM_OP BEGIN\n",
            "#PIM_OP g0 xor2 t2 t0 t1\n",
            "xor t2, t0, t1\n",
            "#PIM_OP END\n",
            "#NO_APP\n",
            "#DEBUG_VALUE: half_adder:sum <- $t2\n",
        );
        let stmts = parser::parse(text);
        let translator = AsmTranslator::new(stmts, &[Sym::new("a"), Sym::new("b")], &[Sym::new("sum")]);
        let out = translator.translate();

        let write = out.iter().find(|i| i.statement.opcode == Opcode::Write).expect("a write was emitted");
        assert_eq!(write.statement.operands[1].as_str(), "sum");
    }

    #[test]
    fn terminates_once_every_output_port_is_written() {
        let text = concat!(
            "#DEBUG_VALUE: m:a <- $t0\n",
            "lw t0, -4(s0)\n",
            "#APP\n",
            "#PIM_OP BEGIN\n",
            "#PIM_OP g0 inv1 t1 t0\n",
            "not t1, t0\n",
            "#PIM_OP END\n",
            "#NO_APP\n",
            "#DEBUG_VALUE: m:out <- $t1\n",
            "lw t5, 0(s0)\n", // unrelated trailing load must be ignored
        );
        let stmts = parser::parse(text);
        let translator = AsmTranslator::new(stmts, &[Sym::new("a")], &[Sym::new("out")]);
        let out = translator.translate();
        assert!(out.iter().any(|i| i.statement.opcode == Opcode::Write));
        assert!(out.iter().all(|i| i.statement.operands.iter().all(|o| o.as_str() != "t5")));
    }
}
