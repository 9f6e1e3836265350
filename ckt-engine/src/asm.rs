//! `GeneratorAsm` (spec §4.4): emits the inline-assembly-over-RISC-V
//! micro-program IR. Every scheduled gate becomes one GCC extended-`asm`
//! statement whose template textually substitutes `%N` placeholders into
//! both a `#PIM_OP` sentinel comment and a real RISC-V mnemonic sequence —
//! so once an (assumed, external) C compiler allocates concrete registers
//! and emits this to `.s`, the comment and the instruction agree on the
//! same register names. That's the mechanism by which `ckt-gobble`'s
//! reverse translator (spec §4.5) recovers the original bit-serial opcode
//! and operands after the compiler has had its way with everything else.
//!
//! Grounded on `original_source/src/blif-parser/generatorAsm.py`'s
//! `GeneratorAsm` class (pointer-per-port signature, `asm("... BEGIN
//! ...")`/`asm("... END ...")` bracketing, per-opcode real-instruction
//! templates, clobber-list construction) — extended with the `#PIM_OP`
//! comment convention the original never needed (it had no reverse
//! translation step) and with the full `GateFunc` catalog.

use ckt::dag::{Dag, Gate, GateFunc};
use ckt::ir::{Sym, PIM_REGISTERS};
use std::fmt::Write as _;

/// Emits the inline-asm-over-RISC-V micro-program IR for a scheduled DAG.
pub struct GeneratorAsm {
    num_regs: usize,
}

impl GeneratorAsm {
    /// Builds an emitter that reserves the first `num_regs` names out of
    /// [`PIM_REGISTERS`] as row registers, clobbering the rest so the
    /// compiler's own register allocator never touches them.
    pub fn new(num_regs: usize) -> Self {
        GeneratorAsm { num_regs }
    }

    /// Renders `dag`'s gates, in `schedule` order, as a C translation unit
    /// with one inline-asm block per non-port gate.
    pub fn generate(&self, dag: &Dag, schedule: &[Sym]) -> String {
        let mut out = String::new();
        let _ = write!(out, "void {}(\n", sanitize_ident(dag.module_name()));
        let mut params: Vec<String> = dag.in_ports().iter().map(|p| format!("\tint *{}_p", sanitize_ident(p.as_str()))).collect();
        params.extend(dag.out_ports().iter().map(|p| format!("\tint *{}_p", sanitize_ident(p.as_str()))));
        out.push_str(&params.join(",\n"));
        out.push_str("\n)\n{\n");

        let internal_wires: Vec<Sym> = schedule
            .iter()
            .filter_map(|id| dag.gate(id))
            .filter(|g| !g.gate_func.is_port())
            .flat_map(|g| g.outputs.iter().cloned())
            .filter(|w| !dag.is_out_port(w))
            .collect();
        if !internal_wires.is_empty() {
            let decls: Vec<String> = internal_wires.iter().map(|w| sanitize_ident(w.as_str())).collect();
            let _ = writeln!(out, "\tint {};", decls.join(", "));
        }

        let scratch_needed: Vec<Sym> = schedule
            .iter()
            .filter_map(|id| dag.gate(id))
            .filter(|g| matches!(g.gate_func, GateFunc::Mux2 | GateFunc::Maj3))
            .map(|g| g.gate_id.clone())
            .collect();
        if !scratch_needed.is_empty() {
            let decls: Vec<String> = scratch_needed.iter().map(|id| scratch_var(id)).collect();
            let _ = writeln!(out, "\tint {};", decls.join(", "));
        }

        if !dag.in_ports().is_empty() {
            let inits: Vec<String> = dag
                .in_ports()
                .iter()
                .map(|p| format!("{} = *{}_p", sanitize_ident(p.as_str()), sanitize_ident(p.as_str())))
                .collect();
            let _ = writeln!(out, "\tint {};", inits.join(", "));
        }
        if !dag.out_ports().is_empty() {
            let decls: Vec<String> = dag.out_ports().iter().map(|p| sanitize_ident(p.as_str())).collect();
            let _ = writeln!(out, "\tint {};", decls.join(", "));
        }

        out.push_str("\n\tasm(\"########## BEGIN ##########\");\n");
        for id in schedule {
            let Some(gate) = dag.gate(id) else { continue };
            if gate.gate_func.is_port() {
                continue;
            }
            out.push_str(&self.gate_block(gate));
        }
        out.push_str("\tasm(\"########## END ##########\");\n\n");

        for port in dag.out_ports() {
            let _ = writeln!(
                out,
                "\t*{}_p = {};",
                sanitize_ident(port.as_str()),
                sanitize_ident(port.as_str())
            );
        }

        out.push_str("}\n");
        out
    }

    /// Builds the single `asm(...)` statement for one gate.
    fn gate_block(&self, gate: &Gate) -> String {
        let spec = GateAsmSpec::for_gate(gate);
        let dest = sanitize_ident(gate.outputs[0].as_str());
        let mut outputs = vec![dest.clone()];
        if spec.needs_scratch {
            outputs.push(scratch_var(&gate.gate_id));
        }
        let inputs: Vec<String> = gate.inputs.iter().map(|w| sanitize_ident(w.as_str())).collect();

        let mnemonic = opcode_mnemonic(gate);

        let mut template = String::new();
        let _ = writeln!(template, "\t\t\"#PIM_OP BEGIN\\n\"");
        let _ = writeln!(
            template,
            "\t\t\"#PIM_OP {} {} {}\\n\"",
            gate.gate_id,
            mnemonic,
            operand_placeholders(&outputs, &inputs)
        );
        for line in &spec.instructions {
            let _ = writeln!(template, "\t\t\"{}\\n\"", substitute_placeholders(line, &outputs, &inputs));
        }
        let _ = writeln!(template, "\t\t\"#PIM_OP END\"");

        let output_constraints: Vec<String> = outputs.iter().map(|v| format!("\"=r\"({v})")).collect();
        let input_constraints: Vec<String> = inputs.iter().map(|v| format!("\"r\"({v})")).collect();

        let mut block = String::new();
        block.push_str("\tasm(\n");
        block.push_str(&template);
        let _ = writeln!(block, "\t\t: {}", output_constraints.join(", "));
        if input_constraints.is_empty() {
            let _ = writeln!(block, "\t\t:");
        } else {
            let _ = writeln!(block, "\t\t: {}", input_constraints.join(", "));
        }
        let _ = writeln!(block, "\t\t: {}", self.clobber_list());
        block.push_str("\t);\n");
        block
    }

    /// The quoted clobber list: the fixed caller-saved set plus every
    /// [`PIM_REGISTERS`] entry beyond the first `num_regs` reserved ones.
    fn clobber_list(&self) -> String {
        let mut regs: Vec<String> = vec!["\"ra\"".into()];
        regs.extend((0..8).map(|i| format!("\"a{i}\"")));
        regs.extend(PIM_REGISTERS.iter().skip(self.num_regs).map(|r| format!("\"{r}\"")));
        regs.join(", ")
    }
}

/// The `#PIM_OP` comment's operand list — destination first, then
/// sources — rendered as `%N` indices in GCC extended-asm's
/// output-then-input constraint order, so textual substitution leaves the
/// comment naming the same concrete registers as the real instruction.
fn operand_placeholders(outputs: &[String], inputs: &[String]) -> String {
    let dest = "%0".to_string();
    let srcs: Vec<String> = (0..inputs.len()).map(|i| format!("%{}", outputs.len() + i)).collect();
    std::iter::once(dest).chain(srcs).collect::<Vec<_>>().join(" ")
}

/// Replaces the symbolic `$OUT0`/`$OUT1`/`$IN0`.. placeholders a
/// [`GateAsmSpec`] instruction template uses with the GCC `%N` index that
/// corresponds to that operand's position in the constraint lists.
fn substitute_placeholders(line: &str, outputs: &[String], inputs: &[String]) -> String {
    let mut line = line.to_string();
    for (i, _) in outputs.iter().enumerate() {
        line = line.replace(&format!("$OUT{i}"), &format!("%{i}"));
    }
    for (i, _) in inputs.iter().enumerate() {
        line = line.replace(&format!("$IN{i}"), &format!("%{}", outputs.len() + i));
    }
    line
}

/// Per-gate real-instruction template (using `$OUT0`/`$IN0`-style
/// placeholders, resolved to `%N` once the operand lists are known) plus
/// whether a second, discarded output operand is needed as scratch space.
struct GateAsmSpec {
    instructions: Vec<&'static str>,
    needs_scratch: bool,
}

impl GateAsmSpec {
    fn for_gate(gate: &Gate) -> Self {
        match gate.gate_func {
            GateFunc::Inv1 => GateAsmSpec { instructions: vec!["not $OUT0, $IN0"], needs_scratch: false },
            GateFunc::And2 => GateAsmSpec { instructions: vec!["and $OUT0, $IN0, $IN1"], needs_scratch: false },
            GateFunc::Or2 => GateAsmSpec { instructions: vec!["or $OUT0, $IN0, $IN1"], needs_scratch: false },
            GateFunc::Nand2 => GateAsmSpec {
                instructions: vec!["and $OUT0, $IN0, $IN1", "not $OUT0, $OUT0"],
                needs_scratch: false,
            },
            GateFunc::Nor2 => GateAsmSpec {
                instructions: vec!["or $OUT0, $IN0, $IN1", "not $OUT0, $OUT0"],
                needs_scratch: false,
            },
            GateFunc::Xor2 => GateAsmSpec { instructions: vec!["xor $OUT0, $IN0, $IN1"], needs_scratch: false },
            GateFunc::Xnor2 => GateAsmSpec {
                instructions: vec!["xor $OUT0, $IN0, $IN1", "not $OUT0, $OUT0"],
                needs_scratch: false,
            },
            GateFunc::Mux2 => GateAsmSpec {
                instructions: vec![
                    "and $OUT1, $IN0, $IN2",
                    "not $OUT0, $IN0",
                    "and $OUT0, $OUT0, $IN1",
                    "or $OUT0, $OUT0, $OUT1",
                ],
                needs_scratch: true,
            },
            GateFunc::Maj3 => GateAsmSpec {
                instructions: vec![
                    "and $OUT1, $IN0, $IN1",
                    "and $OUT0, $IN0, $IN2",
                    "or $OUT0, $OUT0, $OUT1",
                    "and $OUT1, $IN1, $IN2",
                    "or $OUT0, $OUT0, $OUT1",
                ],
                needs_scratch: true,
            },
            GateFunc::Copy | GateFunc::CopyInout => {
                GateAsmSpec { instructions: vec!["mv $OUT0, $IN0"], needs_scratch: false }
            }
            GateFunc::Zero => GateAsmSpec { instructions: vec!["li $OUT0, 0"], needs_scratch: false },
            GateFunc::One => GateAsmSpec { instructions: vec!["li $OUT0, -1"], needs_scratch: false },
            GateFunc::InPort | GateFunc::OutPort => unreachable!("port gates are filtered out by the caller"),
        }
    }
}

/// The `#PIM_OP` mnemonic for a gate, honoring per-input complement reads
/// for `maj3`'s `__n<bits>` suffix (spec §4.7's dual-contact encoding).
fn opcode_mnemonic(gate: &Gate) -> String {
    match gate.gate_func {
        GateFunc::Maj3 => {
            let bits: String = gate
                .inputs
                .iter()
                .map(|w| if gate.is_inverted(w) { '1' } else { '0' })
                .collect();
            format!("maj3__n{bits}")
        }
        other => other.blif_keyword().unwrap_or("unknown").to_string(),
    }
}

fn scratch_var(gate_id: &Sym) -> String {
    format!("{}_scratch", sanitize_ident(gate_id.as_str()))
}

fn sanitize_ident(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ckt::dag::{GateInfo, PimMode};
    use ckt::debug::DebugLevel;

    fn half_adder() -> Dag {
        Dag::new(
            "half_adder",
            vec![Sym::new("a"), Sym::new("b")],
            vec![Sym::new("sum"), Sym::new("cout")],
            vec![
                GateInfo {
                    gate_id: Sym::new("g0"),
                    gate_func: GateFunc::Xor2,
                    inputs: vec![Sym::new("a"), Sym::new("b")],
                    outputs: vec![Sym::new("sum")],
                },
                GateInfo {
                    gate_id: Sym::new("g1"),
                    gate_func: GateFunc::And2,
                    inputs: vec![Sym::new("a"), Sym::new("b")],
                    outputs: vec![Sym::new("cout")],
                },
            ],
            DebugLevel::SILENT,
        )
        .unwrap()
    }

    #[test]
    fn emits_one_pim_op_block_per_gate() {
        let dag = half_adder();
        dag.sanity_check(PimMode::Digital).unwrap();
        let schedule = dag.topo_order();
        let code = GeneratorAsm::new(7).generate(&dag, &schedule);

        assert!(code.contains("#PIM_OP g0 xor2"));
        assert!(code.contains("#PIM_OP g1 and2"));
        assert_eq!(code.matches("#PIM_OP BEGIN").count(), 2);
        assert_eq!(code.matches("#PIM_OP END").count(), 2);
        assert!(code.contains("*sum_p = sum;"));
        assert!(code.contains("*cout_p = cout;"));
    }

    #[test]
    fn clobber_list_excludes_only_the_reserved_registers() {
        let gen = GeneratorAsm::new(3);
        let clobber = gen.clobber_list();
        assert!(!clobber.contains("\"t0\""));
        assert!(!clobber.contains("\"t1\""));
        assert!(!clobber.contains("\"t2\""));
        assert!(clobber.contains("\"t3\""));
        assert!(clobber.contains("\"s11\""));
    }

    #[test]
    fn maj3_comment_encodes_inverted_inputs() {
        let mut dag = Dag::new(
            "m",
            vec![Sym::new("a"), Sym::new("b"), Sym::new("c")],
            vec![Sym::new("o")],
            vec![GateInfo {
                gate_id: Sym::new("g0"),
                gate_func: GateFunc::Maj3,
                inputs: vec![Sym::new("a"), Sym::new("b"), Sym::new("c")],
                outputs: vec![Sym::new("o")],
            }],
            DebugLevel::SILENT,
        )
        .unwrap();
        dag.invert_input_wire(&Sym::new("g0"), &Sym::new("b")).unwrap();

        let schedule = dag.topo_order();
        let code = GeneratorAsm::new(7).generate(&dag, &schedule);
        assert!(code.contains("maj3__n010"));
    }
}
