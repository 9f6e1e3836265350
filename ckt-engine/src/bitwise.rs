//! `GeneratorBitwise` (spec §4.4): emits a bit-sliced C function — one
//! `uint64_t` scalar per primary-input bit, one `uint64_t*` per primary-
//! output bit, one assignment per scheduled gate. Because the same C
//! expression evaluates 64 independent bit-lanes packed into each word,
//! this doubles as the bitwise regression oracle the DAG verifier's
//! outputs are checked against (spec §2's "used both as executable
//! reference and as input to the bitwise regression test").
//!
//! Grounded on `original_source/src/blif-parser/generator.py`'s
//! `Generator` class, with the opcode table extended to the full
//! `GateFunc` enumeration (`mux2`, `maj3`, `zero`/`one`, `copy`) that the
//! original's `generator.py` never needed to cover.

use ckt::dag::{Dag, GateFunc};
use ckt::ir::Sym;
use std::fmt::Write as _;

/// Emits the bitwise-C micro-program IR for a scheduled DAG.
#[derive(Debug, Default)]
pub struct GeneratorBitwise;

impl GeneratorBitwise {
    /// Builds an emitter.
    pub fn new() -> Self {
        GeneratorBitwise
    }

    /// Renders `dag`'s gates, in `schedule` order, as a standalone C++
    /// translation unit. `schedule` must be a topological order over
    /// every gate in `dag` (typically the output of one of
    /// `ckt-sched`'s strategies). Output ports are by-reference
    /// parameters, as in the original generator: the gate that produces
    /// an output port's value assigns directly into the port's own name,
    /// since the DAG's structural invariant guarantees an out-port's sole
    /// input wire is always named after the port itself.
    pub fn generate(&self, dag: &Dag, schedule: &[Sym]) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "#include <cstdint>\n");
        let _ = write!(out, "void {}(\n", sanitize_ident(dag.module_name()));
        for port in dag.in_ports() {
            let _ = writeln!(out, "\tuint64_t {},", sanitize_ident(port.as_str()));
        }
        for (i, port) in dag.out_ports().iter().enumerate() {
            let _ = write!(out, "\tuint64_t &{}", sanitize_ident(port.as_str()));
            out.push_str(if i + 1 == dag.out_ports().len() { "\n" } else { ",\n" });
        }
        out.push_str(")\n{\n");

        let internal_wires: Vec<Sym> = schedule
            .iter()
            .filter_map(|id| dag.gate(id))
            .filter(|g| !g.gate_func.is_port())
            .flat_map(|g| g.outputs.iter().cloned())
            .filter(|w| !dag.is_out_port(w))
            .collect();
        if !internal_wires.is_empty() {
            let _ = write!(out, "\tuint64_t ");
            let decls: Vec<String> = internal_wires.iter().map(|w| sanitize_ident(w.as_str())).collect();
            let _ = writeln!(out, "{};", decls.join(", "));
        }

        for id in schedule {
            let Some(gate) = dag.gate(id) else { continue };
            match gate.gate_func {
                GateFunc::InPort | GateFunc::OutPort => {}
                _ => {
                    let expr = gate_expr(gate);
                    for out_wire in &gate.outputs {
                        let _ = writeln!(out, "\t{} = {expr};", sanitize_ident(out_wire.as_str()));
                    }
                }
            }
        }

        out.push_str("}\n");
        out
    }
}

/// A wire reference, parenthesized and negated if the consuming gate
/// reads it through its `inverted` set.
fn operand_ref(gate: &ckt::dag::Gate, wire: &Sym) -> String {
    let ident = sanitize_ident(wire.as_str());
    if gate.is_inverted(wire) {
        format!("(~{ident})")
    } else {
        ident
    }
}

/// The C expression computing a non-port gate's output, honoring
/// `inverted` operand references. `maj3`'s expansion
/// `(a&b)|(a&c)|(b&c)` is spelled out literally, per spec §4.4.
fn gate_expr(gate: &ckt::dag::Gate) -> String {
    let r = |i: usize| operand_ref(gate, &gate.inputs[i]);
    match gate.gate_func {
        GateFunc::Inv1 => format!("~{}", r(0)),
        GateFunc::And2 => format!("({} & {})", r(0), r(1)),
        GateFunc::Or2 => format!("({} | {})", r(0), r(1)),
        GateFunc::Nand2 => format!("~({} & {})", r(0), r(1)),
        GateFunc::Nor2 => format!("~({} | {})", r(0), r(1)),
        GateFunc::Xor2 => format!("({} ^ {})", r(0), r(1)),
        GateFunc::Xnor2 => format!("~({} ^ {})", r(0), r(1)),
        GateFunc::Mux2 => format!("({} ? {} : {})", r(0), r(2), r(1)),
        GateFunc::Maj3 => format!("(({a}&{b})|({a}&{c})|({b}&{c}))", a = r(0), b = r(1), c = r(2)),
        GateFunc::Copy | GateFunc::CopyInout => r(0),
        GateFunc::Zero => "0ULL".to_string(),
        GateFunc::One => "0xFFFFFFFFFFFFFFFFULL".to_string(),
        GateFunc::InPort | GateFunc::OutPort => unreachable!("port gates handled by the caller"),
    }
}

/// Bus-index brackets (`a[3]`) and wire-segment markers aren't valid C
/// identifier characters; replace them with underscores.
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

    #[test]
    fn half_adder_emits_xor_and_and_expressions() {
        let dag = Dag::new(
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
        .unwrap();
        dag.sanity_check(PimMode::Digital).unwrap();

        let schedule = dag.topo_order();
        let code = GeneratorBitwise::new().generate(&dag, &schedule);
        assert!(code.contains("uint64_t &sum"));
        assert!(code.contains("uint64_t &cout"));
        assert!(code.contains("sum = (a ^ b);"));
        assert!(code.contains("cout = (a & b);"));
    }

    #[test]
    fn inverted_operand_is_negated_in_the_expression() {
        let dag = Dag::new(
            "inv_and",
            vec![Sym::new("a"), Sym::new("b")],
            vec![Sym::new("o")],
            vec![GateInfo {
                gate_id: Sym::new("g0"),
                gate_func: GateFunc::And2,
                inputs: vec![Sym::new("a"), Sym::new("b")],
                outputs: vec![Sym::new("o")],
            }],
            DebugLevel::SILENT,
        )
        .unwrap();
        dag.invert_input_wire(&Sym::new("g0"), &Sym::new("a")).unwrap();

        let schedule = dag.topo_order();
        let code = GeneratorBitwise::new().generate(&dag, &schedule);
        assert!(code.contains("o = ((~a) & b);"));
    }
}
