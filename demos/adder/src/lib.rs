//! Ripple-carry adder BLIF fixture generator.
//!
//! Produces the half-adder, full-adder, and n-bit ripple-carry-tree
//! circuits used as test fixtures across the workspace: scenario 1 and
//! scenario 5 of the compiler's testable properties exercise exactly
//! these shapes.

use ckt::debug::DebugLevel;
use ckt::dag::{Dag, GateFunc, GateInfo};
use ckt::ir::Sym;

/// `sum = a XOR b`, `cout = a AND b`.
pub fn generate_half_adder() -> anyhow::Result<Dag> {
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
}

/// `sum = a XOR b XOR cin`, `cout = (a AND b) XOR ((a XOR b) AND cin)` — the
/// standard five-gate full adder (three `xor2`, two `and2`).
pub fn generate_full_adder() -> anyhow::Result<Dag> {
    Dag::new(
        "full_adder",
        vec![Sym::new("a"), Sym::new("b"), Sym::new("cin")],
        vec![Sym::new("sum"), Sym::new("cout")],
        full_adder_gates(
            Sym::new("a"),
            Sym::new("b"),
            Sym::new("cin"),
            Sym::new("sum"),
            Sym::new("cout"),
            "",
        ),
        DebugLevel::SILENT,
    )
}

/// Builds the five gates of one full-adder bit slice, with gate ids and
/// internal wire names disambiguated by `suffix` so a ripple-carry chain
/// can instantiate many slices in one DAG.
fn full_adder_gates(a: Sym, b: Sym, cin: Sym, sum: Sym, cout: Sym, suffix: &str) -> Vec<GateInfo> {
    let half_sum = Sym::new(format!("half_sum{suffix}"));
    let half_carry = Sym::new(format!("half_carry{suffix}"));
    let carry_prop = Sym::new(format!("carry_prop{suffix}"));

    vec![
        GateInfo {
            gate_id: Sym::new(format!("xor_sum{suffix}")),
            gate_func: GateFunc::Xor2,
            inputs: vec![a.clone(), b.clone()],
            outputs: vec![half_sum.clone()],
        },
        GateInfo {
            gate_id: Sym::new(format!("xor_out{suffix}")),
            gate_func: GateFunc::Xor2,
            inputs: vec![half_sum.clone(), cin.clone()],
            outputs: vec![sum],
        },
        GateInfo {
            gate_id: Sym::new(format!("and_half{suffix}")),
            gate_func: GateFunc::And2,
            inputs: vec![a, b],
            outputs: vec![half_carry.clone()],
        },
        GateInfo {
            gate_id: Sym::new(format!("and_prop{suffix}")),
            gate_func: GateFunc::And2,
            inputs: vec![half_sum, cin],
            outputs: vec![carry_prop.clone()],
        },
        GateInfo {
            gate_id: Sym::new(format!("xor_cout{suffix}")),
            gate_func: GateFunc::Xor2,
            inputs: vec![half_carry, carry_prop],
            outputs: vec![cout],
        },
    ]
}

/// An `n`-bit ripple-carry adder: `2n` primary inputs (`a0..a<n-1>`,
/// `b0..b<n-1>`), `n+1` primary outputs (`sum0..sum<n-1>`, `cout`). The
/// first slice's carry-in is tied to a `zero` constant gate since the
/// module declares no primary carry-in port.
pub fn generate_ripple_adder(n_bits: usize) -> anyhow::Result<Dag> {
    anyhow::ensure!(n_bits >= 1, "n_bits must be at least 1");

    let mut in_ports = Vec::with_capacity(2 * n_bits);
    for i in 0..n_bits {
        in_ports.push(Sym::new(format!("a{i}")));
    }
    for i in 0..n_bits {
        in_ports.push(Sym::new(format!("b{i}")));
    }

    let mut out_ports: Vec<Sym> = (0..n_bits).map(|i| Sym::new(format!("sum{i}"))).collect();
    out_ports.push(Sym::new("cout"));

    let mut gates = vec![GateInfo {
        gate_id: Sym::new("carry_zero"),
        gate_func: GateFunc::Zero,
        inputs: vec![],
        outputs: vec![Sym::new("carry0")],
    }];

    let mut carry_in = Sym::new("carry0");
    for i in 0..n_bits {
        let a = Sym::new(format!("a{i}"));
        let b = Sym::new(format!("b{i}"));
        let sum = Sym::new(format!("sum{i}"));
        let carry_out = if i + 1 == n_bits {
            Sym::new("cout")
        } else {
            Sym::new(format!("carry{}", i + 1))
        };
        gates.extend(full_adder_gates(a, b, carry_in, sum, carry_out.clone(), &format!("_{i}")));
        carry_in = carry_out;
    }

    Dag::new("ripple_adder", in_ports, out_ports, gates, DebugLevel::SILENT)
}

/// Renders a generated adder DAG to BLIF text, ready to feed the `cli`
/// binary's `--from-stage blif` entry point or `parse_blif` directly.
pub fn to_blif(dag: &Dag) -> String {
    ckt::blif::write_blif(dag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ckt::dag::PimMode;
    use ckt::verify::{canonical_vectors, simulate};

    #[test]
    fn half_adder_passes_sanity_check_and_round_trips_through_blif() {
        let dag = generate_half_adder().unwrap();
        dag.sanity_check(PimMode::Digital).unwrap();
        let text = to_blif(&dag);
        let reparsed = ckt::blif::parse_blif(&text, DebugLevel::SILENT).unwrap();
        reparsed.sanity_check(PimMode::Digital).unwrap();
    }

    #[test]
    fn full_adder_matches_truth_table() {
        let dag = generate_full_adder().unwrap();
        dag.sanity_check(PimMode::Digital).unwrap();
        for (inputs, _) in canonical_vectors(3) {
            let a = inputs[0];
            let b = inputs[1];
            let cin = inputs[2];
            let outputs = simulate(&dag, &inputs, PimMode::Digital).unwrap();
            let expected_sum = a ^ b ^ cin;
            let expected_cout = (a & b) | (cin & (a ^ b));
            assert_eq!(outputs[0], expected_sum);
            assert_eq!(outputs[1], expected_cout);
        }
    }

    #[test]
    fn four_bit_ripple_adder_adds_correctly() {
        let dag = generate_ripple_adder(4).unwrap();
        dag.sanity_check(PimMode::Digital).unwrap();

        // a=0101 (5), b=0011 (3) -> sum=1000 (8), cout=0. Bit 0 is least
        // significant, matching the in_ports ordering a0..a3, b0..b3.
        let inputs = vec![true, false, true, false, true, true, false, false];
        let outputs = simulate(&dag, &inputs, PimMode::Digital).unwrap();
        let sum_bits = &outputs[..4];
        let expected = [false, false, false, true]; // 8 = 0b1000
        assert_eq!(sum_bits, expected);
        assert!(!outputs[4], "no carry out of a 4-bit 5+3 addition");
    }

    #[test]
    fn eight_bit_ripple_adder_has_the_expected_gate_count() {
        let dag = generate_ripple_adder(8).unwrap();
        // 5 gates per full-adder slice + 1 zero-constant source.
        assert_eq!(dag.num_gates() - dag.in_ports().len() - dag.out_ports().len(), 5 * 8 + 1);
    }
}
