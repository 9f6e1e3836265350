//! Symbolic DAG verifier: evaluates a DAG over four canonical input
//! vectors and compares the resulting output bits against another DAG
//! (typically the same module before and after a transformation pass).

use crate::dag::{Dag, GateFunc, PimMode};
use crate::error::{CktError, TestVector};
use crate::ir::Sym;
use std::collections::HashMap;

/// The four canonical test vectors, paired with their tag.
pub fn canonical_vectors(num_inputs: usize) -> Vec<(TestVector, Vec<bool>)> {
    if num_inputs == 0 {
        return vec![(TestVector::AllZero, vec![])];
    }
    vec![
        (TestVector::AllZero, vec![false; num_inputs]),
        (TestVector::AllOne, vec![true; num_inputs]),
        (
            TestVector::Alternating01,
            (0..num_inputs).map(|i| i % 2 == 0).collect(),
        ),
        (
            TestVector::Alternating10,
            (0..num_inputs).map(|i| i % 2 == 1).collect(),
        ),
    ]
}

/// Simulates `dag` with the given primary-input assignment (in
/// `dag.in_ports()` order) under `mode`, returning the primary-output
/// values in `dag.out_ports()` order.
pub fn simulate(dag: &Dag, inputs: &[bool], mode: PimMode) -> anyhow::Result<Vec<bool>> {
    if inputs.len() != dag.in_ports().len() {
        anyhow::bail!(CktError::Verification {
            vector: TestVector::AllZero,
            message: format!(
                "expected {} primary inputs, got {}",
                dag.in_ports().len(),
                inputs.len()
            ),
        });
    }

    let mut values: HashMap<Sym, bool> = HashMap::new();
    for (port, value) in dag.in_ports().iter().zip(inputs) {
        values.insert(dag.wire_base_name(port), *value);
    }

    for id in dag.topo_order() {
        evaluate_gate(dag, &id, &mut values, mode)?;
    }

    dag.out_ports()
        .iter()
        .map(|port| {
            values.get(&dag.wire_base_name(port)).copied().ok_or_else(|| {
                CktError::Verification {
                    vector: TestVector::AllZero,
                    message: format!("output port '{port}' was never assigned"),
                }
                .into()
            })
        })
        .collect()
}

fn evaluate_gate(
    dag: &Dag,
    id: &Sym,
    values: &mut HashMap<Sym, bool>,
    mode: PimMode,
) -> anyhow::Result<()> {
    let Some(gate) = dag.gate(id) else {
        anyhow::bail!(CktError::Invariant {
            gate_or_wire: id.to_string(),
            message: "gate disappeared during simulation".into(),
        });
    };

    if gate.gate_func == GateFunc::InPort {
        return Ok(());
    }

    let base_inputs: Vec<Sym> = gate.inputs.iter().map(|w| dag.wire_base_name(w)).collect();
    let inverted: Vec<bool> = gate.inputs.iter().map(|w| gate.is_inverted(w)).collect();
    let mut input_values = Vec::with_capacity(base_inputs.len());
    for (base, inv) in base_inputs.iter().zip(&inverted) {
        let value = *values.get(base).ok_or_else(|| CktError::Invariant {
            gate_or_wire: base.to_string(),
            message: "referenced before being assigned during simulation".into(),
        })?;
        input_values.push(if *inv { !value } else { value });
    }

    let output_value = if gate.gate_func == GateFunc::OutPort {
        input_values[0]
    } else {
        gate.gate_func.eval(&input_values)
    };

    for out_wire in &gate.outputs {
        values.insert(dag.wire_base_name(out_wire), output_value);
    }

    if mode == PimMode::Analog && gate.gate_func.is_input_destroying() {
        for (base, inv) in base_inputs.iter().zip(&inverted) {
            let value = if *inv { !output_value } else { output_value };
            values.insert(base.clone(), value);
        }
    }

    Ok(())
}

/// Simulates both DAGs over the four canonical vectors (sized to
/// `reference`'s input count) and fails on the first output mismatch —
/// the contract a transformation pass's self-check runs before and after
/// every edit.
pub fn verify_equivalent(reference: &Dag, candidate: &Dag, mode: PimMode) -> anyhow::Result<()> {
    if reference.in_ports().len() != candidate.in_ports().len()
        || reference.out_ports().len() != candidate.out_ports().len()
    {
        anyhow::bail!(CktError::Verification {
            vector: TestVector::AllZero,
            message: "port count mismatch between reference and candidate DAGs".into(),
        });
    }

    for (vector, inputs) in canonical_vectors(reference.in_ports().len()) {
        let expected = simulate(reference, &inputs, mode)?;
        let actual = simulate(candidate, &inputs, mode)?;
        if expected != actual {
            anyhow::bail!(CktError::Verification {
                vector,
                message: format!("expected {expected:?}, got {actual:?}"),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::GateInfo;
    use crate::debug::DebugLevel;

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
    fn half_adder_truth_table() {
        let dag = half_adder();
        assert_eq!(
            simulate(&dag, &[false, false], PimMode::Digital).unwrap(),
            vec![false, false]
        );
        assert_eq!(
            simulate(&dag, &[true, false], PimMode::Digital).unwrap(),
            vec![true, false]
        );
        assert_eq!(
            simulate(&dag, &[true, true], PimMode::Digital).unwrap(),
            vec![false, true]
        );
    }

    #[test]
    fn identical_dags_verify_equivalent() {
        let dag = half_adder();
        verify_equivalent(&dag, &dag, PimMode::Digital).unwrap();
    }
}
