//! `MajNormalizer`: rewrites `and2(a,b)` as `maj3(a,b,zero)` and
//! `or2(a,b)` as `maj3(a,b,one)` (spec §4.3).

use super::{DagTransform, TransformSummary};
use crate::dag::{Dag, Gate, GateFunc};
use crate::ir::Sym;

/// How fresh `zero`/`one` constant sources are allocated for each
/// rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConstantAllocationStrategy {
    /// A fresh constant gate per rewrite — simpler scheduling (no extra
    /// fan-out to reason about), at the cost of more gates. The default.
    #[default]
    FreshPerRewrite,
    /// A single shared `zero` gate and a single shared `one` gate reused
    /// by every rewrite — smaller output at the cost of increased
    /// fan-out on the two constant sources.
    SharedPair,
}

/// Rewrites every `and2`/`or2` gate into an equivalent `maj3`.
#[derive(Debug)]
pub struct MajNormalizer {
    strategy: ConstantAllocationStrategy,
}

impl Default for MajNormalizer {
    fn default() -> Self {
        MajNormalizer {
            strategy: ConstantAllocationStrategy::default(),
        }
    }
}

impl MajNormalizer {
    /// Builds a normalizer using the given constant-allocation strategy.
    pub fn new(strategy: ConstantAllocationStrategy) -> Self {
        MajNormalizer { strategy }
    }
}

impl DagTransform for MajNormalizer {
    fn name(&self) -> &'static str {
        "MajNormalizer"
    }

    fn apply(&self, dag: &mut Dag) -> anyhow::Result<TransformSummary> {
        let mut summary = TransformSummary {
            pass_name: self.name().into(),
            ..Default::default()
        };

        let mut shared_zero: Option<Sym> = None;
        let mut shared_one: Option<Sym> = None;

        let targets: Vec<Sym> = dag
            .gate_ids()
            .filter(|id| {
                dag.gate(id)
                    .is_some_and(|g| matches!(g.gate_func, GateFunc::And2 | GateFunc::Or2))
            })
            .cloned()
            .collect();

        for id in targets {
            let gate_func = dag.gate(&id).unwrap().gate_func;
            let const_func = match gate_func {
                GateFunc::And2 => GateFunc::Zero,
                GateFunc::Or2 => GateFunc::One,
                _ => unreachable!(),
            };

            let const_wire = match self.strategy {
                ConstantAllocationStrategy::FreshPerRewrite => {
                    let const_id = dag.uniqufy_gate_id(const_func.blif_keyword().unwrap());
                    let const_wire = dag.uniqufy_wire_name(const_func.blif_keyword().unwrap());
                    dag.add_gate(Gate::new(const_id.clone(), const_func, vec![], vec![const_wire.clone()]))?;
                    summary.gates_added += 1;
                    dag.add_wire(const_wire.clone(), const_id, id.clone())?;
                    summary.wires_added += 1;
                    const_wire
                }
                ConstantAllocationStrategy::SharedPair => {
                    let slot = match const_func {
                        GateFunc::Zero => &mut shared_zero,
                        GateFunc::One => &mut shared_one,
                        _ => unreachable!(),
                    };
                    let wire = match slot {
                        Some(w) => w.clone(),
                        None => {
                            let const_id = dag.uniqufy_gate_id(const_func.blif_keyword().unwrap());
                            let const_wire = dag.uniqufy_wire_name(const_func.blif_keyword().unwrap());
                            dag.add_gate(Gate::new(
                                const_id.clone(),
                                const_func,
                                vec![],
                                vec![const_wire.clone()],
                            ))?;
                            summary.gates_added += 1;
                            *slot = Some(const_wire.clone());
                            const_wire
                        }
                    };
                    let const_id = dag.wire_fanin_gate_ids(&wire).into_iter().next().unwrap();
                    dag.add_wire(wire.clone(), const_id, id.clone())?;
                    summary.wires_added += 1;
                    wire
                }
            };

            dag.push_gate_input(&id, const_wire)?;
            dag.set_gate_func(&id, GateFunc::Maj3)?;
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::{GateInfo, PimMode};
    use crate::debug::DebugLevel;
    use crate::verify::{canonical_vectors, simulate};

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
    fn rewrites_and2_to_maj3_with_zero_and_preserves_function() {
        let mut dag = half_adder();
        let before_vectors = canonical_vectors(2);
        let before: Vec<_> = before_vectors
            .iter()
            .map(|(_, v)| simulate(&dag, v, PimMode::Digital).unwrap())
            .collect();

        MajNormalizer::default().apply(&mut dag).unwrap();
        dag.sanity_check(PimMode::Digital).unwrap();

        let cout_gate_id = dag.wire_fanin_gate_ids(&Sym::new("cout"))[0].clone();
        let cout_gate = dag.gate(&cout_gate_id).unwrap();
        assert_eq!(cout_gate.gate_func, GateFunc::Maj3);
        assert_eq!(cout_gate.inputs.len(), 3);

        for (i, (_, v)) in before_vectors.iter().enumerate() {
            assert_eq!(simulate(&dag, v, PimMode::Digital).unwrap(), before[i]);
        }
    }

    #[test]
    fn shared_pair_strategy_reuses_one_zero_gate() {
        let mut dag = half_adder();
        MajNormalizer::new(ConstantAllocationStrategy::SharedPair)
            .apply(&mut dag)
            .unwrap();
        let zero_gates: Vec<_> = dag
            .gate_ids()
            .filter(|id| dag.gate(id).is_some_and(|g| g.gate_func == GateFunc::Zero))
            .collect();
        assert_eq!(zero_gates.len(), 1);
    }
}
