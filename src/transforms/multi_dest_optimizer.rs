//! `MultiDestOptimizer` (analog only, optional): packs up to three
//! parallel destinations onto a single `maj3`'s TRA, so each
//! input-destroying downstream consumer gets a fresh copy from the same
//! activation instead of via an explicit `copy_inout` (spec §4.3).
//!
//! Per the Open Question in spec §9, this pass must run before
//! `InoutVarReusing` (the prescribed position in [`super::analog_pipeline`])
//! so a packed destination never has to coexist with an in-out-reuse
//! segment on the same wire.

use super::{DagTransform, TransformSummary};
use crate::dag::{Dag, GateFunc};
use crate::ir::Sym;

/// Up to three destinations per packed TRA activation.
const MAX_PACKED_DESTINATIONS: usize = 3;

/// Splits a `maj3` gate's single output wire into up to three dedicated
/// output wires when it drives more than one consumer.
#[derive(Debug, Default)]
pub struct MultiDestOptimizer;

impl DagTransform for MultiDestOptimizer {
    fn name(&self) -> &'static str {
        "MultiDestOptimizer"
    }

    fn apply(&self, dag: &mut Dag) -> anyhow::Result<TransformSummary> {
        let mut summary = TransformSummary {
            pass_name: self.name().into(),
            ..Default::default()
        };

        let targets: Vec<Sym> = dag
            .gate_ids()
            .filter(|id| {
                dag.gate(id)
                    .is_some_and(|g| g.gate_func == GateFunc::Maj3 && g.outputs.len() == 1)
            })
            .cloned()
            .collect();

        for gate_id in targets {
            let out_wire = dag.gate(&gate_id).unwrap().outputs[0].clone();
            let consumers = dag.wire_fanout_gate_ids(&out_wire);
            if consumers.len() <= 1 {
                continue;
            }
            let take = consumers.len().min(MAX_PACKED_DESTINATIONS);

            for consumer in consumers.iter().take(take).skip(1) {
                let dedicated = dag.uniqufy_wire_name(out_wire.as_str());
                let was_inverted = dag.gate(consumer).is_some_and(|g| g.is_inverted(&out_wire));

                dag.remove_wire(&gate_id, consumer)?;
                summary.wires_removed += 1;
                dag.add_wire(dedicated.clone(), gate_id.clone(), consumer.clone())?;
                summary.wires_added += 1;

                for w in dag.gate_mut(consumer)?.inputs.iter_mut() {
                    if *w == out_wire {
                        *w = dedicated.clone();
                    }
                }
                dag.gate_mut(consumer)?.inverted.remove(&out_wire);
                if was_inverted {
                    dag.gate_mut(consumer)?.inverted.insert(dedicated.clone());
                }
                dag.push_gate_output(&gate_id, dedicated)?;
            }
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

    #[test]
    fn packs_three_downstream_majs_into_one_destination_set() {
        let dag = Dag::new(
            "fanout3",
            vec![Sym::new("a"), Sym::new("b"), Sym::new("c")],
            vec![Sym::new("o0"), Sym::new("o1"), Sym::new("o2")],
            vec![
                GateInfo {
                    gate_id: Sym::new("g0"),
                    gate_func: GateFunc::Maj3,
                    inputs: vec![Sym::new("a"), Sym::new("b"), Sym::new("c")],
                    outputs: vec![Sym::new("m")],
                },
                GateInfo {
                    gate_id: Sym::new("g1"),
                    gate_func: GateFunc::Maj3,
                    inputs: vec![Sym::new("m"), Sym::new("a"), Sym::new("b")],
                    outputs: vec![Sym::new("o0")],
                },
                GateInfo {
                    gate_id: Sym::new("g2"),
                    gate_func: GateFunc::Maj3,
                    inputs: vec![Sym::new("m"), Sym::new("b"), Sym::new("c")],
                    outputs: vec![Sym::new("o1")],
                },
                GateInfo {
                    gate_id: Sym::new("g3"),
                    gate_func: GateFunc::Maj3,
                    inputs: vec![Sym::new("m"), Sym::new("a"), Sym::new("c")],
                    outputs: vec![Sym::new("o2")],
                },
            ],
            DebugLevel::SILENT,
        )
        .unwrap();

        let mut dag = dag;
        let before = canonical_vectors(3);
        let expected: Vec<_> = before
            .iter()
            .map(|(_, v)| simulate(&dag, v, PimMode::Analog).unwrap())
            .collect();

        MultiDestOptimizer.apply(&mut dag).unwrap();
        dag.sanity_check(PimMode::Analog).unwrap();

        let g0 = dag.gate(&Sym::new("g0")).unwrap();
        assert_eq!(g0.outputs.len(), 3, "three consumers should pack into three destinations");

        for (i, (_, v)) in before.iter().enumerate() {
            assert_eq!(simulate(&dag, v, PimMode::Analog).unwrap(), expected[i]);
        }
    }
}
