//! `InoutVarReusing` (analog only): routes a destructive consumer's read
//! of an input-destroying gate's output through a fresh segment of one of
//! that gate's own already-destroyed input rows, instead of the output
//! wire itself — the storage already holds the right value once the
//! verifier's "input-destroying gates also overwrite their inputs" rule
//! has run, so this costs nothing extra at execution time (spec §4.3).

use super::{DagTransform, TransformSummary};
use crate::dag::Dag;
use crate::ir::Sym;

/// For each input-destroying gate, in topological order, redirects as
/// many input-destroying fan-outs of its outputs as possible onto fresh
/// segments of its own reusable inout wires.
#[derive(Debug, Default)]
pub struct InoutVarReusing;

impl DagTransform for InoutVarReusing {
    fn name(&self) -> &'static str {
        "InoutVarReusing"
    }

    fn apply(&self, dag: &mut Dag) -> anyhow::Result<TransformSummary> {
        let mut summary = TransformSummary {
            pass_name: self.name().into(),
            ..Default::default()
        };

        let order: Vec<Sym> = dag
            .topo_order()
            .into_iter()
            .filter(|id| dag.gate(id).is_some_and(|g| g.gate_func.is_input_destroying()))
            .collect();

        for gate_id in order {
            let mut reusable = dag.get_reusable_inout_wires(&gate_id).into_iter();
            let outputs = dag.gate(&gate_id).map(|g| g.outputs.clone()).unwrap_or_default();

            'outputs: for out_wire in outputs {
                for consumer in dag.wire_fanout_gate_ids(&out_wire) {
                    if !dag.gate(&consumer).is_some_and(|g| g.gate_func.is_input_destroying()) {
                        continue;
                    }
                    let Some(reuse_wire) = reusable.next() else {
                        break 'outputs;
                    };
                    let segment = dag.generate_unique_wire_segment_name(&reuse_wire);
                    let was_inverted = dag.gate(&consumer).is_some_and(|g| g.is_inverted(&out_wire));

                    dag.remove_wire(&gate_id, &consumer)?;
                    summary.wires_removed += 1;
                    dag.add_wire(segment.clone(), gate_id.clone(), consumer.clone())?;
                    summary.wires_added += 1;

                    for w in dag.gate_mut(&consumer)?.inputs.iter_mut() {
                        if *w == out_wire {
                            *w = segment.clone();
                        }
                    }
                    dag.gate_mut(&consumer)?.inverted.remove(&out_wire);
                    if was_inverted {
                        dag.gate_mut(&consumer)?.inverted.insert(segment.clone());
                    }
                }
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::{GateFunc, GateInfo, PimMode};
    use crate::debug::DebugLevel;
    use crate::transforms::{InputPortIsolation, MajNormalizer};
    use crate::verify::{canonical_vectors, simulate};

    #[test]
    fn reuses_a_destroyed_input_for_a_downstream_maj() {
        // maj3(a,b,c) -> m; maj3(m, x, y) -> z. After reuse, z's gate
        // reads a fresh segment of one of {a,b,c} instead of `m` directly.
        let dag = Dag::new(
            "chain",
            vec![Sym::new("a"), Sym::new("b"), Sym::new("c"), Sym::new("x"), Sym::new("y")],
            vec![Sym::new("z")],
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
                    inputs: vec![Sym::new("m"), Sym::new("x"), Sym::new("y")],
                    outputs: vec![Sym::new("z")],
                },
            ],
            DebugLevel::SILENT,
        )
        .unwrap();

        let mut dag = dag;
        InputPortIsolation.apply(&mut dag).unwrap();
        MajNormalizer::default().apply(&mut dag).unwrap(); // no-op: no and2/or2 present
        let before = canonical_vectors(5);
        let expected: Vec<_> = before
            .iter()
            .map(|(_, v)| simulate(&dag, v, PimMode::Analog).unwrap())
            .collect();

        let summary = InoutVarReusing.apply(&mut dag).unwrap();
        assert!(summary.wires_added > 0, "should have reused at least one input row");
        dag.sanity_check(PimMode::Analog).unwrap();

        for (i, (_, v)) in before.iter().enumerate() {
            assert_eq!(simulate(&dag, v, PimMode::Analog).unwrap(), expected[i]);
        }
    }
}
