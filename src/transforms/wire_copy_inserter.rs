//! `WireCopyInserter` (analog, final pass): the fixed-point pass that
//! guarantees the analog final property (spec §3, §8): every wire drives
//! at most one input-destroying consumer, and only when it drives nothing
//! else. Runs on a work-queue of wires, resolving one colliding pair at a
//! time per wire until none remain.

use super::{DagTransform, TransformSummary};
use crate::dag::{Dag, Gate, GateFunc};
use crate::ir::Sym;

/// Inserts `copy_inout` gates until every wire satisfies the analog
/// final property.
#[derive(Debug, Default)]
pub struct WireCopyInserter;

impl DagTransform for WireCopyInserter {
    fn name(&self) -> &'static str {
        "WireCopyInserter"
    }

    fn apply(&self, dag: &mut Dag) -> anyhow::Result<TransformSummary> {
        let mut summary = TransformSummary {
            pass_name: self.name().into(),
            ..Default::default()
        };

        let work_queue: Vec<Sym> = dag.wire_name_list(false, false);

        for wire in work_queue {
            loop {
                let consumers = dag.wire_fanout_gate_ids(&wire);
                if consumers.len() < 2 {
                    break;
                }
                let destroying_count = consumers.iter().filter(|c| is_destroying(dag, c)).count();
                if destroying_count == 0 {
                    break;
                }
                let anchor = consumers[0].clone();
                let other = consumers[1..]
                    .iter()
                    .find(|c| is_destroying(dag, c))
                    .cloned()
                    .unwrap_or_else(|| consumers[1].clone());
                insert_copy_inout(dag, &wire, &anchor, &other, &mut summary)?;
            }
        }

        Ok(summary)
    }
}

fn is_destroying(dag: &Dag, id: &Sym) -> bool {
    dag.gate(id).is_some_and(|g| g.gate_func.is_input_destroying())
}

fn insert_copy_inout(
    dag: &mut Dag,
    wire: &Sym,
    anchor: &Sym,
    other: &Sym,
    summary: &mut TransformSummary,
) -> anyhow::Result<()> {
    let producer = dag.wire_fanin_gate_ids(wire).into_iter().next().ok_or_else(|| {
        anyhow::anyhow!("wire '{wire}' has no producer during WireCopyInserter")
    })?;
    let copy_id = dag.uniqufy_gate_id(&format!("copy_inout_{wire}"));
    let anchor_segment = dag.generate_unique_wire_segment_name(wire);
    let other_wire = dag.uniqufy_wire_name(wire.as_str());

    let anchor_inverted = dag.gate(anchor).is_some_and(|g| g.is_inverted(wire));
    let other_inverted = dag.gate(other).is_some_and(|g| g.is_inverted(wire));

    dag.remove_wire(&producer, anchor)?;
    summary.wires_removed += 1;
    dag.remove_wire(&producer, other)?;
    summary.wires_removed += 1;

    dag.add_gate(Gate::new(
        copy_id.clone(),
        GateFunc::CopyInout,
        vec![wire.clone()],
        vec![anchor_segment.clone(), other_wire.clone()],
    ))?;
    summary.gates_added += 1;

    dag.add_wire(wire.clone(), producer.clone(), copy_id.clone())?;
    summary.wires_added += 1;
    // The anchor's edge is routed through a new segment of the copied
    // wire: this is the implicit scheduling dependency from spec §4.3,
    // making the anchor's consumption happen only after this TRA runs.
    dag.add_wire(anchor_segment.clone(), copy_id.clone(), anchor.clone())?;
    summary.wires_added += 1;
    dag.add_wire(other_wire.clone(), copy_id.clone(), other.clone())?;
    summary.wires_added += 1;

    for w in dag.gate_mut(anchor)?.inputs.iter_mut() {
        if w == wire {
            *w = anchor_segment.clone();
        }
    }
    dag.gate_mut(anchor)?.inverted.remove(wire);
    if anchor_inverted {
        dag.gate_mut(anchor)?.inverted.insert(anchor_segment);
    }

    for w in dag.gate_mut(other)?.inputs.iter_mut() {
        if w == wire {
            *w = other_wire.clone();
        }
    }
    dag.gate_mut(other)?.inverted.remove(wire);
    if other_inverted {
        dag.gate_mut(other)?.inverted.insert(other_wire);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::{GateInfo, PimMode};
    use crate::debug::DebugLevel;
    use crate::verify::{canonical_vectors, simulate};

    #[test]
    fn splits_a_wire_feeding_two_destroying_consumers() {
        let dag = Dag::new(
            "m",
            vec![Sym::new("a"), Sym::new("b"), Sym::new("c"), Sym::new("d")],
            vec![Sym::new("o0"), Sym::new("o1")],
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
                    inputs: vec![Sym::new("m"), Sym::new("a"), Sym::new("d")],
                    outputs: vec![Sym::new("o0")],
                },
                GateInfo {
                    gate_id: Sym::new("g2"),
                    gate_func: GateFunc::Maj3,
                    inputs: vec![Sym::new("m"), Sym::new("b"), Sym::new("d")],
                    outputs: vec![Sym::new("o1")],
                },
            ],
            DebugLevel::SILENT,
        )
        .unwrap();

        let mut dag = dag;
        let before = canonical_vectors(4);
        let expected: Vec<_> = before
            .iter()
            .map(|(_, v)| simulate(&dag, v, PimMode::Analog).unwrap())
            .collect();

        let summary = WireCopyInserter.apply(&mut dag).unwrap();
        assert_eq!(summary.gates_added, 1);
        dag.sanity_check(PimMode::Analog).unwrap();

        let m_consumers = dag.wire_fanout_gate_ids(&Sym::new("m"));
        assert_eq!(m_consumers.len(), 1, "the original wire now only feeds the inserted copy");

        for (i, (_, v)) in before.iter().enumerate() {
            assert_eq!(simulate(&dag, v, PimMode::Analog).unwrap(), expected[i]);
        }
    }

    #[test]
    fn is_a_no_op_once_converged() {
        let dag = Dag::new(
            "m",
            vec![Sym::new("a"), Sym::new("b"), Sym::new("c"), Sym::new("d")],
            vec![Sym::new("o0"), Sym::new("o1")],
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
                    inputs: vec![Sym::new("m"), Sym::new("a"), Sym::new("d")],
                    outputs: vec![Sym::new("o0")],
                },
                GateInfo {
                    gate_id: Sym::new("g2"),
                    gate_func: GateFunc::Maj3,
                    inputs: vec![Sym::new("m"), Sym::new("b"), Sym::new("d")],
                    outputs: vec![Sym::new("o1")],
                },
            ],
            DebugLevel::SILENT,
        )
        .unwrap();

        let mut dag = dag;
        WireCopyInserter.apply(&mut dag).unwrap();
        let second = WireCopyInserter.apply(&mut dag).unwrap();
        assert_eq!(second.gates_added, 0, "re-running after convergence is a no-op");
    }
}
