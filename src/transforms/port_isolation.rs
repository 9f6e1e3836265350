//! `InputPortIsolation`: decouples port storage from the register rows
//! analog TRA will destroy, by splicing exactly one `copy` gate between
//! each port and the wire its consumers actually read (spec §4.3).

use super::{DagTransform, TransformSummary};
use crate::dag::{Dag, Gate, GateFunc};
use crate::ir::Sym;

/// Splices a `copy` gate between every input port and its consumers, and
/// symmetrically inserts a `copy` gate before every output port whose
/// wire is also read by internal logic.
#[derive(Debug, Default)]
pub struct InputPortIsolation;

impl DagTransform for InputPortIsolation {
    fn name(&self) -> &'static str {
        "InputPortIsolation"
    }

    fn apply(&self, dag: &mut Dag) -> anyhow::Result<TransformSummary> {
        let mut summary = TransformSummary {
            pass_name: self.name().into(),
            ..Default::default()
        };

        for port in dag.in_ports().to_vec() {
            isolate_input_port(dag, &port, &mut summary)?;
        }
        for port in dag.out_ports().to_vec() {
            isolate_output_port(dag, &port, &mut summary)?;
        }

        Ok(summary)
    }
}

fn isolate_input_port(dag: &mut Dag, port: &Sym, summary: &mut TransformSummary) -> anyhow::Result<()> {
    let consumers = dag.wire_fanout_gate_ids(port);
    if consumers.is_empty() {
        return Ok(());
    }

    let fresh = dag.uniqufy_wire_name(port.as_str());
    let copy_id = dag.uniqufy_gate_id(&format!("copy_in_{port}"));

    for consumer in &consumers {
        dag.remove_wire(port, consumer)?;
        summary.wires_removed += 1;
    }

    dag.add_gate(Gate::new(copy_id.clone(), GateFunc::Copy, vec![port.clone()], vec![fresh.clone()]))?;
    summary.gates_added += 1;
    dag.add_wire(port.clone(), port.clone(), copy_id.clone())?;
    summary.wires_added += 1;

    for consumer in &consumers {
        dag.add_wire(fresh.clone(), copy_id.clone(), consumer.clone())?;
        summary.wires_added += 1;
        while dag
            .gate(consumer)
            .is_some_and(|g| g.inputs.iter().any(|w| w == port))
        {
            dag.replace_input_wire(consumer, port, &fresh)?;
        }
    }
    Ok(())
}

fn isolate_output_port(dag: &mut Dag, port: &Sym, summary: &mut TransformSummary) -> anyhow::Result<()> {
    let producers = dag.wire_fanin_gate_ids(port);
    let Some(producer) = producers.into_iter().next() else {
        return Ok(());
    };
    let mut consumers = dag.wire_fanout_gate_ids(port);
    // The out_port gate itself is always a consumer of its own wire; the
    // pass only has work to do when some *other* gate reads it too.
    consumers.retain(|c| c != port);
    if consumers.is_empty() {
        return Ok(());
    }

    let fresh = dag.uniqufy_wire_name(port.as_str());
    let copy_id = dag.uniqufy_gate_id(&format!("copy_out_{port}"));

    let mut all_old_consumers = consumers.clone();
    all_old_consumers.push(port.clone());
    for consumer in &all_old_consumers {
        dag.remove_wire(&producer, consumer)?;
        summary.wires_removed += 1;
    }

    for out in dag.gate_mut(&producer)?.outputs.iter_mut() {
        if out == port {
            *out = fresh.clone();
        }
    }

    for consumer in &consumers {
        dag.add_wire(fresh.clone(), producer.clone(), consumer.clone())?;
        summary.wires_added += 1;
        while dag
            .gate(consumer)
            .is_some_and(|g| g.inputs.iter().any(|w| w == port))
        {
            dag.replace_input_wire(consumer, port, &fresh)?;
        }
    }

    dag.add_gate(Gate::new(copy_id.clone(), GateFunc::Copy, vec![fresh.clone()], vec![port.clone()]))?;
    summary.gates_added += 1;
    dag.add_wire(fresh.clone(), producer.clone(), copy_id.clone())?;
    summary.wires_added += 1;
    dag.add_wire(port.clone(), copy_id.clone(), port.clone())?;
    summary.wires_added += 1;

    Ok(())
}
