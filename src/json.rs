//! JSON (de)serialization of a [`Dag`], for the round-trip property in
//! spec §8 (`load(save(d)) ≅ d` up to port-list ordering) and for passing
//! a DAG snapshot between pipeline stages run as separate processes.

use crate::dag::{Dag, GateFunc, GateInfo, PimMode};
use crate::debug::DebugLevel;
use crate::ir::Sym;
use serde::{Deserialize, Serialize};

/// A flat, serializable snapshot of a [`Dag`]: module name, port lists,
/// and gate records. This is the wire format, not `Dag` itself — `Dag`
/// carries derived edge/adjacency indices that are rebuilt on load rather
/// than serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DagSnapshot {
    /// The module name.
    pub module_name: String,
    /// Ordered input port names.
    pub in_ports: Vec<String>,
    /// Ordered output port names.
    pub out_ports: Vec<String>,
    /// Every non-port gate, in insertion order.
    pub gates: Vec<GateRecord>,
}

/// One gate's serialized record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateRecord {
    /// Gate id.
    pub gate_id: String,
    /// Gate function, spelled as its BLIF keyword (or `in_port`/`out_port`
    /// for port gates, which are reconstructed from the port lists and
    /// never appear here).
    pub gate_func: String,
    /// Ordered input wire names.
    pub inputs: Vec<String>,
    /// Ordered output wire names.
    pub outputs: Vec<String>,
    /// Subset of `inputs` consumed complemented.
    pub inverted: Vec<String>,
}

/// Renders `dag` to a [`DagSnapshot`] and serializes it as pretty JSON.
pub fn to_json(dag: &Dag) -> anyhow::Result<String> {
    let mut gates = Vec::new();
    for id in dag.gate_ids() {
        if dag.is_in_port(id) || dag.is_out_port(id) {
            continue;
        }
        let gate = dag.gate(id).expect("gate_ids yields existing gates");
        gates.push(GateRecord {
            gate_id: gate.gate_id.to_string(),
            gate_func: gate_func_tag(gate.gate_func).to_string(),
            inputs: gate.inputs.iter().map(Sym::to_string).collect(),
            outputs: gate.outputs.iter().map(Sym::to_string).collect(),
            inverted: gate.inverted.iter().map(Sym::to_string).collect(),
        });
    }
    let snapshot = DagSnapshot {
        module_name: dag.module_name().to_string(),
        in_ports: dag.in_ports().iter().map(Sym::to_string).collect(),
        out_ports: dag.out_ports().iter().map(Sym::to_string).collect(),
        gates,
    };
    Ok(serde_json::to_string_pretty(&snapshot)?)
}

/// Parses a snapshot produced by [`to_json`] back into a [`Dag`].
pub fn from_json(text: &str, debug_level: DebugLevel) -> anyhow::Result<Dag> {
    let snapshot: DagSnapshot = serde_json::from_str(text)?;
    let in_ports: Vec<Sym> = snapshot.in_ports.iter().map(Sym::new).collect();
    let out_ports: Vec<Sym> = snapshot.out_ports.iter().map(Sym::new).collect();

    let mut gate_infos = Vec::with_capacity(snapshot.gates.len());
    for record in &snapshot.gates {
        let gate_func = gate_func_from_tag(&record.gate_func)?;
        gate_infos.push(GateInfo {
            gate_id: Sym::new(record.gate_id.as_str()),
            gate_func,
            inputs: record.inputs.iter().map(Sym::new).collect(),
            outputs: record.outputs.iter().map(Sym::new).collect(),
        });
    }

    let mut dag = Dag::new(
        snapshot.module_name,
        in_ports,
        out_ports,
        gate_infos,
        debug_level,
    )?;

    for record in &snapshot.gates {
        let id = Sym::new(record.gate_id.as_str());
        for wire in &record.inverted {
            dag.invert_input_wire(&id, &Sym::new(wire.as_str()))?;
        }
    }

    dag.sanity_check(PimMode::Digital).ok();
    Ok(dag)
}

fn gate_func_tag(func: GateFunc) -> &'static str {
    func.blif_keyword().unwrap_or("unknown")
}

fn gate_func_from_tag(tag: &str) -> anyhow::Result<GateFunc> {
    [
        GateFunc::Inv1,
        GateFunc::And2,
        GateFunc::Or2,
        GateFunc::Nand2,
        GateFunc::Nor2,
        GateFunc::Xor2,
        GateFunc::Xnor2,
        GateFunc::Mux2,
        GateFunc::Maj3,
        GateFunc::Copy,
        GateFunc::CopyInout,
        GateFunc::Zero,
        GateFunc::One,
    ]
    .into_iter()
    .find(|f| f.blif_keyword() == Some(tag))
    .ok_or_else(|| anyhow::anyhow!("unknown gate function tag '{tag}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::GateInfo;

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
    fn round_trips_through_json() {
        let dag = half_adder();
        let text = to_json(&dag).unwrap();
        let loaded = from_json(&text, DebugLevel::SILENT).unwrap();
        assert_eq!(loaded.module_name(), dag.module_name());
        assert_eq!(loaded.num_gates(), dag.num_gates());
        loaded.sanity_check(PimMode::Digital).unwrap();
    }
}
