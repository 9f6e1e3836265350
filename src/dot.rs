//! Graphviz DOT export — the static visualization hook called out in
//! spec §2's "DAG verifier & utilities" row. No interactive rendering: a
//! systems crate emits DOT text and leaves layout to `dot`/`xdot`.

use crate::dag::Dag;
use std::fmt::Write as _;

/// Renders `dag` as a Graphviz `digraph`. Port gates are drawn as boxes,
/// internal gates as ovals labeled with their function, and `inverted`
/// edges are dashed.
pub fn write_dot(dag: &Dag) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "digraph {} {{", sanitize(dag.module_name()));
    let _ = writeln!(out, "  rankdir=LR;");

    for id in dag.gate_ids() {
        let Some(gate) = dag.gate(id) else { continue };
        let shape = if gate.gate_func.is_port() { "box" } else { "oval" };
        let label = if gate.gate_func.is_port() {
            id.to_string()
        } else {
            format!("{id}\\n{:?}", gate.gate_func)
        };
        let _ = writeln!(
            out,
            "  \"{}\" [shape={shape}, label=\"{label}\"];",
            sanitize(id.as_str())
        );
    }

    for id in dag.gate_ids() {
        for succ in dag.successors(id) {
            let Some(wire) = dag.wire_name(id, succ) else { continue };
            let style = dag
                .gate(succ)
                .is_some_and(|g| g.is_inverted(wire))
                .then_some("dashed")
                .unwrap_or("solid");
            let _ = writeln!(
                out,
                "  \"{}\" -> \"{}\" [label=\"{}\", style={style}];",
                sanitize(id.as_str()),
                sanitize(succ.as_str()),
                wire
            );
        }
    }

    out.push_str("}\n");
    out
}

fn sanitize(s: &str) -> String {
    s.replace('"', "'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::{GateFunc, GateInfo};
    use crate::debug::DebugLevel;
    use crate::ir::Sym;

    #[test]
    fn emits_a_digraph_with_every_gate() {
        let dag = Dag::new(
            "m",
            vec![Sym::new("a")],
            vec![Sym::new("b")],
            vec![GateInfo {
                gate_id: Sym::new("g0"),
                gate_func: GateFunc::Inv1,
                inputs: vec![Sym::new("a")],
                outputs: vec![Sym::new("b")],
            }],
            DebugLevel::SILENT,
        )
        .unwrap();
        let dot = write_dot(&dag);
        assert!(dot.starts_with("digraph"));
        assert!(dot.contains("g0"));
        assert!(dot.ends_with("}\n"));
    }
}
