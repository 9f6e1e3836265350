//! BLIF frontend: turns `.model`/`.inputs`/`.outputs`/`.gate`/`.end` text
//! into a [`Dag`].
//!
//! The grammar accepted here is the small bit-serial subset emitted by the
//! upstream synthesis flow (`yosys` + `ABC`) rather than full BLIF: one
//! `.model`, one `.inputs`/`.outputs` line each, and one-line `.gate`
//! declarations of the form `.gate <func> a=<wire> b=<wire> ... O=<wire>`.
//! A trailing backslash continues a logical line onto the next physical
//! line, and `#` starts a comment that runs to end of line.

use crate::dag::{Dag, GateFunc, PimMode};
use crate::debug::DebugLevel;
use crate::dag::GateInfo;
use crate::error::CktError;
use crate::ir::Sym;

/// Parses BLIF text into a [`Dag`], assigning gate ids in declaration
/// order (`g0`, `g1`, ...) since BLIF `.gate` lines carry no id of their
/// own.
pub fn parse_blif(content: &str, debug_level: DebugLevel) -> anyhow::Result<Dag> {
    let joined = join_continuations(content);

    let mut module_name = None;
    let mut in_ports = Vec::new();
    let mut out_ports = Vec::new();
    let mut gate_infos = Vec::new();
    let mut seen_end = false;
    let mut gate_count = 0usize;

    for (lineno, raw_line) in joined.iter().enumerate() {
        let line_no = lineno + 1;
        let line = strip_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix(".model") {
            module_name = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix(".inputs") {
            in_ports.extend(rest.split_whitespace().map(Sym::new));
        } else if let Some(rest) = line.strip_prefix(".outputs") {
            out_ports.extend(rest.split_whitespace().map(Sym::new));
        } else if let Some(rest) = line.strip_prefix(".gate") {
            gate_infos.push(parse_gate_line(rest, gate_count, line_no)?);
            gate_count += 1;
        } else if line == ".end" {
            seen_end = true;
        } else {
            anyhow::bail!(CktError::Parse {
                line: line_no,
                message: format!("unrecognized BLIF directive: '{line}'"),
            });
        }
    }

    let module_name = module_name.ok_or_else(|| CktError::Parse {
        line: 0,
        message: "missing .model declaration".into(),
    })?;
    if !seen_end {
        anyhow::bail!(CktError::Parse {
            line: joined.len(),
            message: "missing .end directive".into(),
        });
    }
    if in_ports.is_empty() {
        anyhow::bail!(CktError::Parse {
            line: 0,
            message: "missing .inputs declaration".into(),
        });
    }
    if out_ports.is_empty() {
        anyhow::bail!(CktError::Parse {
            line: 0,
            message: "missing .outputs declaration".into(),
        });
    }

    Dag::new(module_name, in_ports, out_ports, gate_infos, debug_level)
}

fn parse_gate_line(rest: &str, gate_count: usize, line_no: usize) -> anyhow::Result<GateInfo> {
    let mut tokens = rest.split_whitespace();
    let func_name = tokens.next().ok_or_else(|| CktError::Parse {
        line: line_no,
        message: "gate line is missing a function name".into(),
    })?;
    let gate_func = blif_keyword_to_func(func_name).ok_or_else(|| CktError::Parse {
        line: line_no,
        message: format!("unknown gate function '{func_name}'"),
    })?;

    let mut inputs = Vec::new();
    let mut output = None;
    for token in tokens {
        let (key, value) = token.split_once('=').ok_or_else(|| CktError::Parse {
            line: line_no,
            message: format!("malformed gate argument '{token}', expected key=wire"),
        })?;
        if key == "O" {
            output = Some(Sym::new(value));
        } else {
            inputs.push(Sym::new(value));
        }
    }
    let output = output.ok_or_else(|| CktError::Parse {
        line: line_no,
        message: "gate line is missing its O= output argument".into(),
    })?;

    let expected = expected_input_count(gate_func);
    if let Some(n) = expected {
        if inputs.len() != n {
            anyhow::bail!(CktError::Parse {
                line: line_no,
                message: format!(
                    "gate '{func_name}' expects {n} input(s), found {}",
                    inputs.len()
                ),
            });
        }
    }

    Ok(GateInfo {
        gate_id: Sym::new(format!("g{gate_count}")),
        gate_func,
        inputs,
        outputs: vec![output],
    })
}

fn expected_input_count(func: GateFunc) -> Option<usize> {
    match func {
        GateFunc::Inv1 | GateFunc::Copy => Some(1),
        GateFunc::And2 | GateFunc::Or2 | GateFunc::Nand2 | GateFunc::Nor2 | GateFunc::Xor2
        | GateFunc::Xnor2 | GateFunc::CopyInout => Some(2),
        GateFunc::Mux2 | GateFunc::Maj3 => Some(3),
        GateFunc::Zero | GateFunc::One => Some(0),
        GateFunc::InPort | GateFunc::OutPort => None,
    }
}

fn blif_keyword_to_func(keyword: &str) -> Option<GateFunc> {
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
    .find(|f| f.blif_keyword() == Some(keyword))
}

/// Joins lines ending in a backslash onto the following line, and drops
/// the backslash itself — BLIF's only continuation mechanism.
fn join_continuations(content: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut pending = String::new();
    for line in content.lines() {
        if let Some(stripped) = line.strip_suffix('\\') {
            pending.push_str(stripped);
            pending.push(' ');
        } else {
            pending.push_str(line);
            out.push(std::mem::take(&mut pending));
        }
    }
    if !pending.is_empty() {
        out.push(pending);
    }
    out
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

/// Renders a DAG back into BLIF text, for round-tripping and for emitting
/// intermediate stage output when `--keep-intermediates` is set.
pub fn write_blif(dag: &Dag) -> String {
    let mut out = String::new();
    out.push_str(&format!(".model {}\n", dag.module_name()));
    out.push_str(".inputs ");
    out.push_str(&dag.in_ports().iter().map(Sym::to_string).collect::<Vec<_>>().join(" "));
    out.push('\n');
    out.push_str(".outputs ");
    out.push_str(&dag.out_ports().iter().map(Sym::to_string).collect::<Vec<_>>().join(" "));
    out.push('\n');
    for id in dag.gate_ids() {
        let Some(gate) = dag.gate(id) else { continue };
        let Some(keyword) = gate.gate_func.blif_keyword() else {
            continue;
        };
        let pin_names: &[&str] = &["a", "b", "c"];
        let mut parts = vec![keyword.to_string()];
        for (pin, wire) in pin_names.iter().zip(gate.inputs.iter()) {
            parts.push(format!("{pin}={wire}"));
        }
        if let Some(out_wire) = gate.outputs.first() {
            parts.push(format!("O={out_wire}"));
        }
        out.push_str(".gate ");
        out.push_str(&parts.join(" "));
        out.push('\n');
    }
    out.push_str(".end\n");
    out
}

/// PIM substrate a DAG should target, threaded through parsing only to
/// select the right sanity-check phase after a transformation pipeline
/// runs — the BLIF grammar itself is substrate-agnostic.
pub fn substrate_sanity_check(dag: &Dag, mode: PimMode) -> anyhow::Result<()> {
    dag.sanity_check(mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HALF_ADDER: &str = r#"
# half adder
.model half_adder
.inputs a b
.outputs sum cout
.gate xor2 a=a b=b O=sum
.gate and2 a=a b=b O=cout
.end
"#;

    #[test]
    fn parses_half_adder() {
        let dag = parse_blif(HALF_ADDER, DebugLevel::SILENT).unwrap();
        assert_eq!(dag.module_name(), "half_adder");
        assert_eq!(dag.in_ports().len(), 2);
        assert_eq!(dag.out_ports().len(), 2);
        dag.sanity_check(PimMode::Digital).unwrap();
    }

    #[test]
    fn rejects_missing_end() {
        let truncated = HALF_ADDER.trim_end().trim_end_matches(".end\n").trim_end();
        let err = parse_blif(truncated, DebugLevel::SILENT).unwrap_err();
        assert!(err.to_string().contains(".end"));
    }

    #[test]
    fn joins_backslash_continuations() {
        let text = ".gate maj3 a=x \\\n b=y c=z O=w";
        let lines = join_continuations(text);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("b=y"));
    }
}
