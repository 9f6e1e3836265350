//! Turns RISC-V assembly text into a [`RiscvStatement`] stream.
//!
//! Grounded on `original_source/src/asm-parser/parser.py`'s two regexes
//! (one for `#DEBUG_VALUE` directives, one for plain instructions); this
//! port adds recognition of the `#APP`/`#NO_APP`/`#PIM_OP` lines that the
//! inline-assembly round trip relies on to carry its original opcode
//! across an opaque compiler pass. The original instead recovers the
//! opcode by peephole-matching real RISC-V mnemonic sequences, which is
//! kept here as the fallback in [`crate::translate::infer_fused_opcode`].

use crate::types::{AppMarker, DebugValue, PimOpLine, RiscvInstruction, RiscvStatement};
use regex::Regex;
use std::sync::LazyLock;

static DEBUG_VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#DEBUG_VALUE:\s*([A-Za-z0-9_]+:[A-Za-z0-9_\[\]]+)").unwrap());

static PIM_OP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#PIM_OP\s+(.*)").unwrap());

static INSTRUCTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([a-zA-Z][a-zA-Z0-9.]*)\s+(.+)$").unwrap());

/// Parses every line of `text` into a flat statement stream, in source
/// order. Blank lines and unrecognized lines are skipped.
pub fn parse(text: &str) -> Vec<RiscvStatement> {
    let mut out = Vec::new();
    for (line_no, raw_line) in text.lines().enumerate() {
        if let Some(caps) = DEBUG_VALUE_RE.captures(raw_line) {
            out.push(RiscvStatement::DebugValue(DebugValue {
                port_name: caps[1].to_string(),
                line: line_no,
            }));
            continue;
        }
        let trimmed = raw_line.trim();
        if trimmed.starts_with('#') {
            if let Some(caps) = PIM_OP_RE.captures(trimmed) {
                out.push(RiscvStatement::PimOp(parse_pim_op(&caps[1])));
                continue;
            }
            if trimmed.starts_with("#APP") {
                out.push(RiscvStatement::AppMarker(AppMarker::Begin));
                continue;
            }
            if trimmed.starts_with("#NO_APP") {
                out.push(RiscvStatement::AppMarker(AppMarker::End));
                continue;
            }
            continue;
        }
        if let Some(instr) = parse_instruction(trimmed, line_no) {
            out.push(RiscvStatement::Instruction(instr));
        }
    }
    out
}

fn parse_pim_op(rest: &str) -> PimOpLine {
    let rest = rest.trim();
    if rest == "BEGIN" {
        return PimOpLine::Begin;
    }
    if rest == "END" {
        return PimOpLine::End;
    }
    let mut fields = rest.split_whitespace();
    let gate_id = fields.next().unwrap_or_default().to_string();
    let opcode = fields.next().unwrap_or_default().to_string();
    let operands = fields.map(|s| s.trim_end_matches(',').to_string()).collect();
    PimOpLine::Op {
        gate_id,
        opcode,
        operands,
    }
}

fn parse_instruction(line: &str, line_no: usize) -> Option<RiscvInstruction> {
    let caps = INSTRUCTION_RE.captures(line)?;
    let opcode = caps[1].to_string();
    let operands = caps[2]
        .split(',')
        .map(|s| strip_memory_operand(s.trim()))
        .filter(|s| !s.is_empty())
        .collect();
    Some(RiscvInstruction {
        opcode,
        operands,
        line: line_no,
    })
}

/// Reduces a `offset(base)` memory operand to its base register, which is
/// all the reverse translator needs (the offset is folded into whichever
/// stack-slot symbol the debug-value directive names).
fn strip_memory_operand(operand: &str) -> String {
    match operand.split_once('(') {
        Some((_, rest)) => rest.trim_end_matches(')').to_string(),
        None => operand.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_debug_value_and_app_markers() {
        let text = "#DEBUG_VALUE: half_adder:a <- $t0\n#APP\n#PIM_OP BEGIN\n#PIM_OP g0 xor2 t0 t1\nxor t0, t0, t1\n#PIM_OP END\n#NO_APP\n";
        let stmts = parse(text);
        assert!(matches!(stmts[0], RiscvStatement::DebugValue(_)));
        assert!(matches!(stmts[1], RiscvStatement::AppMarker(AppMarker::Begin)));
        assert!(matches!(stmts[2], RiscvStatement::PimOp(PimOpLine::Begin)));
        match &stmts[3] {
            RiscvStatement::PimOp(PimOpLine::Op { gate_id, opcode, operands }) => {
                assert_eq!(gate_id, "g0");
                assert_eq!(opcode, "xor2");
                assert_eq!(operands, &vec!["t0".to_string(), "t1".to_string()]);
            }
            other => panic!("expected a PIM_OP line, got {other:?}"),
        }
    }

    #[test]
    fn parses_load_with_stack_slot_operand() {
        let stmts = parse("lw t0, -4(s0)\n");
        match &stmts[0] {
            RiscvStatement::Instruction(instr) => {
                assert_eq!(instr.opcode, "lw");
                assert_eq!(instr.operands, vec!["t0".to_string(), "s0".to_string()]);
            }
            other => panic!("expected an instruction, got {other:?}"),
        }
    }
}
