//! Post-translation optimizer: the four passes applied, in order, to the
//! stream an [`crate::translate::AsmTranslator`] produces.
//!
//! Grounded on `original_source/src/asm-parser/asm_translator.py`'s
//! `TempVariablesShrinker`, `RedundantCopyRemover`, and
//! `PortSpillSimplifier`; `AnalogCopyPacker` has no counterpart there (the
//! original never targets the analog substrate) and is grounded on the
//! Triple-Row-Activation packing prose instead.

use ckt::ir::{parse_temp_index, LinkedInstruction, Opcode, Sym};
use std::collections::{HashMap, HashSet};

/// Warnings surfaced by [`shrink_temp_variables`] when a dropped
/// instruction's destination was a live PIM register rather than a temp
/// — a sign the reverse translator lost track of a real dependency.
#[derive(Debug, Default)]
pub struct ShrinkReport {
    /// Human-readable warnings, one per suspicious drop.
    pub warnings: Vec<String>,
}

fn is_pim_register(sym: &Sym) -> bool {
    crate::translate::is_pim_register(sym)
}

/// Pass 1: drops every still-`suspended` instruction and renumbers the
/// surviving temps densely from zero, in first-use order.
pub fn shrink_temp_variables(stream: Vec<LinkedInstruction>) -> (Vec<LinkedInstruction>, ShrinkReport) {
    let mut report = ShrinkReport::default();
    let mut retained = Vec::with_capacity(stream.len());
    for instr in stream {
        if instr.suspended {
            let dest = instr.statement.destination();
            if is_pim_register(dest) {
                report.warnings.push(format!(
                    "dropped a suspended instruction at line {} whose destination `{dest}` is a live PIM register",
                    instr.statement.source_line
                ));
            }
            continue;
        }
        retained.push(instr);
    }

    let mut renumber: HashMap<usize, Sym> = HashMap::new();
    let mut next = 0usize;
    for instr in &mut retained {
        for operand in &mut instr.statement.operands {
            if let Some(old_idx) = parse_temp_index(operand.as_str()) {
                let fresh = renumber.entry(old_idx).or_insert_with(|| {
                    let sym = Sym::new(format!("temp{next}"));
                    next += 1;
                    sym
                });
                *operand = fresh.clone();
            }
        }
    }

    (retained, report)
}

/// Pass 2: eliminates `copy`/`mv` instructions whose source equals their
/// destination — true identity copies, which appear as round-trip
/// artifacts rather than real data movement.
pub fn remove_redundant_copies(stream: Vec<LinkedInstruction>) -> Vec<LinkedInstruction> {
    stream
        .into_iter()
        .filter(|instr| {
            let is_copy_like = matches!(instr.statement.opcode, Opcode::Copy | Opcode::Mv);
            !(is_copy_like && instr.statement.sources().first() == Some(instr.statement.destination()))
        })
        .collect()
}

/// Pass 3: routes spilled port values directly to their port and drops
/// any instruction whose result is never transitively consumed by a
/// write to a real output port.
///
/// Three sweeps: a forward sweep builds a symbol→port map by tracing
/// each `write`'s source back through the chain of single-source
/// `read`/`copy`/`mv` producers that fed it; a second forward sweep
/// rewrites any `read` whose source is in that map to read the port
/// directly; a backward sweep suspends everything not transitively used
/// by a write to `out_ports`, which a final forward sweep purges.
pub fn simplify_port_spills(stream: Vec<LinkedInstruction>, out_ports: &[Sym]) -> Vec<LinkedInstruction> {
    let mut def_of: HashMap<Sym, Sym> = HashMap::new();
    let mut sym_to_port: HashMap<Sym, Sym> = HashMap::new();

    for instr in &stream {
        let stmt = &instr.statement;
        match stmt.opcode {
            Opcode::Read | Opcode::Mv | Opcode::Copy | Opcode::CopyInout => {
                if let Some(src) = stmt.sources().first() {
                    def_of.insert(stmt.destination().clone(), src.clone());
                }
            }
            Opcode::Write => {
                let port = stmt.destination().clone();
                let mut cur = stmt.sources()[0].clone();
                let mut chain = vec![cur.clone()];
                while let Some(prev) = def_of.get(&cur) {
                    cur = prev.clone();
                    chain.push(cur.clone());
                }
                for sym in chain {
                    sym_to_port.insert(sym, port.clone());
                }
            }
            _ => {}
        }
    }

    let mut rewritten: Vec<LinkedInstruction> = stream
        .into_iter()
        .map(|mut instr| {
            if matches!(instr.statement.opcode, Opcode::Read) {
                if let Some(port) = instr.statement.sources().first().and_then(|s| sym_to_port.get(s)).cloned() {
                    let dest = instr.statement.destination().clone();
                    instr.statement.operands = vec![dest, port];
                    instr.source_instructions = vec![None];
                }
            }
            instr
        })
        .collect();

    let mut used: HashSet<Sym> = HashSet::new();
    for instr in rewritten.iter_mut().rev() {
        let stmt = &instr.statement;
        let is_real_output_write =
            matches!(stmt.opcode, Opcode::Write) && out_ports.contains(stmt.destination());
        let transitively_used = used.contains(stmt.destination());
        if is_real_output_write || transitively_used {
            for src in stmt.sources() {
                used.insert(src.clone());
            }
        } else {
            instr.suspended = true;
        }
    }

    rewritten.retain(|instr| !instr.suspended);
    rewritten
}

/// A single-source instruction with up to three destinations — the
/// analog emitter's unit of work after [`pack_analog_copies`], modeling
/// one Triple-Row-Activation that refreshes/copies into every listed
/// destination at once.
#[derive(Debug, Clone)]
pub struct PackedInstr {
    /// The operation this instruction performs.
    pub opcode: Opcode,
    /// Source operands (unchanged by packing).
    pub sources: Vec<Sym>,
    /// One to three destinations sharing this instruction's sources.
    pub destinations: Vec<Sym>,
    /// Originating line, or `0` if synthesized.
    pub source_line: usize,
}

const MAX_PACKED_DESTINATIONS: usize = 3;

/// Pass 4 (analog only): greedily packs `copy`/`mv`/`zero`/`one`
/// instructions sharing an opcode and source operands into one
/// multi-destination instruction, within a bounded lookahead `window`,
/// up to [`MAX_PACKED_DESTINATIONS`] destinations per pack. A candidate
/// is skipped if any of its operands appeared among the instructions
/// visited between the anchor and the candidate (the dependency guard).
pub fn pack_analog_copies(stream: Vec<LinkedInstruction>, window: usize) -> Vec<PackedInstr> {
    let packable = |op: Opcode| matches!(op, Opcode::Copy | Opcode::Mv | Opcode::Zero | Opcode::One);

    let mut out = Vec::with_capacity(stream.len());
    let mut consumed = vec![false; stream.len()];

    for i in 0..stream.len() {
        if consumed[i] {
            continue;
        }
        let anchor = &stream[i].statement;
        consumed[i] = true;

        if !packable(anchor.opcode) {
            out.push(PackedInstr {
                opcode: anchor.opcode,
                sources: anchor.sources().to_vec(),
                destinations: vec![anchor.destination().clone()],
                source_line: anchor.source_line,
            });
            continue;
        }

        let mut destinations = vec![anchor.destination().clone()];
        let mut between_operands: HashSet<Sym> = HashSet::new();
        let end = (i + 1 + window).min(stream.len());

        for j in (i + 1)..end {
            if destinations.len() >= MAX_PACKED_DESTINATIONS {
                break;
            }
            if consumed[j] {
                continue;
            }
            let candidate = &stream[j].statement;
            if candidate.opcode == anchor.opcode && candidate.sources() == anchor.sources() {
                let guard_hit = candidate
                    .operands
                    .iter()
                    .any(|op| between_operands.contains(op));
                if !guard_hit {
                    destinations.push(candidate.destination().clone());
                    consumed[j] = true;
                    continue;
                }
            }
            for op in &candidate.operands {
                between_operands.insert(op.clone());
            }
        }

        out.push(PackedInstr {
            opcode: anchor.opcode,
            sources: anchor.sources().to_vec(),
            destinations,
            source_line: anchor.source_line,
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ckt::ir::Statement;

    fn instr(opcode: Opcode, operands: &[&str], line: usize, suspended: bool) -> LinkedInstruction {
        let operands = operands.iter().map(|s| Sym::new(*s)).collect();
        LinkedInstruction::new(Statement::new(opcode, operands, line), vec![], suspended)
    }

    #[test]
    fn shrink_drops_suspended_and_renumbers_densely() {
        let stream = vec![
            instr(Opcode::Mv, &["temp5", "a"], 1, false),
            instr(Opcode::Mv, &["temp9", "temp5"], 2, false),
            instr(Opcode::Mv, &["temp2", "b"], 3, true),
        ];
        let (out, report) = shrink_temp_variables(stream);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].statement.operands[0].as_str(), "temp0");
        assert_eq!(out[1].statement.operands[0].as_str(), "temp1");
        assert_eq!(out[1].statement.operands[1].as_str(), "temp0");
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn shrink_warns_when_dropping_a_live_register_destination() {
        let stream = vec![instr(Opcode::Mv, &["t0", "a"], 1, true)];
        let (out, report) = shrink_temp_variables(stream);
        assert!(out.is_empty());
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn redundant_copy_remover_drops_only_true_self_copies() {
        let stream = vec![
            instr(Opcode::Mv, &["t0", "t0"], 1, false),
            instr(Opcode::Mv, &["t1", "t0"], 2, false),
        ];
        let out = remove_redundant_copies(stream);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].statement.operands[0].as_str(), "t1");
    }

    #[test]
    fn port_spill_simplifier_routes_a_reload_directly_to_its_port() {
        let out_ports = vec![Sym::new("sum")];
        let stream = vec![
            instr(Opcode::Mv, &["t3", "a"], 1, false),
            instr(Opcode::Write, &["t3", "temp0"], 2, false),
            instr(Opcode::Read, &["t4", "temp0"], 3, false),
            instr(Opcode::Write, &["t4", "sum"], 4, false),
        ];
        let out = simplify_port_spills(stream, &out_ports);
        let reload = out.iter().find(|i| i.statement.opcode == Opcode::Read).expect("reload kept");
        assert_eq!(reload.statement.operands[1].as_str(), "sum");
    }

    #[test]
    fn port_spill_simplifier_drops_dead_writes_to_non_output_symbols() {
        let out_ports = vec![Sym::new("sum")];
        let stream = vec![
            instr(Opcode::Mv, &["t0", "a"], 1, false),
            instr(Opcode::Write, &["t0", "scratch"], 2, false),
        ];
        let out = simplify_port_spills(stream, &out_ports);
        assert!(out.is_empty());
    }

    #[test]
    fn analog_copy_packer_merges_matching_copies_within_window() {
        let stream = vec![
            instr(Opcode::Copy, &["r0", "t0"], 1, false),
            instr(Opcode::Inv1, &["r9", "t5"], 2, false),
            instr(Opcode::Copy, &["r1", "t0"], 3, false),
            instr(Opcode::Copy, &["r2", "t0"], 4, false),
            instr(Opcode::Copy, &["r3", "t0"], 5, false),
        ];
        let packed = pack_analog_copies(stream, 4);
        let merged = packed.iter().find(|p| p.destinations.len() > 1).expect("a pack happened");
        assert_eq!(merged.destinations.len(), MAX_PACKED_DESTINATIONS);
        assert!(packed.iter().any(|p| p.opcode == Opcode::Inv1));
    }

    #[test]
    fn analog_copy_packer_respects_the_dependency_guard() {
        let stream = vec![
            instr(Opcode::Copy, &["r0", "t0"], 1, false),
            instr(Opcode::Mv, &["t0", "r0"], 2, false),
            instr(Opcode::Copy, &["r1", "t0"], 3, false),
        ];
        let packed = pack_analog_copies(stream, 4);
        assert!(packed.iter().all(|p| p.destinations.len() == 1));
    }
}
