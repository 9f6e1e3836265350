//! Shared PIM-API emission helpers (spec §4.7): the `PimObjId`-per-port
//! function signature, the `tempObjN`-bit-packed representation of
//! synthesized `temp<k>` symbols, and the row-register name table shared
//! by the digital and analog emitters.
//!
//! Grounded on
//! `original_source/src/asm-parser/pimeval_code_generator_base.py`'s
//! `PimEvalAPICodeGeneratorBase` (temp-variable packing ladder, function
//! signature/body skeleton, include-guard wrapper) and
//! `original_source/src/asm-parser/generator.py`'s `formatOperand`, which
//! `pimeval_code_generator_base.py` calls but never defines.

pub mod analog;
pub mod digital;

pub use analog::AnalogPimApiGenerator;
pub use digital::DigitalPimApiGenerator;

use ckt::ir::{parse_temp_index, Sym, PIM_REGISTERS};

/// Candidate packed-temp bit widths, narrowest first; mirrors
/// `getDataTypeBitWidth`'s `[8, 16, 32, 64]` ladder.
const TEMP_WIDTHS: &[usize] = &[8, 16, 32, 64];

/// The nineteen row registers' vendor-API names, in [`PIM_REGISTERS`]
/// order, numbered from 1 — `PimEvalAPIDigitalCodeGenerator.mapPimAsmRegToPimEvalAPI`'s
/// table, generalized from 19 fixed entries to this crate's shared table.
pub fn pim_rreg_name(reg: &Sym) -> Option<String> {
    PIM_REGISTERS.iter().position(|r| *r == reg.as_str()).map(|i| format!("PIM_RREG_R{}", i + 1))
}

/// The narrowest width in [`TEMP_WIDTHS`] that fits `temp_count` distinct
/// `temp<k>` symbols, falling back to the widest when there are more
/// temps than even that can hold.
pub fn temp_bit_width(temp_count: usize) -> usize {
    TEMP_WIDTHS
        .iter()
        .copied()
        .find(|w| temp_count <= *w)
        .unwrap_or(*TEMP_WIDTHS.last().unwrap())
}

/// `(tempObj index, bit offset within that tempObj)` for a `temp<k>`
/// symbol's dense index, given the chosen packing width.
pub fn temp_slot(index: usize, width: usize) -> (usize, usize) {
    (index / width, index % width)
}

/// Every distinct `temp<k>` index referenced anywhere in `operands`,
/// sorted — used to size the `tempObjN` allocation.
pub fn distinct_temp_indices<'a>(operands: impl Iterator<Item = &'a Sym>) -> Vec<usize> {
    let mut seen: Vec<usize> = operands.filter_map(|s| parse_temp_index(s.as_str())).collect();
    seen.sort_unstable();
    seen.dedup();
    seen
}

/// `tempObj<k> a PimObjId, <offset>` for a `temp<k>` operand, or the bare
/// (sanitized) symbol name otherwise — appending the `, 0` bit-offset
/// `formatOperand` gives every non-temp *source* operand, since a whole
/// `PimObjId` is always bit zero of itself.
pub fn format_operand(sym: &Sym, width: usize, is_source: bool) -> String {
    match parse_temp_index(sym.as_str()) {
        Some(idx) => {
            let (obj, offset) = temp_slot(idx, width);
            format!("tempObj{obj}, {offset}")
        }
        None if is_source => format!("{}, 0", sanitize_ident(sym.as_str())),
        None => sanitize_ident(sym.as_str()),
    }
}

/// The include-guarded header shared by both substrates: `#ifndef`/
/// `#define` on the upper-cased function name, the `libpimeval.h`
/// include, and the `PimObjId`-per-port function signature.
pub fn function_signature(function_name: &str, ports: &[Sym]) -> String {
    let guard = function_name.to_uppercase();
    let mut code = format!("#ifndef {guard}_H\n#define {guard}_H\n");
    code.push_str("#include \"libpimeval.h\"\n");
    code.push_str(&format!("void {function_name}(\n"));
    let params: Vec<String> =
        ports.iter().map(|p| format!("\tPimObjId {}", sanitize_ident(p.as_str()))).collect();
    code.push_str(&params.join(",\n"));
    code.push_str("\n)\n");
    code
}

/// Bus-index brackets and wire-segment markers aren't valid C++ identifier
/// characters; replace them with underscores.
pub fn sanitize_ident(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}
