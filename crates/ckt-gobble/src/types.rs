//! Statement types for the parsed RISC-V assembly stream.
//!
//! Mirrors the `Instruction`/`PortInfo` split of the original translator's
//! `parser.py`, plus an explicit `Directive` variant for the `#APP`/
//! `#NO_APP`/`#PIM_OP` comment lines the inline-assembly-to-IR convention
//! relies on.

/// One parsed line of the RISC-V assembly stream.
#[derive(Debug, Clone)]
pub enum RiscvStatement {
    /// A real RISC-V instruction, e.g. `lw t0, -4(s0)`.
    Instruction(RiscvInstruction),
    /// A `#DEBUG_VALUE: func:port` directive marking a primary I/O live
    /// range, emitted by the assumed C compiler contract to keep a port
    /// value observable even when it's otherwise dead code.
    DebugValue(DebugValue),
    /// An `#APP` / `#NO_APP` inline-assembly delimiter.
    AppMarker(AppMarker),
    /// A `#PIM_OP ...` sentinel comment line inside an inline-assembly
    /// block: either `BEGIN`, `END`, or `<gate_id> <opcode> <operands...>`.
    PimOp(PimOpLine),
}

/// A decoded RISC-V instruction.
#[derive(Debug, Clone)]
pub struct RiscvInstruction {
    /// Mnemonic, e.g. `"lw"`, `"mv"`, `"add"`.
    pub opcode: String,
    /// Operands in source order (destination first, per RISC-V convention).
    pub operands: Vec<String>,
    /// 0-based line number in the input stream.
    pub line: usize,
}

impl RiscvInstruction {
    /// True for the load mnemonics this translator recognizes.
    pub fn is_load(&self) -> bool {
        matches!(self.opcode.as_str(), "lw" | "ld" | "lb" | "lh" | "lbu" | "lhu")
    }

    /// True for the store mnemonics this translator recognizes.
    pub fn is_store(&self) -> bool {
        matches!(self.opcode.as_str(), "sw" | "sd" | "sb" | "sh")
    }
}

/// A debug-value directive naming a live primary I/O port.
#[derive(Debug, Clone)]
pub struct DebugValue {
    /// The port name recovered from `func:port`.
    pub port_name: String,
    /// 0-based line number.
    pub line: usize,
}

/// Which side of an inline-assembly block this line marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMarker {
    /// `#APP`
    Begin,
    /// `#NO_APP`
    End,
}

/// A `#PIM_OP` sentinel line.
#[derive(Debug, Clone)]
pub enum PimOpLine {
    /// `#PIM_OP BEGIN`
    Begin,
    /// `#PIM_OP END`
    End,
    /// `#PIM_OP <gate_id> <opcode> <operand_1> ...` — the original
    /// bit-serial opcode and its operands, carried verbatim across the
    /// compiler as comment text with `%N` operands already substituted.
    Op {
        /// The gate id this instruction was emitted from.
        gate_id: String,
        /// The bit-serial mnemonic, e.g. `"and2"` or `"maj3__n101"`.
        opcode: String,
        /// Operand names in the order the micro-program IR emitted them.
        operands: Vec<String>,
    },
}
