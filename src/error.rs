//! Error kinds shared across the lowering pipeline.
//!
//! Mirrors the error taxonomy of the design: configuration mistakes and
//! external-tool failures are fatal and fail fast; invariant violations
//! name the offending gate or wire; reverse-translation gaps and
//! verification mismatches carry enough context for the caller to decide
//! whether to continue.

use std::fmt;

/// A bit-vector test vector used by the DAG verifier (see the `verify` module).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestVector {
    /// All primary inputs are `0`.
    AllZero,
    /// All primary inputs are `1`.
    AllOne,
    /// Primary inputs alternate starting at `0`.
    Alternating01,
    /// Primary inputs alternate starting at `1`.
    Alternating10,
}

impl fmt::Display for TestVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TestVector::AllZero => "all-zero",
            TestVector::AllOne => "all-one",
            TestVector::Alternating01 => "alternating-01",
            TestVector::Alternating10 => "alternating-10",
        };
        f.write_str(s)
    }
}

/// Closed error enumeration for the compiler.
#[derive(Debug)]
pub enum CktError {
    /// A CLI option or stage-range combination is invalid; detected up front.
    Configuration(String),
    /// A subprocess stage (yosys, ABC, the C compiler) exited non-zero.
    ExternalTool {
        /// Stage tag, e.g. `"verilog"`, `"c"`.
        stage: &'static str,
        /// The subprocess's exit code.
        exit_code: i32,
    },
    /// A grammar mismatch while parsing BLIF or RISC-V assembly.
    Parse {
        /// 1-based line number of the offending input.
        line: usize,
        /// Human-readable description of the mismatch.
        message: String,
    },
    /// A DAG edit would violate one of the gate/wire graph's structural
    /// invariants; this is a programming error in a transformation, not a
    /// user-facing fault.
    Invariant {
        /// The gate or wire id implicated.
        gate_or_wire: String,
        /// Description of the violated invariant.
        message: String,
    },
    /// The DAG verifier found the outputs of a before/after transformation
    /// pair disagreeing on a canonical test vector.
    Verification {
        /// Which of the four canonical vectors disagreed.
        vector: TestVector,
        /// Description of the mismatch.
        message: String,
    },
    /// The assembly reverse translator could not resolve an operand chain
    /// or recognize an opcode while walking a generated micro-program.
    ReverseTranslation {
        /// Human-readable description of the failure.
        message: String,
    },
}

impl fmt::Display for CktError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CktError::Configuration(msg) => write!(f, "configuration error: {msg}"),
            CktError::ExternalTool { stage, exit_code } => {
                write!(f, "stage '{stage}' failed with exit code {exit_code}")
            }
            CktError::Parse { line, message } => write!(f, "parse error at line {line}: {message}"),
            CktError::Invariant {
                gate_or_wire,
                message,
            } => write!(f, "invariant violation at '{gate_or_wire}': {message}"),
            CktError::Verification { vector, message } => {
                write!(f, "verification mismatch on {vector} vector: {message}")
            }
            CktError::ReverseTranslation { message } => {
                write!(f, "reverse translation error: {message}")
            }
        }
    }
}

impl std::error::Error for CktError {}
