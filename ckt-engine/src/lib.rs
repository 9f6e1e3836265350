//! Micro-program IR emitters (spec §4.4) and PIM-API code emitters (spec
//! §4.7) — the two code-generation stages that sit on either side of the
//! external C compiler and the external PIM vendor runtime.
//!
//! `bitwise` emits `GeneratorBitwise`, a plain bit-sliced C function used
//! as an executable reference and as the regression oracle the DAG
//! verifier's outputs are checked against. `asm` emits `GeneratorAsm`,
//! the inline-assembly-over-RISC-V IR whose `#PIM_OP` comments are the
//! mechanism by which arbitrary bit-serial opcodes survive an opaque C
//! compiler (ckt-gobble's reverse translator parses the RISC-V this
//! produces). `pim_api` emits the final digital and analog PIM vendor-API
//! C++ translation units from the optimized bit-serial statement stream
//! ckt-gobble hands back.

pub mod asm;
pub mod bitwise;
pub mod pim_api;

pub use asm::GeneratorAsm;
pub use bitwise::GeneratorBitwise;
