//! Assembly reverse translator (spec §4.5) and post-translation optimiser
//! (spec §4.6): turns the RISC-V assembly that emerges from compiling
//! `ckt-engine`'s inline-asm IR back into a bit-serial statement stream
//! grounded in the original PIM register and port names.

pub mod optimize;
pub mod parser;
pub mod translate;
pub mod types;

pub use optimize::{
    pack_analog_copies, remove_redundant_copies, shrink_temp_variables, simplify_port_spills,
    PackedInstr, ShrinkReport,
};
pub use parser::parse;
pub use translate::{infer_fused_opcode, is_pim_register, AsmTranslator, PIM_REGISTERS};
pub use types::{AppMarker, DebugValue, PimOpLine, RiscvInstruction, RiscvStatement};
