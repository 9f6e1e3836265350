//! The gate/wire graph: types, invariants, and the edit operations every
//! transformation pass and frontend builds on.

mod gate;
mod graph;

pub use gate::{Gate, GateFunc};
pub use graph::{Dag, GateInfo, PimMode, WIRE_SEGMENT_MARKER};
