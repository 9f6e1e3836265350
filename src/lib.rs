//! BLIF-to-bit-serial DAG core.
//!
//! This crate owns the data model (gates, wires, the DAG), the BLIF
//! frontend, the substrate-specific transformation catalog, the symbolic
//! DAG verifier, and the JSON/DOT serialization utilities that the
//! downstream `ckt-sched`, `ckt-engine`, and `ckt-gobble` crates build on.

pub mod blif;
pub mod dag;
pub mod debug;
pub mod dot;
pub mod error;
pub mod ir;
pub mod json;
pub mod transforms;
pub mod verify;

pub use dag::{Dag, Gate, GateFunc, GateInfo, PimMode};
pub use debug::DebugLevel;
pub use error::CktError;
