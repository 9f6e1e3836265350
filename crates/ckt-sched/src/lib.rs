//! Scheduling strategies over a [`ckt::dag::Dag`]: five pluggable
//! topological orders that trade off differently against live-register
//! pressure (spec §4.1, §4.8), plus a pressure estimator used to pick
//! between them and to regression-test scenario 5 (register-pressure
//! blow-up).
//!
//! None of this allocates registers itself — under the contract in
//! §4.8, the C compiler's own register allocator does that, driven by
//! the clobber list `ckt-engine`'s assembly emitter builds from
//! `num_regs`. This crate only orders the gates the emitter walks.

pub mod pressure;
pub mod strategies;

pub use pressure::live_register_count;
pub use strategies::{topo_sort, TopoSortStrategy};
