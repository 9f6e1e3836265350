//! Substrate-specific DAG transformations (spec §4.3).
//!
//! Every pass implements [`DagTransform`], prints a `DAG-Transform
//! Summary: …` line at [`DebugLevel`] ≥ 1, and may be composed in any
//! order — though [`digital_pipeline`] and [`analog_pipeline`] return the
//! prescribed sequences.

mod inout_var_reusing;
mod inv_eliminator;
mod maj_normalizer;
mod multi_dest_optimizer;
mod port_isolation;
mod wire_copy_inserter;

pub use inout_var_reusing::InoutVarReusing;
pub use inv_eliminator::InvEliminator;
pub use maj_normalizer::{ConstantAllocationStrategy, MajNormalizer};
pub use multi_dest_optimizer::MultiDestOptimizer;
pub use port_isolation::InputPortIsolation;
pub use wire_copy_inserter::WireCopyInserter;

use crate::dag::{Dag, PimMode};
use crate::debug::DebugLevel;
use anyhow::Context;
use std::fmt;

/// Tallies what a pass changed, for the mandatory debug-level summary
/// line and for tests that assert a pass did (or did not) touch the DAG.
#[derive(Debug, Clone, Default)]
pub struct TransformSummary {
    /// The pass's name, e.g. `"MajNormalizer"`.
    pub pass_name: String,
    /// Gates added by this pass.
    pub gates_added: usize,
    /// Gates removed by this pass.
    pub gates_removed: usize,
    /// Wires added by this pass.
    pub wires_added: usize,
    /// Wires removed by this pass.
    pub wires_removed: usize,
}

impl fmt::Display for TransformSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DAG-Transform Summary: {} (+{} gates, -{} gates, +{} wires, -{} wires)",
            self.pass_name, self.gates_added, self.gates_removed, self.wires_added, self.wires_removed
        )
    }
}

/// A semantics-preserving DAG rewrite.
pub trait DagTransform {
    /// The pass's name, used in the summary line and in debug output.
    fn name(&self) -> &'static str;

    /// Applies the rewrite in place, returning a summary of what changed.
    /// Implementations must leave the DAG passing `sanity_check` for the
    /// substrate they target.
    fn apply(&self, dag: &mut Dag) -> anyhow::Result<TransformSummary>;

    /// Runs [`Self::apply`], prints the mandatory summary line at
    /// `debug_level >= 1`, then runs the mandatory `sanity_check` (spec §3,
    /// §5): a corrupt edit is caught and reported right after the pass that
    /// made it, rather than silently progressing into the next pass.
    fn run(&self, dag: &mut Dag, mode: PimMode, debug_level: DebugLevel) -> anyhow::Result<TransformSummary> {
        let summary = self.apply(dag)?;
        if debug_level.at_least(1) {
            eprintln!("{summary}");
        }
        dag.sanity_check(mode)
            .with_context(|| format!("sanity-checking the DAG after {}", self.name()))?;
        Ok(summary)
    }
}

/// The digital pipeline: currently a no-op gateway. `MajNormalizer` is
/// available but not run by default — the digital substrate has no
/// reason to prefer `maj3` over `and2`/`or2`, unlike the analog one.
pub fn digital_pipeline() -> Vec<Box<dyn DagTransform>> {
    Vec::new()
}

/// Flags selecting the two optional experimental analog passes, both off
/// by default.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalogPipelineOptions {
    /// Run `InvEliminator` before `MajNormalizer`.
    pub enable_inv_eliminator: bool,
    /// Run `MultiDestOptimizer` after `MajNormalizer`, before
    /// `InoutVarReusing` — per the Open Question in spec §9, running it
    /// any later is unsafe when a `maj3`'s packed destinations would have
    /// to coexist with an `InoutVarReusing` segment on the same wire.
    pub enable_multi_dest_optimizer: bool,
}

/// The prescribed analog pipeline: `InputPortIsolation` → `MajNormalizer`
/// → `InoutVarReusing` → `WireCopyInserter`, with the two optional passes
/// spliced in at their safe positions when enabled.
pub fn analog_pipeline(opts: AnalogPipelineOptions) -> Vec<Box<dyn DagTransform>> {
    let mut passes: Vec<Box<dyn DagTransform>> = vec![Box::new(InputPortIsolation)];
    if opts.enable_inv_eliminator {
        passes.push(Box::new(InvEliminator));
    }
    passes.push(Box::new(MajNormalizer::default()));
    if opts.enable_multi_dest_optimizer {
        passes.push(Box::new(MultiDestOptimizer));
    }
    passes.push(Box::new(InoutVarReusing));
    passes.push(Box::new(WireCopyInserter));
    passes
}

/// Runs a full pipeline in order, invoking [`DagTransform::run`] on each
/// pass (which sanity-checks the DAG against `mode` after every pass) and
/// returning every summary.
pub fn run_pipeline(
    dag: &mut Dag,
    pipeline: &[Box<dyn DagTransform>],
    mode: PimMode,
    debug_level: DebugLevel,
) -> anyhow::Result<Vec<TransformSummary>> {
    pipeline.iter().map(|pass| pass.run(dag, mode, debug_level)).collect()
}
