//! Drives the symbolic DAG verifier (`ckt::verify`) over the four
//! canonical test vectors for one or more BLIF modules, reporting
//! pass/fail per module without needing a second, independently-derived
//! netlist to compare against — each module is simulated against itself
//! pre- and post- the substrate transformation pipeline, so this doubles
//! as a regression check that the transforms preserve the module's
//! Boolean function (spec §4.9/§8).
//!
//! Grounded on `original_source/src/blif-translator/blif_dag_verification.py`'s
//! `DagVerifier`, which drives the same four canonical vectors over a
//! batch of BLIF inputs and reports a pass/fail summary; this binary
//! keeps that batch-runner shape but calls into `ckt::verify` rather than
//! re-simulating the DAG itself.

use anyhow::Context;
use ckt::dag::PimMode;
use ckt::debug::DebugLevel;
use ckt::transforms::{analog_pipeline, digital_pipeline, run_pipeline, AnalogPipelineOptions};
use clap::{Parser, ValueEnum};
use indicatif::ProgressBar;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lower")]
enum PimModeArg {
    Digital,
    Analog,
}

impl From<PimModeArg> for PimMode {
    fn from(value: PimModeArg) -> Self {
        match value {
            PimModeArg::Digital => PimMode::Digital,
            PimModeArg::Analog => PimMode::Analog,
        }
    }
}

/// Runs the DAG verifier's canonical test-vector suite against one or
/// more BLIF modules.
#[derive(Parser, Debug)]
#[command(name = "checker")]
#[command(about = "Verifies that a substrate transformation pipeline preserves a BLIF module's logic function")]
struct Cli {
    /// BLIF files to check; each is parsed, transformed, and re-verified
    /// independently.
    #[arg(required = true)]
    blif_files: Vec<PathBuf>,

    /// Target PIM substrate whose transformation pipeline is exercised.
    #[arg(long = "pim-mode", value_enum, default_value = "digital")]
    pim_mode: PimModeArg,

    /// Verbosity, `0` (silent) through `4` (per-edit tracing).
    #[arg(long = "debug-level", default_value_t = 0)]
    debug_level: u8,
}

fn main() {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(all_passed) => std::process::exit(if all_passed { 0 } else { 1 }),
        Err(err) => {
            eprintln!("checker: {err:#}");
            std::process::exit(2);
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<bool> {
    let debug_level = DebugLevel::from(cli.debug_level);
    let pim_mode: PimMode = cli.pim_mode.into();
    let bar = ProgressBar::new(cli.blif_files.len() as u64);

    let mut all_passed = true;
    for path in &cli.blif_files {
        let outcome = check_one(path, pim_mode, debug_level)
            .with_context(|| format!("checking '{}'", path.display()))?;
        bar.inc(1);
        match outcome {
            Ok(()) => println!("PASS {}", path.display()),
            Err(message) => {
                all_passed = false;
                println!("FAIL {} — {message}", path.display());
            }
        }
    }
    bar.finish_and_clear();
    Ok(all_passed)
}

/// Parses `path`, runs it through the substrate's transformation
/// pipeline, and verifies the transformed DAG against the untransformed
/// one over all four canonical vectors. Returns `Ok(Err(message))` for a
/// verification mismatch (not a hard error — the point of the tool) and
/// bubbles up `Err` only for input/parse/invariant failures.
fn check_one(path: &PathBuf, pim_mode: PimMode, debug_level: DebugLevel) -> anyhow::Result<Result<(), String>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading '{}'", path.display()))?;
    let reference = ckt::blif::parse_blif(&text, debug_level).context("parsing BLIF")?;
    reference.sanity_check(pim_mode).context("sanity-checking the parsed DAG")?;

    let mut candidate = reference.clone();
    let pipeline = match pim_mode {
        PimMode::Digital => digital_pipeline(),
        PimMode::Analog => analog_pipeline(AnalogPipelineOptions::default()),
    };
    run_pipeline(&mut candidate, &pipeline, pim_mode, debug_level).context("running the transformation pipeline")?;
    candidate.sanity_check(pim_mode).context("sanity-checking the transformed DAG")?;

    match ckt::verify::verify_equivalent(&reference, &candidate, pim_mode) {
        Ok(()) => Ok(Ok(())),
        Err(err) => Ok(Err(err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HALF_ADDER: &str = ".model half_adder\n.inputs a b\n.outputs sum cout\n\
                               .gate xor2 a=a b=b O=sum\n.gate and2 a=a b=b O=cout\n.end\n";

    #[test]
    fn half_adder_passes_the_digital_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("half_adder.blif");
        std::fs::write(&path, HALF_ADDER).unwrap();
        let outcome = check_one(&path, PimMode::Digital, DebugLevel::SILENT).unwrap();
        assert!(outcome.is_ok(), "{outcome:?}");
    }

    #[test]
    fn rejects_a_blif_file_missing_its_end_directive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.blif");
        std::fs::write(&path, ".model m\n.inputs a\n.outputs a\n").unwrap();
        assert!(check_one(&path, PimMode::Digital, DebugLevel::SILENT).is_err());
    }
}
