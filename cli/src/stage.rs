//! The two external-tool stage transitions (`verilog→blif`, `c→asm`):
//! declared interfaces onto the logic-synthesis frontend and the RISC-V C
//! compiler, neither of which this workspace reimplements (spec §1,
//! "deliberately out of scope").
//!
//! Grounded on the Design Note "Subprocess glue": these become `std::
//! process::Command` invocations with plumbed stderr and explicit
//! exit-code checking, not in-process library calls (neither tool exposes
//! one) and not a retry loop.

use anyhow::Context;
use ckt::error::CktError;
use std::path::Path;
use std::process::Command;

/// One external-tool stage transition: a subprocess invocation whose
/// stdout/stderr stream through to the caller's and whose exit status is
/// checked before the pipeline proceeds.
pub trait ExternalStage {
    /// The stage tag reported in error messages and `--gen-run-sh` output
    /// (e.g. `"verilog"`, `"c"`).
    fn tag(&self) -> &'static str;

    /// Runs the stage, writing its output to `output`. Returns the
    /// command line that was run (or would be run), for `--gen-run-sh`.
    fn run(&self, output: &Path) -> anyhow::Result<Vec<String>>;
}

/// `verilog → blif`: runs `yosys` to produce a tech-independent netlist,
/// then `abc` to technology-map it against `genlib`, per the synthesis
/// flow's fixed two-tool convention. Writes both `<output>.yosys.blif`
/// (tech-independent) and `<output>.blif` (tech-mapped); `output` here
/// names the tech-mapped file, and the tech-independent one is derived by
/// swapping its extension.
pub struct VerilogToBlif<'a> {
    /// The `yosys` binary to invoke.
    pub yosys_bin: &'a str,
    /// The `abc` binary to invoke for technology mapping.
    pub abc_bin: &'a str,
    /// Verilog source files to synthesize.
    pub verilog_files: &'a [std::path::PathBuf],
    /// Technology library ABC's `map` pass maps against.
    pub genlib: &'a Path,
    /// The module yosys should treat as the design's top.
    pub top_module: &'a str,
}

impl ExternalStage for VerilogToBlif<'_> {
    fn tag(&self) -> &'static str {
        "verilog"
    }

    fn run(&self, output: &Path) -> anyhow::Result<Vec<String>> {
        let yosys_blif = output.with_extension("yosys.blif");
        let yosys_script = format!(
            "read_verilog {}; synth -top {}; write_blif {}",
            self.verilog_files.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(" "),
            self.top_module,
            yosys_blif.display(),
        );
        let status = Command::new(self.yosys_bin)
            .arg("-p")
            .arg(&yosys_script)
            .status()
            .with_context(|| format!("spawning '{}'", self.yosys_bin))?;
        if !status.success() {
            anyhow::bail!(CktError::ExternalTool {
                stage: "verilog",
                exit_code: status.code().unwrap_or(-1),
            });
        }

        let abc_script = format!(
            "read_blif {}; read_library {}; map; write_blif {}",
            yosys_blif.display(),
            self.genlib.display(),
            output.display(),
        );
        let status = Command::new(self.abc_bin)
            .arg("-c")
            .arg(&abc_script)
            .status()
            .with_context(|| format!("spawning '{}'", self.abc_bin))?;
        if !status.success() {
            anyhow::bail!(CktError::ExternalTool {
                stage: "verilog",
                exit_code: status.code().unwrap_or(-1),
            });
        }

        Ok(vec![
            format!("{} -p '{}'", self.yosys_bin, yosys_script),
            format!("{} -c '{}'", self.abc_bin, abc_script),
        ])
    }
}

/// `c → asm`: compiles the inline-asm-over-RISC-V micro-program IR down
/// to RISC-V assembly. The emitter's clobber discipline (spec §4.8)
/// depends entirely on this compiler's own register allocator spilling
/// everything outside `t0..t<num_regs-1>` — the contract this crate has
/// no way to verify except by reading the `.s` the compiler hands back.
pub struct CToAsm<'a> {
    /// The RISC-V C compiler to invoke.
    pub cc_bin: &'a str,
    /// The inline-asm-over-RISC-V C source to compile.
    pub c_file: &'a Path,
}

impl ExternalStage for CToAsm<'_> {
    fn tag(&self) -> &'static str {
        "c"
    }

    fn run(&self, output: &Path) -> anyhow::Result<Vec<String>> {
        let status = Command::new(self.cc_bin)
            .arg("-S")
            .arg("-O1")
            .arg("-g")
            .arg("-fno-asynchronous-unwind-tables")
            .arg(self.c_file)
            .arg("-o")
            .arg(output)
            .status()
            .with_context(|| format!("spawning '{}'", self.cc_bin))?;
        if !status.success() {
            anyhow::bail!(CktError::ExternalTool {
                stage: "c",
                exit_code: status.code().unwrap_or(-1),
            });
        }
        Ok(vec![format!(
            "{} -S -O1 -g -fno-asynchronous-unwind-tables {} -o {}",
            self.cc_bin,
            self.c_file.display(),
            output.display()
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A stage double that never spawns a subprocess, standing in for
    /// `yosys`/`abc`/the C compiler in tests (none are installed in this
    /// environment) — exercises the `ExternalStage` contract (tag,
    /// reproducer command line) without the real tool.
    struct MockStage {
        tag: &'static str,
        command_line: &'static str,
    }

    impl ExternalStage for MockStage {
        fn tag(&self) -> &'static str {
            self.tag
        }

        fn run(&self, _output: &Path) -> anyhow::Result<Vec<String>> {
            Ok(vec![self.command_line.to_string()])
        }
    }

    #[test]
    fn mock_stage_reports_its_tag_and_command_line() {
        let stage = MockStage { tag: "c", command_line: "cc -S in.c -o out.s" };
        assert_eq!(stage.tag(), "c");
        assert_eq!(stage.run(Path::new("out.s")).unwrap(), vec!["cc -S in.c -o out.s".to_string()]);
    }
}
