//! Fuzzer session: one fuzz target on the device, with lifecycle
//! operations. State is never stored; it is recomputed from the build
//! manifest and the live process table on every query.

use crate::corpus::Corpus;
use crate::ns::Namespace;
use crate::Context;
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuzzerState {
    NotInstalled,
    Running,
    Stopped,
}

impl fmt::Display for FuzzerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FuzzerState::NotInstalled => "NOT INSTALLED",
            FuzzerState::Running => "RUNNING",
            FuzzerState::Stopped => "STOPPED",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug)]
pub struct Fuzzer {
    package: String,
    executable: String,
    ns: Namespace,
    corpus: Corpus,
    output: PathBuf,
}

impl fmt::Display for Fuzzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.package, self.executable)
    }
}

impl Fuzzer {
    pub fn new(package: &str, executable: &str, output_base: &Path) -> Self {
        let ns = Namespace::new(package, executable);
        let corpus = Corpus::for_fuzzer(&ns);
        Self {
            package: package.to_string(),
            executable: executable.to_string(),
            ns,
            corpus,
            output: output_base.join(package).join(executable),
        }
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }

    pub fn ns(&self) -> &Namespace {
        &self.ns
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// Default directory where artifacts and logs accumulate.
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Canonical package URL for the fuzzer executable.
    pub fn executable_url(&self) -> String {
        format!(
            "fuchsia-pkg://fuchsia.com/{}#meta/{}.cmx",
            self.package, self.executable
        )
    }

    /// Whether the fuzzer's package exists in the build manifest.
    pub fn resolve(&self, ctx: &Context) -> bool {
        ctx.buildenv.is_resolved(&self.package)
    }

    /// Whether the fuzzer currently appears in the device process table.
    pub fn is_running(&self, ctx: &Context) -> anyhow::Result<bool> {
        let pid = ctx.device.getpid(&self.package, &self.executable, true)?;
        Ok(pid.is_some())
    }

    pub fn state(&self, ctx: &Context) -> anyhow::Result<FuzzerState> {
        if !self.resolve(ctx) {
            return Ok(FuzzerState::NotInstalled);
        }
        if self.is_running(ctx)? {
            Ok(FuzzerState::Running)
        } else {
            Ok(FuzzerState::Stopped)
        }
    }

    /// Start the fuzzer with outputs under `output_dir`.
    ///
    /// Foreground blocks until the engine exits; background launches the
    /// device-side run detached, then detaches a monitor process with an
    /// independent lifetime and returns immediately.
    pub fn start(&self, foreground: bool, output_dir: &Path, ctx: &Context) -> anyhow::Result<()> {
        if !ctx.host.is_dir(output_dir) {
            anyhow::bail!("No such directory: {}", output_dir.display());
        }
        ctx.console.echo(format!("Starting {}.", self));
        ctx.console
            .echo(format!("Outputs will be written to: {}", output_dir.display()));

        let url = self.executable_url();
        if foreground {
            let log_path = output_dir.join("fuzz-0.log");
            let ok = ctx
                .device
                .ssh_logged(&["run", &url, "-artifact_prefix=data/"], &log_path)?;
            if !ok {
                log::warn!("{} exited abnormally; see {}", self, log_path.display());
            }
        } else {
            ctx.device.ssh_detached(&["run", &url, "-artifact_prefix=data/"])?;
            let argv = vec![
                ctx.config.self_exe.to_string_lossy().into_owned(),
                "start".to_string(),
                "--monitor".to_string(),
                "--output".to_string(),
                output_dir.to_string_lossy().into_owned(),
                self.to_string(),
            ];
            ctx.runner.spawn_detached(&argv)?;
            ctx.console
                .echo(format!("Check status with \"fuzzctl check {}\".", self));
            ctx.console
                .echo(format!("Stop manually with \"fuzzctl stop {}\".", self));
        }
        Ok(())
    }

    /// Poll the process table until the fuzzer stops, then report.
    ///
    /// No internal timeout: this returns when the device-side run exits,
    /// and is otherwise cancelled only by external process termination.
    pub fn monitor(&self, output_dir: &Path, ctx: &Context) -> anyhow::Result<()> {
        while self.is_running(ctx)? {
            ctx.clock.sleep(ctx.config.poll_interval);
        }
        ctx.console.echo(format!("{} has stopped.", self));
        ctx.console
            .echo(format!("Output written to: {}.", output_dir.display()));
        Ok(())
    }

    /// Stop the fuzzer if it is running. Idempotent; a no-op stop is
    /// reported, never an error.
    pub fn stop(&self, ctx: &Context) -> anyhow::Result<()> {
        if self.is_running(ctx)? {
            ctx.console.echo(format!("Stopping {}.", self));
            let component = format!("{}.cmx", self.executable);
            ctx.device.ssh(&["killall", &component])?;
        } else {
            ctx.console.echo(format!("{} is already stopped.", self));
        }
        Ok(())
    }

    /// Emit the status report block for this fuzzer.
    pub fn check(&self, ctx: &Context) -> anyhow::Result<()> {
        let state = self.state(ctx)?;
        ctx.console.echo(format!("{}: {}", self, state));
        if state == FuzzerState::NotInstalled {
            ctx.console.echo("");
            return Ok(());
        }

        let sizes = ctx.device.list_sizes(&self.ns.abspath(self.corpus.live()))?;
        let inputs = sizes.len();
        let bytes: u64 = sizes.values().sum();
        ctx.console
            .echo(format!("    Corpus size:  {} inputs / {} bytes", inputs, bytes));

        let artifacts = self.artifacts(ctx)?;
        if !artifacts.is_empty() {
            ctx.console.echo("    Artifacts:");
            for artifact in artifacts {
                ctx.console.echo(format!("        {}", artifact.display()));
            }
        }
        ctx.console.echo("");
        Ok(())
    }

    /// Crash and leak artifacts under the output directory, in
    /// lexicographic order. Written by the fuzzing engine, never by us.
    pub fn artifacts(&self, ctx: &Context) -> anyhow::Result<Vec<PathBuf>> {
        if !ctx.host.is_dir(&self.output) {
            return Ok(Vec::new());
        }
        let artifacts = ctx
            .host
            .list_dir(&self.output)?
            .into_iter()
            .filter(|path| {
                path.file_name()
                    .and_then(OsStr::to_str)
                    .map(|name| name.starts_with("crash-") || name.starts_with("leak-"))
                    .unwrap_or(false)
            })
            .collect();
        Ok(artifacts)
    }

    /// Replay each unit against the fuzzer. Best effort: per-unit failures
    /// are reported but never abort the rest of the batch.
    pub fn repro(&self, units: &[PathBuf], ctx: &Context) -> anyhow::Result<()> {
        let mut failures = Vec::new();
        for unit in units {
            if let Err(e) = self.repro_one(unit, ctx) {
                log::warn!("failed to reproduce {}: {}", unit.display(), e);
                failures.push((unit, e));
            }
        }
        ctx.console.echo(format!(
            "Reproduced {} of {} units.",
            units.len() - failures.len(),
            units.len()
        ));
        for (unit, e) in &failures {
            ctx.console
                .echo(format!("Failed to reproduce {}: {}", unit.display(), e));
        }
        Ok(())
    }

    fn repro_one(&self, unit: &Path, ctx: &Context) -> anyhow::Result<()> {
        if !ctx.host.is_file(unit) {
            anyhow::bail!("No such file: {}", unit.display());
        }
        let name = unit
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow::anyhow!("bad unit path: {}", unit.display()))?;
        ctx.device.store(unit, &self.ns.data_abspath(&name))?;
        let nspath = self.ns.data(&name);
        let output = ctx.device.ssh(&["run", &self.executable_url(), &nspath])?;
        for line in output.lines() {
            ctx.console.echo(line);
        }
        Ok(())
    }
}
