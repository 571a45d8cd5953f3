//! One handler per CLI operation. The literal report text here is a
//! script-facing contract; change it and downstream tooling breaks.

use crate::corpus;
use crate::factory;
use crate::Context;
use std::path::PathBuf;

pub struct StartOptions {
    pub foreground: bool,
    pub monitor: bool,
    pub output: Option<PathBuf>,
}

pub fn list_fuzzers(pattern: Option<&str>, ctx: &Context) -> anyhow::Result<()> {
    let matched = factory::matching_fuzzers(pattern.unwrap_or(""), ctx);
    if matched.is_empty() {
        ctx.console.echo("No matching fuzzers.");
        return Ok(());
    }
    ctx.console
        .echo(format!("Found {} matching fuzzers:", matched.len()));
    for fuzzer in matched {
        ctx.console.echo(format!("  {}", fuzzer));
    }
    Ok(())
}

pub fn start_fuzzer(opts: &StartOptions, name: &str, ctx: &Context) -> anyhow::Result<()> {
    let fuzzer = factory::one_fuzzer(name, ctx)?;
    let output = opts
        .output
        .clone()
        .unwrap_or_else(|| fuzzer.output().to_path_buf());
    if opts.monitor {
        fuzzer.monitor(&output, ctx)
    } else {
        fuzzer.start(opts.foreground, &output, ctx)
    }
}

pub fn check_fuzzer(name: Option<&str>, ctx: &Context) -> anyhow::Result<()> {
    match name {
        Some(name) => {
            let matched = factory::matching_fuzzers(name, ctx);
            if matched.is_empty() {
                anyhow::bail!("No matching fuzzers: {}", name);
            }
            for fuzzer in matched {
                fuzzer.check(ctx)?;
            }
        }
        None => {
            let mut running = false;
            for fuzzer in factory::matching_fuzzers("", ctx) {
                if fuzzer.resolve(ctx) && fuzzer.is_running(ctx)? {
                    fuzzer.check(ctx)?;
                    running = true;
                }
            }
            if !running {
                ctx.console.echo("No fuzzers are running.");
                ctx.console.echo("Include 'name' to check specific fuzzers.");
            }
        }
    }
    Ok(())
}

pub fn stop_fuzzer(name: &str, ctx: &Context) -> anyhow::Result<()> {
    let fuzzer = factory::one_fuzzer(name, ctx)?;
    fuzzer.stop(ctx)
}

pub fn repro_units(name: &str, units: &[PathBuf], ctx: &Context) -> anyhow::Result<()> {
    let fuzzer = factory::one_fuzzer(name, ctx)?;
    fuzzer.repro(units, ctx)
}

pub fn analyze_fuzzer(
    name: &str,
    corpus_dirs: &[PathBuf],
    dictionary: Option<&std::path::Path>,
    local_only: bool,
    ctx: &Context,
) -> anyhow::Result<()> {
    let fuzzer = factory::one_fuzzer(name, ctx)?;
    let analysis = corpus::analyze(&fuzzer, corpus_dirs, dictionary, local_only, ctx)?;
    ctx.console.echo(format!(
        "Corpus of {} synchronized: {} local inputs, {} from cloud.",
        fuzzer, analysis.transferred, analysis.fetched
    ));
    if let Some(dictionary) = analysis.dictionary {
        ctx.console
            .echo(format!("Dictionary installed at {}.", dictionary.nspath));
    }
    Ok(())
}
