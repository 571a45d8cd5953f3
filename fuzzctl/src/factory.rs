//! Session registry: construct fuzzer sessions from a name pattern
//! matched against the known `(package, executable)` pairs.

use crate::fuzzer::Fuzzer;
use crate::Context;

/// Case-sensitive substring/path matching. A pattern containing `/` splits
/// once and matches package and executable independently; otherwise it
/// matches either field. An empty pattern matches everything.
fn matches(pattern: &str, package: &str, executable: &str) -> bool {
    if pattern.is_empty() {
        return true;
    }
    match pattern.split_once('/') {
        Some((p, e)) => package.contains(p) && executable.contains(e),
        None => package.contains(pattern) || executable.contains(pattern),
    }
}

/// Sessions for every known fuzzer matching `pattern`, in discovery order.
pub fn matching_fuzzers(pattern: &str, ctx: &Context) -> Vec<Fuzzer> {
    ctx.buildenv
        .fuzzers()
        .iter()
        .filter(|(package, executable)| matches(pattern, package, executable))
        .map(|(package, executable)| Fuzzer::new(package, executable, &ctx.config.output_dir))
        .collect()
}

/// Resolve a pattern that must name exactly one fuzzer.
pub fn one_fuzzer(pattern: &str, ctx: &Context) -> anyhow::Result<Fuzzer> {
    let mut matched = matching_fuzzers(pattern, ctx);
    match matched.len() {
        0 => anyhow::bail!("No matching fuzzers: {}", pattern),
        1 => Ok(matched.remove(0)),
        _ => {
            let names: Vec<String> = matched.iter().map(|f| format!("  {}", f)).collect();
            anyhow::bail!(
                "Multiple matching fuzzers for '{}':\n{}",
                pattern,
                names.join("\n")
            )
        }
    }
}
