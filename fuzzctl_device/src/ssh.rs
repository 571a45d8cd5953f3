//! Argv construction for the ssh/scp transport.
//!
//! The controller never speaks the ssh protocol itself; it builds argument
//! vectors and hands them to a [`crate::runner::CommandRunner`].

/// Batch-mode option block shared by ssh and scp invocations.
pub fn ssh_options(key: &str) -> Vec<String> {
    let opts = [
        "-F",
        "/dev/null",
        "-o",
        "UserKnownHostsFile=/dev/null",
        "-o",
        "BatchMode=yes",
        "-o",
        "IdentitiesOnly=yes",
        "-o",
        "StrictHostKeyChecking=no",
        "-o",
        "ConnectTimeout=10",
        "-i",
        key,
    ];
    opts.iter().map(|s| s.to_string()).collect()
}

/// `ssh <opts> <addr> <args...>`
pub fn ssh_argv(opts: &[String], addr: &str, args: &[&str]) -> Vec<String> {
    let mut argv = vec!["ssh".to_string()];
    argv.extend(opts.iter().cloned());
    argv.push(addr.to_string());
    argv.extend(args.iter().map(|a| a.to_string()));
    argv
}

/// `scp <opts> <paths...>`; the caller decides which path is remote.
pub fn scp_argv(opts: &[String], paths: &[&str]) -> Vec<String> {
    let mut argv = vec!["scp".to_string()];
    argv.extend(opts.iter().cloned());
    argv.extend(paths.iter().map(|p| p.to_string()));
    argv
}
