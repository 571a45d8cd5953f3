//! Command execution capability.
//!
//! `OsRunner` is the real implementation; tests substitute an in-memory
//! runner that replays canned outputs.

use nix::unistd::setsid;
use std::fs::File;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Command, Stdio};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to spawn '{cmd}': {source}")]
    Spawn {
        cmd: String,
        source: std::io::Error,
    },
    #[error("'{cmd}' exited with status {status}: {stderr}")]
    Failed {
        cmd: String,
        status: i32,
        stderr: String,
    },
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub trait CommandRunner {
    /// Run `argv` to completion and return its captured stdout.
    /// A nonzero exit is a hard error.
    fn run(&self, argv: &[String]) -> Result<String, RunnerError>;

    /// Run `argv` to completion with stdout and stderr written to
    /// `log_path`. Returns whether the process exited successfully.
    fn run_logged(&self, argv: &[String], log_path: &Path) -> Result<bool, RunnerError>;

    /// Start `argv` detached, in its own session, with an independent
    /// lifetime. Fire and forget.
    fn spawn_detached(&self, argv: &[String]) -> Result<(), RunnerError>;
}

pub struct OsRunner;

fn command(argv: &[String]) -> Command {
    debug_assert!(!argv.is_empty());
    let mut cmd = Command::new(&argv[0]);
    cmd.args(&argv[1..]);
    cmd
}

impl CommandRunner for OsRunner {
    fn run(&self, argv: &[String]) -> Result<String, RunnerError> {
        let cmd_str = argv.join(" ");
        log::debug!("run: {}", cmd_str);
        let output = command(argv)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| RunnerError::Spawn {
                cmd: cmd_str.clone(),
                source: e,
            })?;
        if !output.status.success() {
            return Err(RunnerError::Failed {
                cmd: cmd_str,
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn run_logged(&self, argv: &[String], log_path: &Path) -> Result<bool, RunnerError> {
        let cmd_str = argv.join(" ");
        log::debug!("run (logged to {}): {}", log_path.display(), cmd_str);
        let log = File::create(log_path)?;
        let log_err = log.try_clone()?;
        let status = command(argv)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            .status()
            .map_err(|e| RunnerError::Spawn {
                cmd: cmd_str,
                source: e,
            })?;
        Ok(status.success())
    }

    fn spawn_detached(&self, argv: &[String]) -> Result<(), RunnerError> {
        let cmd_str = argv.join(" ");
        log::debug!("spawn detached: {}", cmd_str);
        let mut cmd = command(argv);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        unsafe {
            cmd.pre_exec(|| {
                let _ = setsid();
                Ok(())
            });
        }
        cmd.spawn().map_err(|e| RunnerError::Spawn {
            cmd: cmd_str,
            source: e,
        })?;
        Ok(())
    }
}
