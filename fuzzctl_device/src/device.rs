//! Device abstraction: remote execution, file transfer, and the process
//! table tracker.

use crate::runner::{CommandRunner, RunnerError};
use crate::ssh;
use crate::HashMap;
use regex::Regex;
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

/// Fixed status command whose output lists running components.
const STATUS_CMD: &str = "cs";

/// One parsed line of process-table output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRecord {
    pub name: String,
    pub pid: u32,
    pub package: String,
}

/// A remote device reachable over the ssh transport.
///
/// The pid cache is the only mutable state and is scoped to one controller
/// invocation; refresh replaces it wholesale so a record that disappeared
/// from the latest status output can never be resolved again.
pub struct Device {
    addr: String,
    ssh_opts: Vec<String>,
    runner: Rc<dyn CommandRunner>,
    pids: RefCell<HashMap<(String, String), u32>>,
    status_line: Regex,
}

impl Device {
    pub fn new(addr: &str, ssh_key: &str, runner: Rc<dyn CommandRunner>) -> Self {
        Self {
            addr: addr.to_string(),
            ssh_opts: ssh::ssh_options(ssh_key),
            runner,
            pids: RefCell::new(HashMap::default()),
            // "  <exe>.cmx[<pid>]: fuchsia-pkg://fuchsia.com/<pkg>#meta/<exe>.cmx"
            status_line: Regex::new(
                r"^\s*(?P<name>[^\s\[]+)\.cmx\[(?P<pid>\d+)\]: fuchsia-pkg://fuchsia\.com/(?P<package>[^#\s]+)#meta/(?P<meta>\S+)\.cmx\s*$",
            )
            .unwrap(),
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn ssh_opts(&self) -> &[String] {
        &self.ssh_opts
    }

    fn ssh_argv(&self, args: &[&str]) -> Vec<String> {
        ssh::ssh_argv(&self.ssh_opts, &self.addr, args)
    }

    /// Run a command on the device and return its captured stdout.
    pub fn ssh(&self, args: &[&str]) -> Result<String, RunnerError> {
        self.runner.run(&self.ssh_argv(args))
    }

    /// Run a command on the device with output appended to a local log.
    pub fn ssh_logged(&self, args: &[&str], log_path: &Path) -> Result<bool, RunnerError> {
        self.runner.run_logged(&self.ssh_argv(args), log_path)
    }

    /// Start a command on the device without waiting for it.
    pub fn ssh_detached(&self, args: &[&str]) -> Result<(), RunnerError> {
        self.runner.spawn_detached(&self.ssh_argv(args))
    }

    /// Remote path as scp expects it.
    pub fn scp_rpath(&self, path: &str) -> String {
        format!("[{}]:{}", self.addr, path)
    }

    /// Copy a local file to an absolute path on the device.
    pub fn store(&self, local: &Path, remote: &str) -> Result<(), RunnerError> {
        let local = local.to_string_lossy();
        let rpath = self.scp_rpath(remote);
        let argv = ssh::scp_argv(&self.ssh_opts, &[&local, &rpath]);
        self.runner.run(&argv).map(|_| ())
    }

    /// Copy a file from the device to a local path.
    pub fn fetch(&self, remote: &str, local: &Path) -> Result<(), RunnerError> {
        let rpath = self.scp_rpath(remote);
        let local = local.to_string_lossy();
        let argv = ssh::scp_argv(&self.ssh_opts, &[&rpath, &local]);
        self.runner.run(&argv).map(|_| ())
    }

    /// Look up the pid for `(package, executable)`.
    ///
    /// With `refresh`, queries the device and re-parses every returned line,
    /// replacing the cache. Lines that do not match the expected shape are
    /// skipped; absence of a match is `None`, not an error.
    pub fn getpid(
        &self,
        package: &str,
        executable: &str,
        refresh: bool,
    ) -> Result<Option<u32>, RunnerError> {
        if refresh {
            let output = self.ssh(&[STATUS_CMD])?;
            let mut pids = HashMap::default();
            for record in self.parse_status(&output) {
                pids.insert((record.package, record.name), record.pid);
            }
            *self.pids.borrow_mut() = pids;
        }
        let key = (package.to_string(), executable.to_string());
        Ok(self.pids.borrow().get(&key).copied())
    }

    fn parse_status(&self, output: &str) -> Vec<ProcessRecord> {
        let mut records = Vec::new();
        for line in output.lines() {
            let caps = match self.status_line.captures(line) {
                Some(caps) => caps,
                None => continue,
            };
            if caps["name"] != caps["meta"] {
                continue;
            }
            let pid = match caps["pid"].parse() {
                Ok(pid) => pid,
                Err(_) => continue,
            };
            records.push(ProcessRecord {
                name: caps["name"].to_string(),
                pid,
                package: caps["package"].to_string(),
            });
        }
        records
    }

    /// List `{file name -> size}` for a directory on the device.
    ///
    /// A failing `ls` (typically a directory that does not exist yet) is an
    /// expected-absence condition and yields an empty map; only transport
    /// failures propagate.
    pub fn list_sizes(&self, path: &str) -> Result<HashMap<String, u64>, RunnerError> {
        let output = match self.ssh(&["ls", "-l", path]) {
            Ok(output) => output,
            Err(RunnerError::Failed { .. }) => return Ok(HashMap::default()),
            Err(e) => return Err(e),
        };
        let mut sizes = HashMap::default();
        for line in output.lines() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 9 || fields[0].starts_with('d') {
                continue;
            }
            let size = match fields[4].parse() {
                Ok(size) => size,
                Err(_) => continue,
            };
            sizes.insert(fields[8..].join(" "), size);
        }
        Ok(sizes)
    }
}
