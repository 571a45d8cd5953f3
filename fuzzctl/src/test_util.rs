//! Deterministic in-memory implementations of the capability interfaces,
//! plus a context builder shared by the unit tests. No wall-clock time,
//! no processes, no disk.

use crate::buildenv::BuildEnv;
use crate::config::Config;
use crate::fuzzer::Fuzzer;
use crate::host::{Console, FileStore};
use crate::Context;
use fuzzctl_device::clock::Clock;
use fuzzctl_device::device::Device;
use fuzzctl_device::runner::{CommandRunner, RunnerError};
use fuzzctl_device::ssh;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

/// Simulated clock: `sleep` advances elapsed time instantly.
pub struct FakeClock {
    elapsed: Cell<Duration>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            elapsed: Cell::new(Duration::from_secs(0)),
        }
    }
}

impl Clock for FakeClock {
    fn elapsed(&self) -> Duration {
        self.elapsed.get()
    }

    fn sleep(&self, d: Duration) {
        self.elapsed.set(self.elapsed.get() + d);
    }
}

struct Scheduled {
    text: String,
    start: Duration,
    end: Option<Duration>,
}

/// Runner that records every invocation and replays scheduled outputs,
/// keyed by the full joined argv. An output may be scheduled to appear
/// and/or disappear at a simulated time, which is how tests model a
/// fuzzer stopping after a duration.
pub struct FakeRunner {
    clock: Rc<FakeClock>,
    outputs: RefCell<BTreeMap<String, Vec<Scheduled>>>,
    failing: RefCell<Vec<String>>,
    calls: RefCell<Vec<Vec<String>>>,
}

impl FakeRunner {
    pub fn new(clock: Rc<FakeClock>) -> Self {
        Self {
            clock,
            outputs: RefCell::new(BTreeMap::new()),
            failing: RefCell::new(Vec::new()),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Add output for `key`, visible from now until `end` (if any).
    pub fn schedule(&self, key: &str, text: &str, end: Option<Duration>) {
        self.outputs.borrow_mut().entry(key.to_string()).or_default().push(Scheduled {
            text: text.to_string(),
            start: self.clock.elapsed(),
            end,
        });
    }

    /// Replace all output for `key`.
    pub fn set_output(&self, key: &str, text: &str) {
        self.outputs.borrow_mut().remove(key);
        self.schedule(key, text, None);
    }

    /// Make every command whose argv contains `pattern` exit nonzero.
    pub fn fail_matching(&self, pattern: &str) {
        self.failing.borrow_mut().push(pattern.to_string());
    }

    pub fn ran(&self, argv: &[&str]) -> bool {
        self.calls
            .borrow()
            .iter()
            .any(|call| call.iter().map(String::as_str).eq(argv.iter().copied()))
    }

    pub fn ran_command_named(&self, name: &str) -> bool {
        self.calls
            .borrow()
            .iter()
            .any(|call| call.first().map(String::as_str) == Some(name))
    }

    fn record(&self, argv: &[String]) -> String {
        self.calls.borrow_mut().push(argv.to_vec());
        argv.join(" ")
    }

    fn fails(&self, cmd: &str) -> bool {
        self.failing.borrow().iter().any(|p| cmd.contains(p))
    }

    fn output_for(&self, cmd: &str) -> String {
        let now = self.clock.elapsed();
        let outputs = self.outputs.borrow();
        let mut lines = Vec::new();
        if let Some(scheduled) = outputs.get(cmd) {
            for s in scheduled {
                if now >= s.start && s.end.map_or(true, |end| now < end) {
                    lines.push(s.text.clone());
                }
            }
        }
        lines.join("\n")
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, argv: &[String]) -> Result<String, RunnerError> {
        let cmd = self.record(argv);
        if self.fails(&cmd) {
            return Err(RunnerError::Failed {
                cmd,
                status: 1,
                stderr: String::new(),
            });
        }
        Ok(self.output_for(&cmd))
    }

    fn run_logged(&self, argv: &[String], _log_path: &Path) -> Result<bool, RunnerError> {
        let cmd = self.record(argv);
        Ok(!self.fails(&cmd))
    }

    fn spawn_detached(&self, argv: &[String]) -> Result<(), RunnerError> {
        self.record(argv);
        Ok(())
    }
}

/// In-memory filesystem.
pub struct FakeFileStore {
    files: RefCell<BTreeMap<PathBuf, String>>,
    dirs: RefCell<BTreeSet<PathBuf>>,
    temp_count: Cell<usize>,
    temp_seeds: RefCell<Vec<String>>,
}

impl FakeFileStore {
    pub fn new() -> Self {
        Self {
            files: RefCell::new(BTreeMap::new()),
            dirs: RefCell::new(BTreeSet::new()),
            temp_count: Cell::new(0),
            temp_seeds: RefCell::new(Vec::new()),
        }
    }

    pub fn touch(&self, path: &Path) {
        self.files
            .borrow_mut()
            .insert(path.to_path_buf(), String::new());
    }

    pub fn write(&self, path: &Path, contents: &str) {
        self.files
            .borrow_mut()
            .insert(path.to_path_buf(), contents.to_string());
    }

    pub fn mkdir(&self, path: &Path) {
        self.dirs.borrow_mut().insert(path.to_path_buf());
    }

    /// Make the next created temp dir appear to contain `name`, as if a
    /// cloud fetch had retrieved it.
    pub fn seed_temp_file(&self, name: &str) {
        self.temp_seeds.borrow_mut().push(name.to_string());
    }
}

impl FileStore for FakeFileStore {
    fn is_dir(&self, path: &Path) -> bool {
        self.dirs.borrow().contains(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.borrow().contains_key(path)
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        if !self.is_dir(path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{}", path.display()),
            ));
        }
        Ok(self
            .files
            .borrow()
            .keys()
            .filter(|p| p.parent() == Some(path))
            .cloned()
            .collect())
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files.borrow().get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{}", path.display()))
        })
    }

    fn create_temp_dir(&self) -> io::Result<PathBuf> {
        let n = self.temp_count.get();
        self.temp_count.set(n + 1);
        let path = PathBuf::from(format!("/tmp/fuzzctl-test-{}", n));
        self.mkdir(&path);
        for seed in self.temp_seeds.borrow().iter() {
            self.files
                .borrow_mut()
                .insert(path.join(seed), String::new());
        }
        Ok(path)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        self.dirs.borrow_mut().retain(|p| !p.starts_with(path));
        self.files.borrow_mut().retain(|p, _| !p.starts_with(path));
        Ok(())
    }
}

/// Everything a test needs: a context over in-memory capabilities plus
/// direct handles to the fakes.
pub struct TestContext {
    pub ctx: Context,
    pub clock: Rc<FakeClock>,
    pub runner: Rc<FakeRunner>,
    pub host: Rc<FakeFileStore>,
    next_pid: Cell<u32>,
}

impl TestContext {
    pub fn new() -> Self {
        let clock = Rc::new(FakeClock::new());
        let runner = Rc::new(FakeRunner::new(clock.clone()));
        let host = Rc::new(FakeFileStore::new());
        let config = Config {
            device_addr: "::1".to_string(),
            ssh_key: PathBuf::from("/fake/key"),
            output_dir: PathBuf::from("/out"),
            self_exe: PathBuf::from("fuzzctl"),
            poll_interval: Duration::from_secs(1),
            ..Config::default()
        };
        let device = Rc::new(Device::new(
            &config.device_addr,
            "/fake/key",
            runner.clone() as Rc<dyn CommandRunner>,
        ));
        let buildenv = BuildEnv::new(
            vec![
                ("fake-package1".to_string(), "fake-target1".to_string()),
                ("fake-package1".to_string(), "fake-target2".to_string()),
                ("fake-package1".to_string(), "fake-target3".to_string()),
                ("fake-package2".to_string(), "fake-target1".to_string()),
            ],
            vec!["fake-package1".to_string()].into_iter().collect(),
        );
        let ctx = Context {
            config,
            buildenv,
            host: host.clone() as Rc<dyn FileStore>,
            runner: runner.clone() as Rc<dyn CommandRunner>,
            device,
            clock: clock.clone() as Rc<dyn Clock>,
            console: Rc::new(Console::buffered()),
        };
        Self {
            ctx,
            clock,
            runner,
            host,
            next_pid: Cell::new(10000),
        }
    }

    pub fn fuzzer(&self, package: &str, executable: &str) -> Fuzzer {
        Fuzzer::new(package, executable, &self.ctx.config.output_dir)
    }

    /// Drain the report lines echoed since the last call.
    pub fn lines(&self) -> Vec<String> {
        self.ctx.console.take()
    }

    fn ssh_key_for(&self, args: &[&str]) -> String {
        ssh::ssh_argv(self.ctx.device.ssh_opts(), self.ctx.device.addr(), args).join(" ")
    }

    /// Mark a packaged executable as running on the device. With a
    /// duration, the record disappears from the process table once that
    /// much simulated time has passed.
    pub fn set_running(&self, package: &str, executable: &str, duration: Option<Duration>) -> u32 {
        let pid = self.next_pid.get();
        self.next_pid.set(pid + 1);
        let line = format!(
            "  {}.cmx[{}]: fuchsia-pkg://fuchsia.com/{}#meta/{}.cmx",
            executable, pid, package, executable
        );
        let end = duration.map(|d| self.clock.elapsed() + d);
        self.runner.schedule(&self.ssh_key_for(&["cs"]), &line, end);
        let _ = self.ctx.device.getpid(package, executable, true);
        pid
    }

    /// Set the `ls -l` listing for a device directory.
    pub fn set_listing(&self, abspath: &str, entries: &[(&str, u64)]) {
        let listing: Vec<String> = entries
            .iter()
            .map(|(name, size)| format!("-rw-r--r-- 1 0 0 {} Mar 18 22:02 {}", size, name))
            .collect();
        self.runner
            .set_output(&self.ssh_key_for(&["ls", "-l", abspath]), &listing.join("\n"));
    }

    pub fn ran(&self, argv: &[&str]) -> bool {
        self.runner.ran(argv)
    }

    pub fn ran_command_named(&self, name: &str) -> bool {
        self.runner.ran_command_named(name)
    }

    /// Whether a remote command ran over ssh.
    pub fn ran_ssh(&self, args: &[&str]) -> bool {
        let argv = ssh::ssh_argv(self.ctx.device.ssh_opts(), self.ctx.device.addr(), args);
        let argv: Vec<&str> = argv.iter().map(String::as_str).collect();
        self.runner.ran(&argv)
    }

    /// Whether local files were copied to a device path.
    pub fn ran_scp_to(&self, locals: &[&str], remote: &str) -> bool {
        let rpath = self.ctx.device.scp_rpath(remote);
        let mut paths: Vec<&str> = locals.to_vec();
        paths.push(&rpath);
        let argv = ssh::scp_argv(self.ctx.device.ssh_opts(), &paths);
        let argv: Vec<&str> = argv.iter().map(String::as_str).collect();
        self.runner.ran(&argv)
    }
}
