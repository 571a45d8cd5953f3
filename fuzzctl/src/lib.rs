//! fuzzctl: command-line controller for fuzz targets running on a remote
//! device.

pub mod buildenv;
pub mod command;
pub mod config;
pub mod corpus;
pub mod factory;
pub mod fuzzer;
pub mod host;
pub mod ns;

#[cfg(test)]
pub(crate) mod test_util;

use crate::buildenv::BuildEnv;
use crate::config::Config;
use crate::host::{Console, FileStore, OsFileStore};
use anyhow::Context as _;
use fuzzctl_device::clock::{Clock, SystemClock};
use fuzzctl_device::device::Device;
use fuzzctl_device::runner::{CommandRunner, OsRunner};
use std::rc::Rc;

/// Capabilities every operation runs against. Constructed once per
/// invocation and passed explicitly; there is no ambient global state.
pub struct Context {
    pub config: Config,
    pub buildenv: BuildEnv,
    pub host: Rc<dyn FileStore>,
    pub runner: Rc<dyn CommandRunner>,
    pub device: Rc<Device>,
    pub clock: Rc<dyn Clock>,
    pub console: Rc<Console>,
}

impl Context {
    /// Build a context over the real host, device, and clock.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        config.check().context("config error")?;
        let host: Rc<dyn FileStore> = Rc::new(OsFileStore);
        let runner: Rc<dyn CommandRunner> = Rc::new(OsRunner);
        let device = Rc::new(Device::new(
            &config.device_addr,
            &config.ssh_key.to_string_lossy(),
            runner.clone(),
        ));
        let buildenv =
            BuildEnv::load(&config, host.as_ref()).context("failed to load build manifest")?;
        Ok(Self {
            config,
            buildenv,
            host,
            runner,
            device,
            clock: Rc::new(SystemClock::new()),
            console: Rc::new(Console::stdout()),
        })
    }
}
