use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// Device address.
    pub device_addr: String,
    /// Path to the ssh identity used to reach the device.
    pub ssh_key: PathBuf,
    /// Build-generated listing of fuzz targets.
    pub fuzzers_json: PathBuf,
    /// Resolved package names, one per line.
    pub package_manifest: PathBuf,
    /// Base directory for per-fuzzer outputs.
    pub output_dir: PathBuf,
    /// Path of this controller binary, used to re-invoke the monitor.
    pub self_exe: PathBuf,
    /// Interval between process-table polls in the monitor loop.
    pub poll_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_addr: "::1".to_string(),
            ssh_key: PathBuf::from(".ssh/fuzz_ed25519"),
            fuzzers_json: PathBuf::from("fuzzers.json"),
            package_manifest: PathBuf::from("package_manifests.list"),
            output_dir: PathBuf::from("output"),
            self_exe: PathBuf::from("fuzzctl"),
            poll_interval: Duration::from_secs(2),
        }
    }
}

impl Config {
    /// Validate eagerly, in declaration order, so the first reported error
    /// is reproducible for the same inputs.
    pub fn check(&self) -> anyhow::Result<()> {
        if self.device_addr.is_empty() {
            anyhow::bail!("empty device address");
        }
        if !self.ssh_key.is_file() {
            anyhow::bail!("bad ssh key: {}", self.ssh_key.display());
        }
        if !self.fuzzers_json.is_file() {
            anyhow::bail!("bad fuzzers listing: {}", self.fuzzers_json.display());
        }
        if !self.package_manifest.is_file() {
            anyhow::bail!("bad package manifest: {}", self.package_manifest.display());
        }
        Ok(())
    }
}
