//! Namespace resolution for one fuzzer.
//!
//! Maps logical relative paths under the fuzzer's `data` root to namespace
//! paths and device-absolute paths. Pure and idempotent: the same input
//! always resolves to the same output for the same fuzzer identity.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    package: String,
    executable: String,
}

impl Namespace {
    pub fn new(package: &str, executable: &str) -> Self {
        Self {
            package: package.to_string(),
            executable: executable.to_string(),
        }
    }

    /// Namespace path for a logical relative path under the data root.
    pub fn data(&self, relpath: &str) -> String {
        format!("data/{}", relpath)
    }

    /// Device-absolute path for a namespace path.
    pub fn abspath(&self, nspath: &str) -> String {
        let rest = nspath.strip_prefix("data/").unwrap_or(nspath);
        format!(
            "/data/r/sys/fuchsia.com:{}:0#meta:{}.cmx/{}",
            self.package, self.executable, rest
        )
    }

    pub fn data_abspath(&self, relpath: &str) -> String {
        self.abspath(&self.data(relpath))
    }
}
