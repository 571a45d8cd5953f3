//! Build manifest boundary: which fuzzers exist in the build, and which
//! packages are resolved (installed). How these files are produced is out
//! of scope; this module only reads them.

use crate::config::Config;
use crate::host::FileStore;
use anyhow::Context as _;
use serde_derive::Deserialize;
use std::collections::HashSet;

/// One entry of the build-generated `fuzzers.json`.
#[derive(Debug, Deserialize)]
struct FuzzersJsonEntry {
    package: String,
    fuzzers: Vec<String>,
}

pub struct BuildEnv {
    fuzzers: Vec<(String, String)>,
    resolved: HashSet<String>,
}

impl BuildEnv {
    pub fn new(fuzzers: Vec<(String, String)>, resolved: HashSet<String>) -> Self {
        Self { fuzzers, resolved }
    }

    pub fn load(config: &Config, host: &dyn FileStore) -> anyhow::Result<Self> {
        let raw = host
            .read_to_string(&config.fuzzers_json)
            .with_context(|| format!("failed to read {}", config.fuzzers_json.display()))?;
        let entries: Vec<FuzzersJsonEntry> = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse {}", config.fuzzers_json.display()))?;
        let mut fuzzers = Vec::new();
        for entry in entries {
            for fuzzer in entry.fuzzers {
                fuzzers.push((entry.package.clone(), fuzzer));
            }
        }

        let manifest = host
            .read_to_string(&config.package_manifest)
            .with_context(|| format!("failed to read {}", config.package_manifest.display()))?;
        let resolved = manifest
            .lines()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .map(|l| l.to_string())
            .collect();

        Ok(Self { fuzzers, resolved })
    }

    /// Known `(package, executable)` pairs in discovery order.
    pub fn fuzzers(&self) -> &[(String, String)] {
        &self.fuzzers
    }

    /// Whether `package` appears in the resolved-package manifest.
    pub fn is_resolved(&self, package: &str) -> bool {
        self.resolved.contains(package)
    }
}
