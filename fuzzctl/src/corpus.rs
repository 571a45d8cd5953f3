//! Corpus and dictionary synchronization across local disk, the device
//! namespace, and cloud object storage. Used only by the analyze workflow.

use crate::fuzzer::Fuzzer;
use crate::host::FileStore;
use crate::Context;
use anyhow::Context as _;
use fuzzctl_device::runner::RunnerError;
use std::path::{Path, PathBuf};

/// Cloud bucket holding external reference corpora.
pub const CLOUD_BUCKET: &str = "gs://corpus.internal.clusterfuzz.com/libFuzzer";

/// Device-side corpus locations for one fuzzer: live corpus first, then
/// the previous generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Corpus {
    pub nspaths: [String; 2],
}

impl Corpus {
    pub fn for_fuzzer(ns: &crate::ns::Namespace) -> Self {
        Self {
            nspaths: [ns.data("corpus"), ns.data("corpus.prev")],
        }
    }

    pub fn live(&self) -> &str {
        &self.nspaths[0]
    }
}

/// A dictionary installed into the fuzzer's namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dictionary {
    pub nspath: String,
}

/// Outcome of one analyze pass.
#[derive(Debug)]
pub struct Analysis {
    /// Unit files transferred from local corpus directories.
    pub transferred: usize,
    /// Unit files transferred from the cloud fetch.
    pub fetched: usize,
    pub dictionary: Option<Dictionary>,
}

/// Deterministic cloud location for a fuzzer's reference corpus.
pub fn cloud_url(package: &str, executable: &str) -> String {
    format!("{}/fuchsia_{}-{}", CLOUD_BUCKET, package, executable)
}

/// Staging directory removed on every exit path, including errors.
struct StagingDir<'a> {
    host: &'a dyn FileStore,
    path: PathBuf,
}

impl<'a> Drop for StagingDir<'a> {
    fn drop(&mut self) {
        if let Err(e) = self.host.remove_dir_all(&self.path) {
            log::warn!("failed to remove {}: {}", self.path.display(), e);
        }
    }
}

/// Reconcile the fuzzer's corpus and dictionary.
///
/// Validation is eager and ordered: corpus directories in argument order,
/// then the dictionary. Transfers run in three sequential passes (local,
/// cloud, dictionary); same-named files are last-writer-wins by transfer
/// order, with no content dedup.
pub fn analyze(
    fuzzer: &Fuzzer,
    corpus_dirs: &[PathBuf],
    dictionary: Option<&Path>,
    local_only: bool,
    ctx: &Context,
) -> anyhow::Result<Analysis> {
    for dir in corpus_dirs {
        if !ctx.host.is_dir(dir) {
            anyhow::bail!("No such directory: {}", dir.display());
        }
    }
    if let Some(dict) = dictionary {
        if !ctx.host.is_file(dict) {
            anyhow::bail!("No such file: {}", dict.display());
        }
    }

    let staging = if local_only {
        None
    } else {
        let path = ctx
            .host
            .create_temp_dir()
            .context("failed to create staging directory")?;
        let staging = StagingDir {
            host: ctx.host.as_ref(),
            path,
        };
        fetch_cloud_corpus(fuzzer, &staging.path, ctx)?;
        Some(staging)
    };

    let corpus_abspath = fuzzer.ns().abspath(fuzzer.corpus().live());
    let mut transferred = 0;
    for dir in corpus_dirs {
        for unit in ctx.host.list_dir(dir)? {
            ctx.device
                .store(&unit, &corpus_abspath)
                .with_context(|| format!("failed to transfer {}", unit.display()))?;
            transferred += 1;
        }
    }

    let mut fetched = 0;
    if let Some(staging) = &staging {
        for unit in ctx.host.list_dir(&staging.path)? {
            ctx.device
                .store(&unit, &corpus_abspath)
                .with_context(|| format!("failed to transfer {}", unit.display()))?;
            fetched += 1;
        }
    }

    let dictionary = match dictionary {
        Some(dict) => {
            let name = dict
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| anyhow::anyhow!("bad dictionary path: {}", dict.display()))?;
            let nspath = fuzzer.ns().data(&name);
            ctx.device
                .store(dict, &fuzzer.ns().abspath(&nspath))
                .with_context(|| format!("failed to transfer {}", dict.display()))?;
            Some(Dictionary { nspath })
        }
        None => None,
    };

    Ok(Analysis {
        transferred,
        fetched,
        dictionary,
    })
}

/// Fetch the external reference corpus into `dest`.
///
/// A prefix with zero objects is not an error: the bulk copy's failure is
/// tolerated and whatever landed in `dest` (possibly nothing) is used.
/// Spawn-level failures still propagate.
fn fetch_cloud_corpus(fuzzer: &Fuzzer, dest: &Path, ctx: &Context) -> anyhow::Result<()> {
    let url = cloud_url(fuzzer.package(), fuzzer.executable());
    log::info!("fetching corpus from {}", url);
    let argv = vec![
        "gsutil".to_string(),
        "-m".to_string(),
        "cp".to_string(),
        format!("{}/*", url),
        dest.to_string_lossy().into_owned(),
    ];
    match ctx.runner.run(&argv) {
        Ok(_) => Ok(()),
        Err(RunnerError::Failed { .. }) => {
            log::debug!("no objects under {}", url);
            Ok(())
        }
        Err(e) => Err(e).context("corpus fetch failed"),
    }
}
