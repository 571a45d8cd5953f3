use anyhow::Context as _;
use env_logger::{Env, TimestampPrecision};
use fuzzctl::command::{self, StartOptions};
use fuzzctl::config::Config;
use fuzzctl::Context;
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "fuzzctl", about = "Control fuzz targets on a remote device.")]
struct Settings {
    /// Address of the device under test.
    #[structopt(long, short = "D", default_value = "::1")]
    device: String,
    /// Path to ssh secret key to login to the device.
    #[structopt(long, short = "s", default_value = ".ssh/fuzz_ed25519")]
    ssh_key: PathBuf,
    /// Build-generated listing of fuzz targets.
    #[structopt(long, default_value = "fuzzers.json")]
    fuzzers_json: PathBuf,
    /// Listing of resolved package names, one per line.
    #[structopt(long, default_value = "package_manifests.list")]
    package_manifest: PathBuf,
    /// Base directory for per-fuzzer outputs.
    #[structopt(long, short = "o", default_value = "output")]
    output: PathBuf,
    #[structopt(subcommand)]
    cmd: Cmd,
}

#[derive(Debug, StructOpt)]
enum Cmd {
    /// List fuzzers matching a name pattern.
    List { name: Option<String> },
    /// Start a fuzzer on the device.
    Start {
        /// Block until the fuzzer exits instead of detaching.
        #[structopt(long, short = "f")]
        foreground: bool,
        /// Poll an already-started fuzzer until it stops (used internally).
        #[structopt(long)]
        monitor: bool,
        /// Directory for this run's outputs.
        #[structopt(long, short = "O")]
        output: Option<PathBuf>,
        name: String,
    },
    /// Report the status of one or more fuzzers.
    Check { name: Option<String> },
    /// Stop a running fuzzer.
    Stop { name: String },
    /// Replay unit files against a fuzzer.
    Repro { name: String, units: Vec<PathBuf> },
    /// Synchronize a fuzzer's corpus and dictionary.
    Analyze {
        /// Local corpus directories to transfer.
        #[structopt(long, short = "c")]
        corpus: Vec<PathBuf>,
        /// Local dictionary file to install.
        #[structopt(long, short = "d")]
        dictionary: Option<PathBuf>,
        /// Skip the cloud corpus fetch.
        #[structopt(long, short = "l")]
        local: bool,
        name: String,
    },
}

fn main() -> anyhow::Result<()> {
    let settings = Settings::from_args();

    let log_env = Env::new()
        .filter_or("FUZZCTL_LOG", "info")
        .default_write_style_or("auto");
    env_logger::Builder::from_env(log_env)
        .format_timestamp(Some(TimestampPrecision::Seconds))
        .init();

    let self_exe = std::env::current_exe().context("failed to locate own executable")?;
    let config = Config {
        device_addr: settings.device,
        ssh_key: settings.ssh_key,
        fuzzers_json: settings.fuzzers_json,
        package_manifest: settings.package_manifest,
        output_dir: settings.output,
        self_exe,
        ..Default::default()
    };
    let ctx = Context::from_config(config)?;

    match settings.cmd {
        Cmd::List { name } => command::list_fuzzers(name.as_deref(), &ctx),
        Cmd::Start {
            foreground,
            monitor,
            output,
            name,
        } => {
            let opts = StartOptions {
                foreground,
                monitor,
                output,
            };
            command::start_fuzzer(&opts, &name, &ctx)
        }
        Cmd::Check { name } => command::check_fuzzer(name.as_deref(), &ctx),
        Cmd::Stop { name } => command::stop_fuzzer(&name, &ctx),
        Cmd::Repro { name, units } => command::repro_units(&name, &units, &ctx),
        Cmd::Analyze {
            corpus,
            dictionary,
            local,
            name,
        } => command::analyze_fuzzer(&name, &corpus, dictionary.as_deref(), local, &ctx),
    }
}
