//! tickbridge: run test suites inside the main loop of a single-threaded host.
//!
//! `prepare-and-launch` readies a working directory and relaunches this binary
//! in it with `run`, which boots the demo host loop and drives the bundled
//! suites through the bridge.

mod demo;

use std::env;
use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use tickbridge_config::{TickbridgeConfig, resolve_source};
use tickbridge_core::discover_suites;
use tickbridge_runner::{
    LaunchError, LoggingListener, ProcessLauncher, SuiteRunner, bridge_options, prepare,
};
use tickbridge_types::RunSummary;

use crate::demo::DemoWorld;

const LOG_FILE: &str = "tickbridge.log";

/// Exit code for harness failures: boot, host loop panic, shutdown timeout,
/// bad configuration.
const EXIT_HARNESS_FAILURE: u8 = 2;

/// Exit code for a clean run with failing tests, when `fail_on_test_failure` is set.
const EXIT_TEST_FAILURE: u8 = 1;

#[derive(Parser, Debug)]
#[command(name = "tickbridge", version)]
#[command(about = "Run test suites inside the main loop of a single-threaded host", long_about = None)]
struct Cli {
    /// Config file (defaults: $TICKBRIDGE_CONFIG, ./tickbridge.toml, ~/.tickbridge/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Prepare the test directory and run the harness inside it
    PrepareAndLaunch {
        /// Arguments forwarded to the launched harness
        #[arg(last = true, value_name = "ARGS")]
        extra: Vec<OsString>,
    },
    /// Boot the demo host loop and run every marked suite on it
    Run {
        /// Arguments handed to the host when it is built
        #[arg(last = true, value_name = "ARGS")]
        host_args: Vec<OsString>,
    },
    /// List registered suites and whether they run on the host loop
    List,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match TickbridgeConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("tickbridge: {e}");
            return ExitCode::from(EXIT_HARNESS_FAILURE);
        }
    };
    init_tracing(config.run.log_to_file());

    let result = match cli.command {
        Command::PrepareAndLaunch { extra } => {
            prepare_and_launch(&config, cli.config.as_deref(), extra)
        }
        Command::Run { host_args } => run(&config, &host_args),
        Command::List => list(&config),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("tickbridge: {e:#}");
            ExitCode::from(EXIT_HARNESS_FAILURE)
        }
    }
}

fn init_tracing(log_to_file: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let stderr = fmt::layer().with_writer(std::io::stderr);
    let (file_layer, warning) = if log_to_file {
        match open_log_file(Path::new(LOG_FILE)) {
            Ok(file) => (
                Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file))),
                None,
            ),
            Err(e) => (None, Some(format!("Failed to open {LOG_FILE}: {e}"))),
        }
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr)
        .with(file_layer)
        .init();

    if let Some(warning) = warning {
        tracing::warn!("{warning}");
    }
}

fn open_log_file(path: &Path) -> std::io::Result<fs::File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn prepare_and_launch(
    config: &TickbridgeConfig,
    explicit: Option<&Path>,
    extra: Vec<OsString>,
) -> Result<ExitCode> {
    let base = env::current_dir().context("reading the current directory")?;
    let prepared = prepare(&config.run, &base).context("preparing the test directory")?;

    let mut launcher = ProcessLauncher::current_exe(prepared.path())?;
    // The child runs in another directory; hand it the config we resolved.
    if let Some(source) = resolve_source(explicit) {
        launcher = launcher.arg("--config").arg(source);
    }

    let mut forwarded = Vec::with_capacity(extra.len() + 1);
    if !extra.is_empty() {
        forwarded.push(OsString::from("--"));
        forwarded.extend(extra);
    }

    match launcher.launch_and_wait(&forwarded) {
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(LaunchError::ChildFailed { code }) => {
            let code = code
                .and_then(|code| u8::try_from(code).ok())
                .unwrap_or(EXIT_HARNESS_FAILURE);
            Ok(ExitCode::from(code))
        }
        Err(e) => Err(e).context("launching the test process"),
    }
}

fn run(config: &TickbridgeConfig, host_args: &[OsString]) -> Result<ExitCode> {
    let args: Vec<String> = host_args
        .iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();

    let registry = demo::suites().context("registering demo suites")?;
    let mut runner = SuiteRunner::new(registry, bridge_options(config), move || {
        DemoWorld::boot(args)
    });
    let summary = runner
        .run(&mut LoggingListener)
        .context("test run aborted")?;

    println!("{summary}");
    Ok(ExitCode::from(summary_exit_code(
        &summary,
        config.run.fail_on_test_failure(),
    )))
}

/// Test failures only fail the process when the config asks for it.
fn summary_exit_code(summary: &RunSummary, fail_on_test_failure: bool) -> u8 {
    if !summary.all_passed() && fail_on_test_failure {
        EXIT_TEST_FAILURE
    } else {
        0
    }
}

fn list(config: &TickbridgeConfig) -> Result<ExitCode> {
    let registry = demo::suites().context("registering demo suites")?;
    let marker = config.discovery.marker();
    let selected = discover_suites(&registry, marker);

    for suite in registry.iter() {
        let on_loop = selected.iter().any(|s| s.id() == suite.id());
        let status = if on_loop { "host-loop" } else { "skipped" };
        println!(
            "{:<20} {:<10} marker={} cases={}",
            suite.id().as_str(),
            status,
            suite.marker(),
            suite.cases().len()
        );
    }
    Ok(ExitCode::SUCCESS)
}
