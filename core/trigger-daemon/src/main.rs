//! trigger-daemon: motion-triggered accelerometer recorder.
//!
//! Waits for significant motion, records a fixed window of accelerometer
//! samples into a per-run session directory, buzzes, and re-arms. A periodic
//! tick re-arms the motion watch in case a one-shot trigger was lost.
//!
//! ## Subcommands
//!
//! - `run`: Start a session and record until SIGINT/SIGTERM
//! - `check`: Verify config and sensor access without recording

mod config;
mod dispatch;
mod logging;
mod platform;

use chrono::Local;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info, warn};

use trigger_core::{Controller, Input, SessionDirectory, TriggerError};

use crate::dispatch::RunLimits;

#[derive(Parser)]
#[command(name = "trigger-daemon")]
#[command(about = "Motion-triggered accelerometer recorder")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a recording session (runs until interrupted)
    Run(RunArgs),

    /// Validate config and probe the accelerometer
    Check {
        /// Config file (default: ~/.trigger-sensor/daemon.toml)
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Probe the simulated sensors instead of hardware
        #[arg(long)]
        simulate: bool,

        /// Print the effective config as TOML
        #[arg(long)]
        print_config: bool,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Config file (default: ~/.trigger-sensor/daemon.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory that receives session folders (overrides `data_dir`)
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Use simulated motion and accelerometer
    #[arg(long)]
    simulate: bool,

    /// Stop after this many completed windows
    #[arg(long, value_name = "N")]
    max_windows: Option<u64>,
}

fn main() {
    let logging_guard = logging::init();
    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Run(args) => match run(args) {
            Ok(()) => 0,
            Err(err) => {
                error!(error = %err, "trigger-daemon run failed");
                1
            }
        },
        Commands::Check {
            config,
            simulate,
            print_config,
        } => match check(config, simulate, print_config) {
            Ok(()) => 0,
            Err(err) => {
                error!(error = %err, "trigger-daemon check failed");
                1
            }
        },
    };

    if code != 0 {
        // process::exit skips destructors; flush the file writer first.
        drop(logging_guard);
        std::process::exit(code);
    }
}

fn run(args: RunArgs) -> Result<(), String> {
    let mut config = config::load_config(args.config)?;
    if let Some(dir) = args.data_dir {
        config.data_dir = Some(dir);
    }

    let sessions_dir = config.sessions_dir()?;
    let status_path = config::status_path()?;

    let session = SessionDirectory::create(&sessions_dir, Local::now())?;
    info!(
        session = %session.name(),
        path = %session.path().display(),
        simulate = args.simulate,
        "Session created"
    );

    let (sink, rx) = dispatch::channel();
    let collaborators = platform::build_collaborators(
        &config,
        &sink,
        args.simulate,
        &status_path,
        session.name(),
    )?;
    let mut controller = Controller::start(
        session,
        collaborators,
        config.controller_settings(),
        dispatch::now_ms(),
    )?;

    let signal_sink = sink.clone();
    if let Err(err) = ctrlc::set_handler(move || {
        signal_sink.send(Input::Teardown);
    }) {
        warn!(error = %err, "Failed to install signal handler");
    }

    let _resume_watcher = match platform::timers::ResumeWatcher::spawn(sink.clone()) {
        Ok(watcher) => Some(watcher),
        Err(err) => {
            warn!(error = %err, "Resume watcher unavailable");
            None
        }
    };

    let summary = dispatch::run(
        &mut controller,
        rx,
        RunLimits {
            max_windows: args.max_windows,
        },
    );
    info!(
        session = %controller.session().name(),
        inputs = summary.inputs,
        windows = controller.windows_completed(),
        samples = controller.sample_count(),
        events = controller.events_logged(),
        io_errors = summary.io_errors,
        other_errors = summary.other_errors,
        "Session finished"
    );

    match summary.fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn check(
    config_path: Option<PathBuf>,
    simulate: bool,
    print_config: bool,
) -> Result<(), TriggerError> {
    let config = config::load_config(config_path)?;
    let report = platform::probe(&config, simulate)?;

    println!("accelerometer: {}", report.accelerometer);
    match report.first_reading {
        Some([x, y, z]) => println!("reading: x={:.3} y={:.3} z={:.3}", x, y, z),
        None if simulate => {}
        None => println!("reading: unavailable"),
    }
    println!(
        "window: {} ms at {} Hz, rearm every {} ms",
        config.window.duration_ms, config.window.sample_rate_hz, config.rearm.interval_ms
    );

    if print_config {
        let rendered =
            toml::to_string_pretty(&config).map_err(|err| TriggerError::ConfigMalformed {
                path: PathBuf::from("daemon.toml"),
                details: err.to_string(),
            })?;
        println!("{}", rendered);
    }
    Ok(())
}
