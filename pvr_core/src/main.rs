//! # PVR Lifecycle Simulator
//!
//! Runs one full driver residency against simulated collaborators:
//! module load, N client sessions, an unload attempt while sessions are held
//! (refused), session release, then module unload.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: one Rogue device, no faults
//! pvr_sim
//!
//! # Custom platform and faults, four sessions, JSON report
//! pvr_sim --config sim.toml --sessions 4 --report
//!
//! # Verbose JSON logs
//! pvr_sim -v --json
//! ```

use clap::Parser;
use pvr_common::config::LogLevel;
use pvr_common::consts::DEFAULT_CONFIG_PATH;
use pvr_common::device::FileHandle;
use pvr_core::host::HostDriver;
use pvr_core::simulation::{Call, SimConfig, SimPlatform};
use pvr_core::{LifecycleSnapshot, TeardownReport};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

/// PVR driver lifecycle simulator
#[derive(Parser, Debug)]
#[command(name = "pvr_sim")]
#[command(version)]
#[command(about = "Drive the PVR attach/detach lifecycle against simulated collaborators")]
#[command(long_about = None)]
struct Args {
    /// Path to driver + simulation configuration (TOML).
    /// Built-in defaults are used if the file does not exist.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Number of client sessions to open after load
    #[arg(short, long, default_value_t = 1)]
    sessions: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,

    /// Print a JSON lifecycle report on stdout
    #[arg(long)]
    report: bool,
}

#[derive(Serialize)]
struct Report {
    load_code: i32,
    after_load: LifecycleSnapshot,
    sessions_opened: u64,
    unload_refused_while_open: bool,
    teardown: Option<TeardownReport>,
    after_unload: LifecycleSnapshot,
    calls: Vec<Call>,
}

fn main() {
    if let Err(e) = run() {
        error!("pvr_sim failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let (config, defaulted) = SimConfig::load_or_default(&args.config).inspect_err(|e| {
        eprintln!("{}: {}", args.config.display(), e);
    })?;

    setup_tracing(&args, config.driver.shared.log_level);
    if defaulted {
        warn!(
            "{} not found, using built-in defaults",
            args.config.display()
        );
    }
    config.validate()?;

    info!(
        "pvr_sim '{}': {} simulated device(s)",
        config.driver.shared.service_name,
        config.simulation.devices.len()
    );

    let platform = SimPlatform::from_section(&config.simulation);
    let host = HostDriver::new(&config.driver, platform.collaborators())?;

    let load_code = host.module_load();
    if load_code != 0 {
        error!("module load failed with {}", load_code);
    }
    let after_load = host.snapshot();

    let mut opened = Vec::new();
    if load_code == 0 {
        for i in 0..args.sessions {
            let file = FileHandle(i + 1);
            match host.open(file) {
                0 => opened.push(file),
                code => warn!("open {} failed with {}", file, code),
            }
        }
    }

    let unload_refused_while_open = !opened.is_empty() && host.module_unload().is_err();

    for file in &opened {
        host.release(*file);
    }

    let teardown = match host.module_unload() {
        Ok(report) => {
            for step in report.failures() {
                warn!("unload step {} failed: {:?}", step.step, step.status);
            }
            Some(report)
        }
        Err(e) => {
            error!("module unload refused: {}", e);
            None
        }
    };

    if args.report {
        let report = Report {
            load_code,
            after_load,
            sessions_opened: opened.len() as u64,
            unload_refused_while_open,
            teardown,
            after_unload: host.snapshot(),
            calls: platform.journal.calls(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if load_code != 0 {
        return Err(format!("module load returned {}", load_code).into());
    }
    Ok(())
}

fn setup_tracing(args: &Args, configured: LogLevel) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        configured.as_str().parse().unwrap_or(Level::INFO)
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}
