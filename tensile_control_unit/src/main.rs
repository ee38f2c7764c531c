//! # Tensile Tester Control Unit
//!
//! Runs the control cycle against the simulated rig. Commands are read
//! line by line from stdin, responses are written to stdout, logs go to
//! stderr.
//!
//! Operator console lines prefixed with `!` act on the rig itself:
//! `!ESTOP` / `!RELEASE` press and release the emergency button,
//! `!SPECIMEN` mounts a fresh specimen, `!WHERE` logs the crosshead.

use clap::Parser;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tensile_common::config::LogLevel;
use tensile_common::consts::DEFAULT_CONFIG_PATH;
use tensile_common::hal::driver::ForceSensor;
use tensile_common::tester::config::RigConfig;
use tensile_control_unit::config::load_config_or_default;
use tensile_control_unit::console::{ConsoleSource, spawn_reader};
use tensile_control_unit::cycle::CycleRunner;
use tensile_control_unit::protocol::LineWriter;
use tensile_hal::SimulatedRig;
use tensile_hal::drivers::simulation::{Crosshead, EmergencyHandle, SpecimenModel};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Tensile tester control unit on a simulated rig
#[derive(Parser, Debug)]
#[command(name = "tensile_control_unit")]
#[command(version)]
#[command(about = "Motion control and test orchestration for a tensile tester")]
struct Args {
    /// Rig configuration TOML. Defaults apply when the default file is absent.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the cycle period [µs].
    #[arg(long)]
    tick_us: Option<u64>,

    /// Skip the power-on tare.
    #[arg(long)]
    no_tare: bool,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    dump_config: bool,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();

    // Config before tracing: it carries the log level.
    let cfg = match effective_config(&args) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("FATAL: {e}");
            process::exit(1);
        }
    };
    setup_tracing(&args, cfg.shared.log_level);

    info!("Tensile control unit v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args, cfg) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Tensile control unit shutdown complete");
}

/// Configuration file (or defaults) with command line overrides applied.
fn effective_config(args: &Args) -> Result<RigConfig, Box<dyn std::error::Error>> {
    let (path, required) = match &args.config {
        Some(path) => (path.clone(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
    };
    let mut cfg = load_config_or_default(&path, required)?;
    if let Some(tick_us) = args.tick_us {
        cfg.cycle.tick_us = tick_us;
        cfg.validate()?;
    }
    Ok(cfg)
}

fn run(args: &Args, cfg: RigConfig) -> Result<(), Box<dyn std::error::Error>> {
    if args.dump_config {
        print!("{}", toml::to_string_pretty(&cfg)?);
        return Ok(());
    }

    info!(
        "Config OK: service={}, tick={}µs, {:.0} steps/mm, capacity {:.0} N",
        cfg.shared.service_name,
        cfg.cycle.tick_us,
        cfg.motion.steps_per_mm(),
        cfg.load_cell.capacity_n
    );

    let mut rig = SimulatedRig::new(&cfg.motion, &cfg.load_cell, &cfg.simulation)?;
    if !args.no_tare {
        rig.load_cell.tare(cfg.load_cell.tare_samples);
        info!("Power-on tare done");
    }

    let console = RigControls {
        emergency: rig.emergency.handle(),
        specimen: Arc::clone(&rig.specimen),
        crosshead: Arc::clone(&rig.crosshead),
    };

    let mut runner = CycleRunner::new(&cfg, rig.actuator, rig.load_cell, rig.emergency, rig.indicators)?;
    info!("CycleRunner initialized, state {}", runner.orchestrator().state());

    // Setup signal handler for graceful shutdown.
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    let (rx, _reader) = spawn_reader(std::io::stdin())?;
    let mut source = ConsoleSource::new(rx, move |line: &str| console.execute(line));
    let mut sink = LineWriter::new(std::io::stdout());

    runner.run(&mut source, &mut sink, &running)?;
    info!("{} response lines written", sink.lines());
    Ok(())
}

/// Operator access to the simulated rig.
struct RigControls {
    emergency: EmergencyHandle,
    specimen: Arc<SpecimenModel>,
    crosshead: Arc<Crosshead>,
}

impl RigControls {
    fn execute(&self, line: &str) {
        let verb = line.split_whitespace().next().unwrap_or_default();
        match verb.to_ascii_uppercase().as_str() {
            "ESTOP" => self.emergency.press(),
            "RELEASE" => self.emergency.release(),
            "SPECIMEN" => {
                self.specimen.replace();
                info!("Fresh specimen mounted");
            }
            "WHERE" => info!(
                "Crosshead at {:.3} mm, limits {:?}, specimen {}",
                self.crosshead.position_mm(),
                self.crosshead.limits(),
                if self.specimen.is_broken() { "broken" } else { "intact" }
            ),
            _ => warn!("Unknown rig console command: {line}"),
        }
    }
}

/// Setup tracing subscriber based on CLI arguments.
///
/// Logs go to stderr; stdout carries the response protocol.
fn setup_tracing(args: &Args, configured: LogLevel) {
    let level = if args.verbose {
        LogLevel::Debug
    } else {
        configured
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_directive()));

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
            .compact()
            .init();
    }
}
