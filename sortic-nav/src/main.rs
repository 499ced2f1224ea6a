//! SorticNav - Navigation simulator
//!
//! Runs one navigator against a mock drive and a local gateway arbiter,
//! from its configured start position to the target handover.
//!
//! Usage:
//!   sortic-nav                                  # defaults, or sortic.toml if present
//!   sortic-nav sortic.toml --target TransferHandover --line 3
//!   RUST_LOG=sortic_nav=debug sortic-nav        # phase-level logging

use clap::Parser;
use sortic_nav::arbiter::GatewayArbiter;
use sortic_nav::drive::{DrivePrimitive, MockDrive};
use sortic_nav::error::{NavError, Result};
use sortic_nav::{Config, Event, Navigator, NavigatorConfig, Sector, State};

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

const DEFAULT_CONFIG: &str = "sortic.toml";

/// Navigation simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    config: Option<PathBuf>,

    /// Target sector label, overrides [simulation] target_sector
    #[arg(long)]
    target: Option<String>,

    /// Target line, overrides [simulation] target_line
    #[arg(long)]
    line: Option<u32>,
}

fn main() -> Result<()> {
    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("sortic_nav=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    if let Some(target) = args.target {
        config.simulation.target_sector = target;
    }
    if let Some(line) = args.line {
        config.simulation.target_line = line;
    }

    info!("SorticNav v{}", env!("CARGO_PKG_VERSION"));
    run(&config)
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Config::load(path)
        }
        None if Path::new(DEFAULT_CONFIG).exists() => {
            info!("Loading configuration from {}", DEFAULT_CONFIG);
            Config::load(Path::new(DEFAULT_CONFIG))
        }
        None => {
            info!("Using default configuration");
            Ok(Config::default())
        }
    }
}

fn run(config: &Config) -> Result<()> {
    let (start_sector, start_line) = config.start_position()?;
    let (target_sector, target_line) = config.target_position()?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })
    .map_err(|e| NavError::Io(std::io::Error::other(e)))?;

    let drive = MockDrive::new();
    let mut arbiter = GatewayArbiter::new();
    let link = arbiter.connect(config.vehicle.id.clone());
    let mut nav = Navigator::new(NavigatorConfig::from(config), drive.clone()).with_link(link);

    nav.set_actual_position(start_sector, start_line)?;
    nav.set_target_position(target_sector, target_line)?;
    info!(
        "{}: {} line {} -> {} line {}",
        config.vehicle.id, start_sector, start_line, target_sector, target_line
    );

    nav.dispatch_event(Event::MoveToTargetPosition);
    report(&nav);

    let interval = config.tick_interval();
    let mut last_state = nav.current_state();
    let mut tick = 0;

    while running.load(Ordering::SeqCst) {
        if tick >= config.simulation.max_ticks {
            warn!("Gave up after {} ticks in {}", tick, nav.current_state());
            break;
        }
        if config.simulation.fault_at_tick == Some(tick) {
            warn!("Simulating drive fault at tick {}", tick);
            drive.fail_next();
        }

        arbiter.process_pending();
        if last_state == State::Error {
            // The simulated operator acknowledges every fault
            nav.inject_event(Event::Resume);
        }
        nav.run_step();
        tick += 1;

        let state = nav.current_state();
        if state != last_state {
            report(&nav);
            last_state = state;
        }
        if state == State::EndPoint {
            break;
        }

        std::thread::sleep(interval);
    }

    // Let the arbiter see the final release
    arbiter.process_pending();

    if nav.current_state() == State::EndPoint && is_at(&nav, target_sector, target_line) {
        info!("Arrived at {} line {} after {} ticks", target_sector, target_line, tick);
    } else {
        warn!(
            "Stopped in {} at {} line {}",
            nav.current_state(),
            nav.current_sector(),
            nav.current_line()
        );
    }
    info!("Drive commands issued: {}", drive.issued());
    Ok(())
}

fn is_at<D: DrivePrimitive>(nav: &Navigator<D>, sector: Sector, line: u32) -> bool {
    nav.current_sector() == sector && nav.current_line() == line
}

fn report<D: DrivePrimitive>(nav: &Navigator<D>) {
    match nav.status().to_json() {
        Ok(json) => info!("status {}", json),
        Err(e) => warn!("Failed to encode status: {}", e),
    }
}
