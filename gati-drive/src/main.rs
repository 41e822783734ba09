//! GatiDrive - run a controller against the simulated robot
//!
//! ```text
//! gati-drive [--config <path>] [--cycles <n>] [roam | circuit | distance <cm>]
//! ```
//!
//! While a run is active, type on stdin:
//! - `r` + Enter: resume after an obstacle pause
//! - `x` + Enter: reset (abort and discard progress)
//! - `s` + Enter or Ctrl-C: stop

use gati_drive::config::Config;
use gati_drive::control::runner::RoamStopReason;
use gati_drive::control::{ControlHandle, ControllerStatus};
use gati_drive::sim::SimulatedRobot;
use gati_drive::{control_link, run_circuit, run_distance, run_roam, Error, Result};
use gati_drive::{RoamSetup, RunOutcome, SegmentSetup};
use std::env;
use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Which controller to run
#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Roam,
    Circuit,
    Distance(f32),
}

/// Parsed command line
#[derive(Debug)]
struct Args {
    config_path: String,
    max_cycles: Option<u64>,
    mode: Mode,
}

/// Parse command line arguments.
///
/// Supports:
/// - `--config <path>` / `-c <path>` (defaults to `gati.toml`)
/// - `--cycles <n>` to bound the run
/// - a positional mode: `roam` (default), `circuit`, or `distance <cm>`
fn parse_args() -> Result<Args> {
    let args: Vec<String> = env::args().skip(1).collect();
    let mut parsed = Args {
        config_path: "gati.toml".to_string(),
        max_cycles: None,
        mode: Mode::Roam,
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                parsed.config_path = value_after(&args, i)?.to_string();
                i += 1;
            }
            "--cycles" => {
                let raw = value_after(&args, i)?;
                parsed.max_cycles = Some(raw.parse().map_err(|_| {
                    Error::InvalidParameter(format!("--cycles expects a count, got {:?}", raw))
                })?);
                i += 1;
            }
            "roam" => parsed.mode = Mode::Roam,
            "circuit" => parsed.mode = Mode::Circuit,
            "distance" => {
                let raw = value_after(&args, i)?;
                parsed.mode = Mode::Distance(raw.parse().map_err(|_| {
                    Error::InvalidParameter(format!("distance expects centimetres, got {:?}", raw))
                })?);
                i += 1;
            }
            other => {
                return Err(Error::InvalidParameter(format!(
                    "unrecognised argument {:?}",
                    other
                )))
            }
        }
        i += 1;
    }
    Ok(parsed)
}

fn value_after(args: &[String], i: usize) -> Result<&str> {
    args.get(i + 1)
        .map(String::as_str)
        .ok_or_else(|| Error::InvalidParameter(format!("{} needs a value", args[i])))
}

/// Forward stdin commands to the running controller
fn spawn_console(handle: ControlHandle) -> Result<()> {
    thread::Builder::new()
        .name("console".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines().map_while(|l| l.ok()) {
                match line.trim() {
                    "r" => handle.resume(),
                    "x" => handle.reset(),
                    "s" => handle.stop(),
                    "" => {}
                    other => log::warn!("Console: unknown command {:?} (r/x/s)", other),
                }
            }
        })
        .map_err(|e| Error::Other(format!("Failed to spawn console thread: {}", e)))?;
    Ok(())
}

/// Log the newest status twice a second until the run ends
fn spawn_status_reporter(handle: ControlHandle, running: Arc<AtomicBool>) -> Result<()> {
    thread::Builder::new()
        .name("status".to_string())
        .spawn(move || {
            let mut last: Option<ControllerStatus> = None;
            while running.load(Ordering::Relaxed) {
                thread::sleep(Duration::from_millis(500));
                if let Some(status) = handle.latest_status() {
                    if last.map_or(true, |l| l.mode != status.mode || l.distance_cm != status.distance_cm) {
                        log::info!(
                            "Status: {:?} seg={} d={:.1}cm h={:.1}° v={:.1}cm/s stuck={}",
                            status.mode,
                            status.segment_index,
                            status.distance_cm,
                            status.heading_deg,
                            status.commanded_speed_cm_s,
                            status.stuck_count
                        );
                    }
                    last = Some(status);
                }
            }
        })
        .map_err(|e| Error::Other(format!("Failed to spawn status thread: {}", e)))?;
    Ok(())
}

fn main() -> Result<()> {
    let args = parse_args()?;
    let config = Config::load(&args.config_path)?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("GatiDrive v{} starting...", env!("CARGO_PKG_VERSION"));
    log::info!("Using config: {}", args.config_path);

    let mut robot = SimulatedRobot::new(config.robot, config.simulation.clone())?;
    let (handle, link) = control_link();

    let ctrlc_handle = handle.clone();
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        ctrlc_handle.stop();
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    let running = Arc::new(AtomicBool::new(true));
    spawn_console(handle.clone())?;
    spawn_status_reporter(handle.clone(), Arc::clone(&running))?;

    log::info!("Mode: {:?}. Press Ctrl-C to stop.", args.mode);

    match args.mode {
        Mode::Roam => {
            let setup = RoamSetup {
                max_cycles: args.max_cycles,
                ..RoamSetup::from_config(&config)
            };
            let outcome = run_roam(&mut robot, &setup, &link)?;
            let how = match outcome.reason {
                RoamStopReason::Signal => "stopped",
                RoamStopReason::CycleLimit => "cycle limit",
            };
            log::info!(
                "Roam {}: {} cycles, {:.1}cm, final {:?}, stuck={}",
                how,
                outcome.cycles,
                outcome.pose.total_distance_cm,
                outcome.final_mode,
                outcome.stuck_count
            );
        }
        Mode::Circuit | Mode::Distance(_) => {
            let setup = SegmentSetup {
                max_cycles: args.max_cycles,
                ..SegmentSetup::from_config(&config)
            };
            let outcome = match args.mode {
                Mode::Distance(cm) => run_distance(&mut robot, &setup, cm, &link)?,
                _ => run_circuit(&mut robot, &setup, &config.circuit.to_circuit()?, &link)?,
            };
            match outcome {
                RunOutcome::Completed { segments, cycles } => {
                    log::info!("Circuit completed: {} segments in {} cycles", segments, cycles)
                }
                RunOutcome::Aborted {
                    segment_index,
                    cycles,
                } => log::info!(
                    "Circuit aborted in segment {} after {} cycles",
                    segment_index,
                    cycles
                ),
            }
        }
    }

    running.store(false, Ordering::Relaxed);
    let pose = robot.pose();
    log::info!(
        "Simulated robot at ({:.1}, {:.1}) cm, {:.1}°, {:.1}s simulated, {} collisions",
        pose.x_cm,
        pose.y_cm,
        pose.heading_deg,
        robot.elapsed().as_secs_f32(),
        robot.collisions()
    );
    log::info!("GatiDrive stopped");
    Ok(())
}
