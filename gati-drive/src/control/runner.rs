//! Synchronous control loops
//!
//! A run owns the hardware for its whole tenure: it reads the sensors and
//! encoders, steps one controller, and writes the wheels once per cycle, then
//! sleeps out the rest of the sample period. Operator signals are polled at
//! the top of every cycle. Every exit path, including errors, leaves the
//! wheels commanded to zero.

use crate::config::{Config, ControlParameters, RobotGeometry, RoamConfig, SegmentConfig};
use crate::control::roam::{AvoidanceMode, RoamController};
use crate::control::segment::{Circuit, SegmentController, SegmentPhase};
use crate::control::signals::{ControlLink, ControlSignal};
use crate::core::hardware::RobotHardware;
use crate::core::types::AccumulatedPose;
use crate::drive::DriveOutput;
use crate::error::Result;
use crate::odometry::OdometryIntegrator;
use crate::sensors::SensorPoller;
use std::time::{Duration, Instant};

/// Everything a roam run needs
#[derive(Debug, Clone)]
pub struct RoamSetup {
    pub geometry: RobotGeometry,
    pub params: ControlParameters,
    pub roam: RoamConfig,
    /// Cycle period (zero = no sleep)
    pub sample_period: Duration,
    /// Upper bound on cycles, `None` to run until stopped
    pub max_cycles: Option<u64>,
}

impl RoamSetup {
    pub fn from_config(config: &Config) -> Self {
        Self {
            geometry: config.robot,
            params: config.control,
            roam: config.roam.clone(),
            sample_period: config.roam.sample_period(),
            max_cycles: None,
        }
    }

    /// Reject settings a run could not finish with
    pub fn validate(&self) -> Result<()> {
        self.geometry.validate()?;
        self.params.validate(&self.geometry)?;
        self.roam.validate()
    }
}

/// Everything a segment run needs besides the circuit
#[derive(Debug, Clone)]
pub struct SegmentSetup {
    pub geometry: RobotGeometry,
    pub params: ControlParameters,
    pub segment: SegmentConfig,
    /// Cycle period (zero = no sleep)
    pub sample_period: Duration,
    /// Safety delay before the wheels move
    pub countdown: Duration,
    /// Upper bound on cycles; reaching it aborts the run
    pub max_cycles: Option<u64>,
}

impl SegmentSetup {
    pub fn from_config(config: &Config) -> Self {
        Self {
            geometry: config.robot,
            params: config.control,
            segment: config.segment.clone(),
            sample_period: config.segment.sample_period(),
            countdown: config.segment.countdown(),
            max_cycles: None,
        }
    }

    /// Reject settings a run could not finish with
    pub fn validate(&self) -> Result<()> {
        self.geometry.validate()?;
        self.params.validate(&self.geometry)?;
        self.segment.validate()
    }
}

/// Why a roam run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoamStopReason {
    /// Operator stop (or reset)
    Signal,
    /// `max_cycles` reached
    CycleLimit,
}

/// Summary of a finished roam run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoamOutcome {
    pub reason: RoamStopReason,
    pub cycles: u64,
    pub final_mode: AvoidanceMode,
    pub stuck_count: u32,
    /// Net odometry over the run
    pub pose: AccumulatedPose,
}

/// Result of a segment run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every segment finished
    Completed { segments: usize, cycles: u64 },
    /// Stopped, reset, or out of cycles; progress discarded
    Aborted { segment_index: usize, cycles: u64 },
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed { .. })
    }
}

/// Sleep out the remainder of a cycle
fn pace(cycle_start: Instant, period: Duration) {
    if period.is_zero() {
        return;
    }
    let elapsed = cycle_start.elapsed();
    if elapsed < period {
        std::thread::sleep(period - elapsed);
    }
}

/// Roam until stopped
pub fn run_roam<H: RobotHardware>(
    hw: &mut H,
    setup: &RoamSetup,
    link: &ControlLink,
) -> Result<RoamOutcome> {
    setup.validate()?;
    let mut drive = DriveOutput::new(setup.geometry.max_motor_units);
    let mut poller = SensorPoller::new();
    if let Err(e) = poller.prepare(hw) {
        drive.stop(hw);
        return Err(e);
    }

    let mut odometry = OdometryIntegrator::new(setup.geometry);
    let mut roam = RoamController::new(setup.params, setup.roam.clone());

    // Ticks from before this run belong to nobody
    hw.read_and_reset_deltas();

    log::info!(
        "Runner: Roam started (base speed {}, period {:?})",
        setup.params.base_speed,
        setup.sample_period
    );

    let mut cycles = 0u64;
    let reason = loop {
        match link.poll() {
            Some(ControlSignal::Stop) | Some(ControlSignal::Reset) => break RoamStopReason::Signal,
            Some(ControlSignal::Resume) => log::debug!("Runner: resume ignored while roaming"),
            None => {}
        }
        if setup.max_cycles.map_or(false, |max| cycles >= max) {
            break RoamStopReason::CycleLimit;
        }

        let cycle_start = Instant::now();
        let sensors = poller.poll(hw);
        let increment = odometry.update(hw.read_and_reset_deltas());
        let command = roam.step(&sensors, increment);
        drive.apply(hw, command);
        link.publish(roam.status());

        cycles += 1;
        pace(cycle_start, setup.sample_period);
    };

    drive.stop(hw);
    link.publish(roam.status());

    log::info!(
        "Runner: Roam ended ({:?}) after {} cycles, {:.1}cm, {} transient reads",
        reason,
        cycles,
        odometry.totals().total_distance_cm,
        poller.transient_count()
    );

    Ok(RoamOutcome {
        reason,
        cycles,
        final_mode: roam.mode(),
        stuck_count: roam.stuck_count(),
        pose: roam.pose(),
    })
}

/// Drive a circuit to completion or abort
pub fn run_circuit<H: RobotHardware>(
    hw: &mut H,
    setup: &SegmentSetup,
    circuit: &Circuit,
    link: &ControlLink,
) -> Result<RunOutcome> {
    setup.validate()?;
    let mut drive = DriveOutput::new(setup.geometry.max_motor_units);
    let mut poller = SensorPoller::new();
    if let Err(e) = poller.prepare(hw) {
        drive.stop(hw);
        return Err(e);
    }

    let mut odometry = OdometryIntegrator::new(setup.geometry);
    let mut controller =
        SegmentController::new(setup.params, setup.geometry, &setup.segment, circuit.clone());

    drive.stop(hw);
    link.publish(controller.status());
    countdown(&mut controller, setup.countdown, link);

    let mut cycles = 0u64;
    if !controller.state().is_terminal() {
        hw.read_and_reset_deltas();
        controller.finish_countdown();

        loop {
            while let Some(signal) = link.poll() {
                controller.handle_signal(signal);
            }
            if controller.state().is_terminal() {
                break;
            }
            if setup.max_cycles.map_or(false, |max| cycles >= max) {
                log::warn!("Runner: Cycle limit {} reached, aborting circuit", cycles);
                controller.stop();
                break;
            }

            let cycle_start = Instant::now();
            let sensors = poller.poll(hw);
            let increment = odometry.update(hw.read_and_reset_deltas());
            let command = controller.step(&sensors, increment);
            drive.apply(hw, command);
            link.publish(controller.status());

            cycles += 1;
            pace(cycle_start, setup.sample_period);
        }
    }

    drive.stop(hw);
    link.publish(controller.status());

    let outcome = match controller.phase() {
        SegmentPhase::Completed => RunOutcome::Completed {
            segments: circuit.len(),
            cycles,
        },
        _ => RunOutcome::Aborted {
            segment_index: controller.segment_index(),
            cycles,
        },
    };
    log::info!("Runner: Circuit finished: {:?}", outcome);
    Ok(outcome)
}

/// Drive one straight leg of `distance_cm`
pub fn run_distance<H: RobotHardware>(
    hw: &mut H,
    setup: &SegmentSetup,
    distance_cm: f32,
    link: &ControlLink,
) -> Result<RunOutcome> {
    let circuit = Circuit::single(distance_cm)?;
    run_circuit(hw, setup, &circuit, link)
}

/// Wait out the safety countdown; stop or reset cancels the run
fn countdown(controller: &mut SegmentController, duration: Duration, link: &ControlLink) {
    log::info!("Runner: Starting in {:.1}s", duration.as_secs_f32());

    let deadline = Instant::now() + duration;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let signal = if remaining.is_zero() {
            link.poll()
        } else {
            link.wait(remaining)
        };

        match signal {
            Some(ControlSignal::Stop) | Some(ControlSignal::Reset) => {
                controller.stop();
                return;
            }
            Some(ControlSignal::Resume) => continue,
            None if remaining.is_zero() || Instant::now() >= deadline => return,
            None => {}
        }
    }
}
