//! Operator signals and status stream
//!
//! A run is controlled through a [`ControlHandle`] held by the caller and a
//! [`ControlLink`] held by the running loop. Signals are only observed at
//! cycle boundaries; nothing interrupts a cycle half way.

use crate::control::roam::AvoidanceMode;
use crate::control::segment::SegmentPhase;
use crate::core::types::ContactSide;
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::time::Duration;

/// Status records buffered before the oldest are dropped
const STATUS_CAPACITY: usize = 64;

/// Operator command delivered to a running controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    /// End the run (roam) or abort it (segment)
    Stop,
    /// Continue after an obstacle pause
    Resume,
    /// Abandon the run and discard progress
    Reset,
}

/// Which controller produced a status record, and its state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerMode {
    Roam(AvoidanceMode),
    Segment(SegmentPhase),
}

/// Per-cycle snapshot for the display layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerStatus {
    pub mode: ControllerMode,
    /// Active segment (always 0 in roam mode)
    pub segment_index: usize,
    /// Accumulated distance of the current run or segment (cm)
    pub distance_cm: f32,
    /// Accumulated heading of the current run or segment (deg)
    pub heading_deg: f32,
    /// Segment mode speed setpoint (cm/s, 0 in roam mode)
    pub commanded_speed_cm_s: f32,
    /// Most recent contact side seen by the controller
    pub last_contact: Option<ContactSide>,
    /// Roam stuck counter (0 in segment mode)
    pub stuck_count: u32,
}

/// Create a connected handle/link pair
pub fn control_link() -> (ControlHandle, ControlLink) {
    let (signal_tx, signal_rx) = unbounded();
    let (status_tx, status_rx) = bounded(STATUS_CAPACITY);

    let handle = ControlHandle {
        signals: signal_tx,
        statuses: status_rx.clone(),
    };
    let link = ControlLink {
        signals: signal_rx,
        statuses: status_tx,
        overflow: status_rx,
    };
    (handle, link)
}

/// Caller side: send signals, read statuses
#[derive(Debug, Clone)]
pub struct ControlHandle {
    signals: Sender<ControlSignal>,
    statuses: Receiver<ControllerStatus>,
}

impl ControlHandle {
    /// Request the run to end
    pub fn stop(&self) {
        self.send(ControlSignal::Stop);
    }

    /// Continue after an obstacle pause
    pub fn resume(&self) {
        self.send(ControlSignal::Resume);
    }

    /// Abort and discard progress
    pub fn reset(&self) {
        self.send(ControlSignal::Reset);
    }

    fn send(&self, signal: ControlSignal) {
        // The loop may already have returned; that is not an error.
        if self.signals.send(signal).is_err() {
            log::debug!("ControlHandle: {:?} ignored, controller not running", signal);
        }
    }

    /// Drain buffered status records, oldest first
    pub fn statuses(&self) -> Vec<ControllerStatus> {
        self.statuses.try_iter().collect()
    }

    /// Most recent buffered status, discarding older ones
    pub fn latest_status(&self) -> Option<ControllerStatus> {
        self.statuses.try_iter().last()
    }
}

/// Loop side: poll signals, publish statuses
#[derive(Debug)]
pub struct ControlLink {
    signals: Receiver<ControlSignal>,
    statuses: Sender<ControllerStatus>,
    /// Used to evict the oldest record when the buffer is full
    overflow: Receiver<ControllerStatus>,
}

impl ControlLink {
    /// Non-blocking check for a pending signal
    pub fn poll(&self) -> Option<ControlSignal> {
        self.signals.try_recv().ok()
    }

    /// Block for up to `timeout` waiting for a signal
    ///
    /// Returns `None` if the timeout elapsed. If every handle has been dropped
    /// the full timeout is still observed.
    pub fn wait(&self, timeout: Duration) -> Option<ControlSignal> {
        match self.signals.recv_timeout(timeout) {
            Ok(signal) => Some(signal),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                std::thread::sleep(timeout);
                None
            }
        }
    }

    /// Publish a status record, dropping the oldest if the buffer is full
    pub fn publish(&self, status: ControllerStatus) {
        match self.statuses.try_send(status) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => {}
            Err(TrySendError::Full(status)) => {
                let _ = self.overflow.try_recv();
                let _ = self.statuses.try_send(status);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn status(distance_cm: f32) -> ControllerStatus {
        ControllerStatus {
            mode: ControllerMode::Roam(AvoidanceMode::Forward),
            segment_index: 0,
            distance_cm,
            heading_deg: 0.0,
            commanded_speed_cm_s: 0.0,
            last_contact: None,
            stuck_count: 0,
        }
    }

    #[test]
    fn test_signals_arrive_in_order() {
        let (handle, link) = control_link();
        assert_eq!(link.poll(), None);

        handle.resume();
        handle.stop();
        assert_eq!(link.poll(), Some(ControlSignal::Resume));
        assert_eq!(link.poll(), Some(ControlSignal::Stop));
        assert_eq!(link.poll(), None);
    }

    #[test]
    fn test_stop_after_link_dropped_is_silent() {
        let (handle, link) = control_link();
        drop(link);
        handle.stop();
        handle.stop();
        handle.reset();
        assert!(handle.statuses().is_empty());
    }

    #[test]
    fn test_wait_returns_early_on_signal() {
        let (handle, link) = control_link();
        handle.reset();

        let start = Instant::now();
        assert_eq!(link.wait(Duration::from_secs(5)), Some(ControlSignal::Reset));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_wait_times_out() {
        let (_handle, link) = control_link();
        assert_eq!(link.wait(Duration::from_millis(5)), None);
    }

    #[test]
    fn test_status_buffer_drops_oldest() {
        let (handle, link) = control_link();
        for i in 0..(STATUS_CAPACITY + 10) {
            link.publish(status(i as f32));
        }

        let statuses = handle.statuses();
        assert_eq!(statuses.len(), STATUS_CAPACITY);
        assert_eq!(statuses[0].distance_cm, 10.0);
        assert_eq!(
            statuses.last().map(|s| s.distance_cm),
            Some((STATUS_CAPACITY + 9) as f32)
        );
    }
}
