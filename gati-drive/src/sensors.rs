//! Sensor snapshot polling
//!
//! One [`SensorPoller::poll`] call per control cycle reads the contact
//! switches and the reflectance array into a single [`SensorSnapshot`]. A
//! failed read is a transient: the affected half of the frame repeats the last
//! good sample, so the controllers see one no-change cycle and nothing else.

use crate::core::hardware::{ContactSensors, ReflectanceArray};
use crate::core::types::SensorSnapshot;
use crate::error::Result;

/// Produces one consistent sensor frame per cycle
#[derive(Debug, Default)]
pub struct SensorPoller {
    /// Last frame handed out
    last: SensorSnapshot,
    /// Reads that failed and were replaced by the previous sample
    transient_count: u64,
}

impl SensorPoller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure the reflectance array is calibrated before the first poll
    pub fn prepare<H: ReflectanceArray + ?Sized>(&mut self, hw: &mut H) -> Result<()> {
        if !hw.is_calibrated() {
            log::info!("SensorPoller: Calibrating reflectance array");
            hw.calibrate()?;
        }
        Ok(())
    }

    /// Read both sensor groups into a snapshot
    pub fn poll<H: ContactSensors + ReflectanceArray + ?Sized>(
        &mut self,
        hw: &mut H,
    ) -> SensorSnapshot {
        let mut frame = self.last;

        match hw.read() {
            Ok(contacts) => {
                frame.bump_left = contacts.left;
                frame.bump_right = contacts.right;
            }
            Err(e) => {
                self.transient_count += 1;
                log::debug!("SensorPoller: {} (holding previous contact state)", e);
            }
        }

        match hw.read_calibrated() {
            Ok(values) => frame.line_sensors = values,
            Err(e) => {
                self.transient_count += 1;
                log::debug!("SensorPoller: {} (holding previous reflectance)", e);
            }
        }

        self.last = frame;
        frame
    }

    /// Most recent frame
    pub fn last(&self) -> SensorSnapshot {
        self.last
    }

    /// Number of transient read failures absorbed so far
    pub fn transient_count(&self) -> u64 {
        self.transient_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ContactReading, LINE_SENSOR_COUNT};
    use crate::error::Error;
    use std::collections::VecDeque;

    /// Scripted sensor source; `None` entries fail the read
    #[derive(Default)]
    struct Scripted {
        contacts: VecDeque<Option<ContactReading>>,
        lines: VecDeque<Option<[u16; LINE_SENSOR_COUNT]>>,
        calibrated: bool,
    }

    impl ContactSensors for Scripted {
        fn read(&mut self) -> Result<ContactReading> {
            self.contacts
                .pop_front()
                .flatten()
                .ok_or(Error::SensorRead("bump"))
        }
    }

    impl ReflectanceArray for Scripted {
        fn calibrate(&mut self) -> Result<()> {
            self.calibrated = true;
            Ok(())
        }

        fn is_calibrated(&self) -> bool {
            self.calibrated
        }

        fn read_calibrated(&mut self) -> Result<[u16; LINE_SENSOR_COUNT]> {
            self.lines
                .pop_front()
                .flatten()
                .ok_or(Error::SensorRead("line"))
        }
    }

    #[test]
    fn test_poll_reads_both_groups() {
        let mut hw = Scripted::default();
        hw.contacts.push_back(Some(ContactReading {
            left: true,
            right: false,
        }));
        hw.lines.push_back(Some([1, 2, 3, 4, 5]));

        let mut poller = SensorPoller::new();
        let frame = poller.poll(&mut hw);
        assert!(frame.bump_left);
        assert!(!frame.bump_right);
        assert_eq!(frame.line_sensors, [1, 2, 3, 4, 5]);
        assert_eq!(poller.transient_count(), 0);
    }

    #[test]
    fn test_transient_repeats_previous_sample() {
        let mut hw = Scripted::default();
        hw.contacts.push_back(Some(ContactReading {
            left: false,
            right: true,
        }));
        hw.lines.push_back(Some([700; LINE_SENSOR_COUNT]));
        hw.contacts.push_back(None);
        hw.lines.push_back(None);

        let mut poller = SensorPoller::new();
        let first = poller.poll(&mut hw);
        let second = poller.poll(&mut hw);

        assert_eq!(first, second);
        assert_eq!(poller.transient_count(), 2);
    }

    #[test]
    fn test_prepare_calibrates_once() {
        let mut hw = Scripted::default();
        let mut poller = SensorPoller::new();
        poller.prepare(&mut hw).unwrap();
        assert!(hw.is_calibrated());
        poller.prepare(&mut hw).unwrap();
        assert!(hw.is_calibrated());
    }
}
