use crate::{BusPin, BusReset, Direction, Level, LineDriver, ResetResult, ResetTiming};
use embedded_hal::delay::DelayNs;

/// Straight-line reset/presence-detect sequencer.
///
/// Takes ownership of the bus pin (implementing [BusPin]) and a delay provider
/// implementing the [`DelayNs`](embedded_hal::delay::DelayNs) trait, usually a
/// [DelayEngine](crate::DelayEngine).
pub struct ResetSequencer<P, D> {
    line: LineDriver<P>,
    delay: D,
    timing: ResetTiming,
}

impl<P: BusPin, D: DelayNs> ResetSequencer<P, D> {
    /// Creates a sequencer with [standard](ResetTiming::STANDARD) timing. Releases
    /// the line.
    pub fn new(pin: P, delay: D) -> ResetResult<Self, P::Error> {
        Ok(Self {
            line: LineDriver::new(pin)?,
            delay,
            timing: ResetTiming::STANDARD,
        })
    }

    /// Set the reset timing.
    pub fn with_timing(mut self, timing: ResetTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Current reset timing.
    pub fn timing(&self) -> &ResetTiming {
        &self.timing
    }

    /// Returns the pin and the delay provider.
    pub fn into_inner(self) -> (P, D) {
        (self.line.into_inner(), self.delay)
    }
}

impl<P: BusPin, D: DelayNs> BusReset for ResetSequencer<P, D> {
    type Error = P::Error;

    fn reset(&mut self) -> ResetResult<bool, Self::Error> {
        let timing = self.timing;
        self.line.drive(Level::Low)?;
        self.delay.delay_us(timing.reset_low_us);

        self.line.drive(Level::High)?;
        self.delay.delay_us(timing.sample_delay_us);

        self.line.set_direction(Direction::Input)?;
        let sampled = self.line.sample();
        self.line.set_direction(Direction::Output)?;
        let presence = sampled? == Level::Low;

        // remainder of the window, net of the sampling cost
        self.delay.delay_us(timing.recovery_us());

        if presence {
            log::trace!("reset: presence pulse detected");
        } else {
            log::debug!("reset: no presence pulse");
        }
        Ok(presence)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::testing::RecordingDelay;
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction as PinTransaction};
    use std::vec;

    fn expectations(response: State) -> [PinTransaction; 5] {
        [
            PinTransaction::set(State::High), // released on construction
            PinTransaction::set(State::Low),
            PinTransaction::set(State::High),
            PinTransaction::get(response),
            PinTransaction::set(State::High), // back to output
        ]
    }

    #[test]
    fn reset_detects_presence() {
        let expectations = expectations(State::Low);
        let mut pin = PinMock::new(&expectations);
        let mut seq = ResetSequencer::new(pin.clone(), RecordingDelay::default()).unwrap();
        assert!(seq.reset().unwrap());
        let (_, delay) = seq.into_inner();
        assert_eq!(delay.waits_us, vec![480, 60, 119]);
        pin.done();
    }

    #[test]
    fn reset_no_presence() {
        let expectations = expectations(State::High);
        let mut pin = PinMock::new(&expectations);
        let mut seq = ResetSequencer::new(pin.clone(), RecordingDelay::default()).unwrap();
        assert!(!seq.reset().unwrap());
        pin.done();
    }

    #[test]
    fn custom_timing_changes_every_phase() {
        let expectations = expectations(State::Low);
        let mut pin = PinMock::new(&expectations);
        let timing = ResetTiming::STANDARD
            .with_reset_low_us(500)
            .with_sample_delay_us(70)
            .with_presence_window_us(240)
            .with_sample_cost_us(5);
        let mut seq = ResetSequencer::new(pin.clone(), RecordingDelay::default())
            .unwrap()
            .with_timing(timing);
        assert!(seq.reset().unwrap());
        let (_, delay) = seq.into_inner();
        assert_eq!(delay.waits_us, vec![500, 70, 165]);
        pin.done();
    }
}
