use crate::{BusPin, BusResetAsync, Direction, Level, LineDriver, ResetResult, ResetTiming};
use embedded_hal_async::delay::DelayNs;

/// Async reset/presence-detect sequencer.
///
/// Same sequence as [ResetSequencer](crate::ResetSequencer), with the waits
/// delegated to an async [`DelayNs`](embedded_hal_async::delay::DelayNs).
pub struct ResetSequencerAsync<P, D> {
    line: LineDriver<P>,
    delay: D,
    timing: ResetTiming,
}

impl<P: BusPin, D: DelayNs> ResetSequencerAsync<P, D> {
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

    /// Returns the pin and the delay provider.
    pub fn into_inner(self) -> (P, D) {
        (self.line.into_inner(), self.delay)
    }
}

impl<P: BusPin, D: DelayNs> BusResetAsync for ResetSequencerAsync<P, D> {
    type Error = P::Error;

    async fn reset(&mut self) -> ResetResult<bool, Self::Error> {
        let timing = self.timing;
        self.line.drive(Level::Low)?;
        self.delay.delay_us(timing.reset_low_us).await;

        self.line.drive(Level::High)?;
        self.delay.delay_us(timing.sample_delay_us).await;

        self.line.set_direction(Direction::Input)?;
        let sampled = self.line.sample();
        self.line.set_direction(Direction::Output)?;
        let presence = sampled? == Level::Low;

        self.delay.delay_us(timing.recovery_us()).await;
        Ok(presence)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::testing::RecordingDelay;
    use embassy_futures::block_on;
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction as PinTransaction};
    use std::vec;

    #[test]
    fn reset_detects_presence() {
        let expectations = [
            PinTransaction::set(State::High),
            PinTransaction::set(State::Low),
            PinTransaction::set(State::High),
            PinTransaction::get(State::Low),
            PinTransaction::set(State::High),
        ];
        let mut pin = PinMock::new(&expectations);
        let mut seq = ResetSequencerAsync::new(pin.clone(), RecordingDelay::default()).unwrap();
        assert!(block_on(seq.reset()).unwrap());
        let (_, delay) = seq.into_inner();
        assert_eq!(delay.waits_us, vec![480, 60, 119]);
        pin.done();
    }

    #[test]
    fn mid_window_timing() {
        let expectations = [
            PinTransaction::set(State::High),
            PinTransaction::set(State::Low),
            PinTransaction::set(State::High),
            PinTransaction::get(State::High),
            PinTransaction::set(State::High),
        ];
        let mut pin = PinMock::new(&expectations);
        let mut seq = ResetSequencerAsync::new(pin.clone(), RecordingDelay::default())
            .unwrap()
            .with_timing(ResetTiming::MID_WINDOW);
        assert!(!block_on(seq.reset()).unwrap());
        let (_, delay) = seq.into_inner();
        assert_eq!(delay.waits_us, vec![480, 120, 119]);
        pin.done();
    }
}
