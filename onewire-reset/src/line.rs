use crate::{BusPin, Direction, Level, OutputMode, ResetError, ResetResult};

/// Open-drain driver for the bus line.
///
/// Keeps track of the level last requested, so a detour through input mode
/// leaves the line exactly as it was once it is an output again. No timing is
/// implied by any method; callers own settle delays.
pub struct LineDriver<P> {
    pin: P,
    direction: Direction,
    driven: Level,
}

impl<P: BusPin> LineDriver<P> {
    /// Takes the pin, configures it as an open-drain output and releases the line.
    pub fn new(mut pin: P) -> ResetResult<Self, P::Error> {
        pin.set_high().map_err(ResetError::Pin)?;
        pin.configure(Direction::Output, OutputMode::OpenDrain)
            .map_err(ResetError::Pin)?;
        Ok(Self {
            pin,
            direction: Direction::Output,
            driven: Level::High,
        })
    }

    /// Releases the pin.
    pub fn into_inner(self) -> P {
        self.pin
    }

    /// Drives the line to `level`.
    ///
    /// While the pin is an input the level is only recorded and takes effect when
    /// the pin is switched back to output.
    pub fn drive(&mut self, level: Level) -> ResetResult<(), P::Error> {
        self.driven = level;
        if self.direction == Direction::Output {
            self.pin.set_state(level.into()).map_err(ResetError::Pin)?;
        }
        Ok(())
    }

    /// Switches the pin between output and input.
    pub fn set_direction(&mut self, direction: Direction) -> ResetResult<(), P::Error> {
        if direction == self.direction {
            return Ok(());
        }
        if direction == Direction::Output {
            // restore the data register before the output stage comes back
            self.pin
                .set_state(self.driven.into())
                .map_err(ResetError::Pin)?;
        }
        self.pin
            .configure(direction, OutputMode::OpenDrain)
            .map_err(ResetError::Pin)?;
        self.direction = direction;
        Ok(())
    }

    /// Reads the instantaneous level of the line. The pin must be an input.
    pub fn sample(&mut self) -> ResetResult<Level, P::Error> {
        if self.direction != Direction::Input {
            return Err(ResetError::NotSampling);
        }
        let low = self.pin.is_low().map_err(ResetError::Pin)?;
        Ok(if low { Level::Low } else { Level::High })
    }

    /// Current pin direction.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Level the driver applies whenever the pin is an output.
    pub fn driven(&self) -> Level {
        self.driven
    }

    /// Record a level written to the pin behind the driver's back, e.g. by an
    /// interrupt handler holding its own pin handle.
    pub(crate) fn assume_driven(&mut self, level: Level) {
        self.driven = level;
    }
}
