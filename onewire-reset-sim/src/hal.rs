use crate::{EventKind, SimBus};
use core::convert::Infallible;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use onewire_reset::{BusPin, Direction, Idle, Level, OutputMode, PeriodicTimer};

/// Handle onto the simulated master pin.
///
/// Every read of the line consumes the configured sample cost of simulated time.
#[derive(Clone)]
pub struct SimPin(pub(crate) SimBus);

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.drive(Level::Low);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.drive(Level::High);
        Ok(())
    }
}

impl InputPin for SimPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.0.sample() == Level::High)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(self.0.sample() == Level::Low)
    }
}

impl BusPin for SimPin {
    fn configure(&mut self, direction: Direction, _mode: OutputMode) -> Result<(), Self::Error> {
        self.0.set_direction(direction);
        Ok(())
    }
}

/// Handle onto the simulated timer, ticking at 1 µs.
#[derive(Clone)]
pub struct SimTimer(pub(crate) SimBus);

impl PeriodicTimer for SimTimer {
    const MAX_PERIOD_US: u32 = u16::MAX as u32;

    fn set_update_events(&mut self, enabled: bool) {
        self.0.set_update_events(enabled);
    }

    fn write_period(&mut self, period_us: u32) {
        self.0.write_period(period_us);
    }

    fn reset_counter(&mut self) {
        self.0.reset_counter();
    }

    fn start(&mut self) {
        self.0.set_running(true);
    }

    fn stop(&mut self) {
        self.0.set_running(false);
    }

    fn enable_interrupt(&mut self) {
        self.0.enable_interrupt();
    }

    fn clear_pending_interrupt_flag(&mut self) {
        self.0.clear_update_flag();
    }

    fn is_interrupt_pending(&self) -> bool {
        self.0.interrupt_pending()
    }
}

/// Idle strategy for the simulation: each wakeup lets time run to the next timer
/// update and, if the update interrupt is pending, runs the interrupt handler.
pub struct SimIdle<F> {
    bus: SimBus,
    isr: F,
    spurious_every: u32,
    wakeups: u32,
}

impl<F: FnMut()> SimIdle<F> {
    pub(crate) fn new(bus: SimBus, isr: F) -> Self {
        Self {
            bus,
            isr,
            spurious_every: 0,
            wakeups: 0,
        }
    }

    /// Make every `every`-th wakeup return without time passing. `0` disables.
    pub fn with_spurious_wakes(mut self, every: u32) -> Self {
        self.spurious_every = every;
        self
    }

    /// Number of wakeups so far.
    pub fn wakeups(&self) -> u32 {
        self.wakeups
    }
}

impl<F: FnMut()> Idle for SimIdle<F> {
    fn idle(&mut self) {
        self.wakeups += 1;
        if self.spurious_every > 0 && self.wakeups % self.spurious_every == 0 {
            self.bus.record(EventKind::SpuriousWake);
            return;
        }
        if self.bus.advance_to_next_update() {
            (self.isr)();
        }
    }
}
