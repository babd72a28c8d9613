use crate::ResetResult;
use embedded_hal::digital::{InputPin, OutputPin, PinState};

/// Logic level of the bus line.
///
/// When writing this is the state requested of the line driver; when sampling it
/// is the state observed on the pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Released, pulled up by the bus resistor.
    High,
    /// Actively driven low.
    Low,
}

impl From<Level> for PinState {
    fn from(level: Level) -> Self {
        match level {
            Level::High => PinState::High,
            Level::Low => PinState::Low,
        }
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high { Level::High } else { Level::Low }
    }
}

/// Pin direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// The pin drives the output data register onto the line.
    Output,
    /// The pin only reads the line.
    Input,
}

/// Electrical mode of the pin while it is an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Can only pull the line low; high means high impedance.
    OpenDrain,
    /// Drives both levels.
    PushPull,
}

/// A GPIO pin wired to the bus, able to change direction at runtime.
pub trait BusPin: InputPin + OutputPin {
    /// Reconfigure the pin direction and output mode.
    ///
    /// Must leave the output data register untouched.
    fn configure(&mut self, direction: Direction, mode: OutputMode) -> Result<(), Self::Error>;
}

/// A periodic hardware timer counting in microseconds.
///
/// Implementations are handles onto one hardware timer. The interrupt handler
/// and the foreground code may each hold their own handle.
pub trait PeriodicTimer {
    /// Longest period a single reload can express.
    const MAX_PERIOD_US: u32;

    /// Enable or suppress the update (period rollover) event.
    fn set_update_events(&mut self, enabled: bool);

    /// Write the period register. The update event fires `period_us` after the
    /// counter last restarted from zero.
    fn write_period(&mut self, period_us: u32);

    /// Restart the counter from zero.
    fn reset_counter(&mut self);

    /// Start counting.
    fn start(&mut self);

    /// Stop counting. No update events fire while stopped.
    fn stop(&mut self);

    /// Let update events raise the timer interrupt.
    fn enable_interrupt(&mut self);

    /// Acknowledge a pending update interrupt.
    fn clear_pending_interrupt_flag(&mut self);

    /// Whether an update interrupt is pending.
    fn is_interrupt_pending(&self) -> bool;

    /// Reprogram the period and start a fresh one.
    ///
    /// The update event is suppressed while the period register is rewritten, so
    /// the leftover count of the previous period cannot fire an immediate update.
    fn reload(&mut self, period_us: u32) {
        self.reset_counter();
        self.set_update_events(false);
        self.write_period(period_us);
        self.set_update_events(true);
    }
}

/// What the foreground does while it waits for an interrupt.
///
/// An implementation may return for any reason. Callers always re-check the
/// condition they are waiting on.
pub trait Idle {
    /// Wait for the next event.
    fn idle(&mut self);
}

/// Spin without suspending the processor.
#[derive(Debug, Default, Clone, Copy)]
pub struct BusyPoll;

impl Idle for BusyPoll {
    #[inline(always)]
    fn idle(&mut self) {
        core::hint::spin_loop();
    }
}

/// Suspend the core until the next interrupt (`wfi`).
#[cfg(feature = "cortex-m")]
#[derive(Debug, Default, Clone, Copy)]
pub struct Wfi;

#[cfg(feature = "cortex-m")]
impl Idle for Wfi {
    #[inline(always)]
    fn idle(&mut self) {
        cortex_m::asm::wfi();
    }
}

/// Trait for the 1-Wire reset primitive.
pub trait BusReset {
    /// The error type of the underlying pin.
    type Error;

    /// Resets the 1-Wire bus.
    ///
    /// # Returns
    /// `true` if a slave answered with a presence pulse, `false` if the line stayed
    /// high. Retrying is up to the caller.
    ///
    /// # Errors
    /// This method returns an error if the pin fails.
    fn reset(&mut self) -> ResetResult<bool, Self::Error>;
}
