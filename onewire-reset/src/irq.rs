//! Foreground half of the interrupt-driven reset.
//!
//! [ResetMachine] arms a [TransitionCell] and its timer; the timer interrupt calls
//! [`TransitionCell::on_timer_interrupt`] with its own timer and pin handles. The
//! sequence is:
//!
//! 1. Foreground drives the line low, installs a [Reset](crate::Phase::Reset)
//!    descriptor and starts the timer with the reset low time.
//! 2. First expiry: the interrupt releases the line and reloads the timer with the
//!    release-to-sample delay.
//! 3. Second expiry: the phase becomes [Done](crate::Phase::Done) and the timer stops.
//! 4. Foreground samples the line and re-arms a [SingleStep](crate::Phase::SingleStep)
//!    for the rest of the presence window, net of the sampling cost.
//! 5. Third expiry: [Done](crate::Phase::Done) again, the cycle is over. When
//!    nothing of the window is left after sampling, this step is skipped.
//!
//! If the interrupt cannot drive the line it stops the timer and leaves the phase
//! at [Fault](crate::Phase::Fault); the foreground then releases the line itself
//! and reports [InterruptFault](crate::ResetError::InterruptFault). Arming or
//! sampling while a sequence runs is refused with [Busy](crate::ResetError::Busy).
//!
//! The blocking [reset](crate::BusReset::reset) waits for completion by polling the
//! phase through an [Idle] strategy, [BusyPoll] unless configured otherwise: the
//! caller stays awake, unlike the [DelayEngine](crate::DelayEngine) which sleeps.
//! Hosted callers can await [`TransitionCell::wait_done`] through
//! [BusResetAsync] instead.
//!
//! There is no way to abort a sequence once armed.

use crate::{
    BusPin, BusReset, BusResetAsync, BusyPoll, Direction, Idle, Level, LineDriver, PeriodicTimer,
    Phase, ResetError, ResetResult, ResetTiming, Transition, TransitionCell,
};

/// Interrupt-driven reset/presence-detect sequencer.
pub struct ResetMachine<'a, P, T, I = BusyPoll> {
    line: LineDriver<P>,
    timer: T,
    idle: I,
    cell: &'a TransitionCell,
    timing: ResetTiming,
}

impl<'a, P: BusPin, T: PeriodicTimer> ResetMachine<'a, P, T> {
    /// Creates a machine with [mid-window](ResetTiming::MID_WINDOW) timing that
    /// busy-polls for completion. Releases the line and enables the timer interrupt.
    pub fn new(pin: P, mut timer: T, cell: &'a TransitionCell) -> ResetResult<Self, P::Error> {
        let line = LineDriver::new(pin)?;
        timer.stop();
        timer.clear_pending_interrupt_flag();
        timer.enable_interrupt();
        Ok(Self {
            line,
            timer,
            idle: BusyPoll,
            cell,
            timing: ResetTiming::MID_WINDOW,
        })
    }
}

impl<'a, P: BusPin, T: PeriodicTimer, I: Idle> ResetMachine<'a, P, T, I> {
    /// Replace the strategy used while polling for completion.
    pub fn with_idle<J: Idle>(self, idle: J) -> ResetMachine<'a, P, T, J> {
        ResetMachine {
            line: self.line,
            timer: self.timer,
            idle,
            cell: self.cell,
            timing: self.timing,
        }
    }

    /// Set the reset timing.
    pub fn with_timing(mut self, timing: ResetTiming) -> Self {
        self.timing = timing;
        self
    }

    /// The descriptor shared with the interrupt.
    pub fn cell(&self) -> &'a TransitionCell {
        self.cell
    }

    /// Returns the pin, the timer and the idle strategy.
    pub fn into_inner(self) -> (P, T, I) {
        (self.line.into_inner(), self.timer, self.idle)
    }

    /// Start a reset pulse. Returns as soon as the line is low and the timer runs.
    ///
    /// The phase reaches [Done](crate::Phase::Done) once the line has been released
    /// and the release-to-sample delay has elapsed. Fails with
    /// [Busy](ResetError::Busy) while a sequence is still running.
    pub fn arm_reset(&mut self) -> ResetResult<(), P::Error> {
        if !self.cell.is_settled() {
            return Err(ResetError::Busy);
        }
        self.line.drive(Level::Low)?;
        self.cell
            .begin(Transition::reset(self.timing.sample_delay_us, Level::High));
        self.start_timer(self.timing.reset_low_us);
        log::trace!("reset armed: {} us low", self.timing.reset_low_us);
        Ok(())
    }

    /// Sample the presence response and arm the rest of the presence window.
    ///
    /// Call once the phase armed by [arm_reset](ResetMachine::arm_reset) is done;
    /// before that it fails with [Busy](ResetError::Busy).
    pub fn sample_and_rearm(&mut self) -> ResetResult<bool, P::Error> {
        self.settled()?;
        // the interrupt released the line through its own pin handle
        self.line.assume_driven(Level::High);
        self.line.set_direction(Direction::Input)?;
        let sampled = self.line.sample();
        self.line.set_direction(Direction::Output)?;
        let presence = sampled? == Level::Low;

        let recovery_us = self.timing.recovery_us();
        if recovery_us > 0 {
            self.cell.begin(Transition::single_step(0));
            self.start_timer(recovery_us);
        }
        Ok(presence)
    }

    /// Whether the current phase is [Done](crate::Phase::Done).
    pub fn is_done(&self) -> bool {
        self.cell.is_done()
    }

    /// Poll the phase until the sequence is [Done](crate::Phase::Done), or fail
    /// with [InterruptFault](ResetError::InterruptFault) if it was abandoned.
    pub fn poll_done(&mut self) -> ResetResult<(), P::Error> {
        while !self.cell.is_settled() {
            self.idle.idle();
        }
        self.settled()
    }

    fn settled(&mut self) -> ResetResult<(), P::Error> {
        match self.cell.phase() {
            Phase::Done => Ok(()),
            Phase::Fault => {
                log::warn!("reset abandoned by the timer interrupt, releasing the line");
                self.line.drive(Level::High)?;
                Err(ResetError::InterruptFault)
            }
            _ => Err(ResetError::Busy),
        }
    }

    fn start_timer(&mut self, period_us: u32) {
        self.timer.clear_pending_interrupt_flag();
        self.timer.reload(period_us);
        self.timer.start();
    }
}

impl<P: BusPin, T: PeriodicTimer, I: Idle> BusReset for ResetMachine<'_, P, T, I> {
    type Error = P::Error;

    fn reset(&mut self) -> ResetResult<bool, Self::Error> {
        self.arm_reset()?;
        self.poll_done()?;
        let presence = self.sample_and_rearm()?;
        self.poll_done()?;
        if !presence {
            log::debug!("reset: no presence pulse");
        }
        Ok(presence)
    }
}

impl<P: BusPin, T: PeriodicTimer, I: Idle> BusResetAsync for ResetMachine<'_, P, T, I> {
    type Error = P::Error;

    async fn reset(&mut self) -> ResetResult<bool, Self::Error> {
        self.arm_reset()?;
        self.cell.wait_done().await;
        let presence = self.sample_and_rearm()?;
        self.cell.wait_done().await;
        self.settled()?;
        Ok(presence)
    }
}
