use crate::{Level, PeriodicTimer};
use core::future::poll_fn;
use core::task::Poll;
use embassy_sync::waitqueue::AtomicWaker;
use embedded_hal::digital::OutputPin;
use portable_atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Phase of an interrupt-driven bus sequence.
pub enum Phase {
    /// The line is held low for the reset pulse.
    Reset = 0,
    /// Reserved for the write-zero time slot. Never entered by the reset sequence.
    WriteZero,
    /// Reserved for the write-one time slot. Never entered by the reset sequence.
    WriteOne,
    /// Reserved for the read time slot. Never entered by the reset sequence.
    Read,
    /// A one-shot wait; completes the sequence unless another delay is queued.
    SingleStep,
    /// Terminal. Further timer expiries are ignored.
    Done,
    /// Terminal. The interrupt failed to drive the line, stopped the timer and
    /// abandoned the sequence.
    Fault,
}

impl Phase {
    const fn from_bits(bits: u8) -> Self {
        match bits {
            0 => Phase::Reset,
            1 => Phase::WriteZero,
            2 => Phase::WriteOne,
            3 => Phase::Read,
            4 => Phase::SingleStep,
            6 => Phase::Fault,
            _ => Phase::Done,
        }
    }
}

/// What the timer interrupt does next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Current phase.
    pub phase: Phase,
    /// Period of the phase following this one; zero ends the sequence.
    pub next_delay_us: u32,
    /// Level the line is released to when the reset phase expires.
    pub next_level: Level,
}

/// Side effects of one timer expiry, to be applied by the interrupt glue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Effects {
    /// Drive the line to this level.
    pub drive: Option<Level>,
    /// Reprogram the timer with this period.
    pub reload_us: Option<u32>,
    /// Stop the timer.
    pub stop_timer: bool,
}

impl Effects {
    /// Whether applying these effects touches neither the line nor the timer.
    pub fn is_empty(&self) -> bool {
        self.drive.is_none() && self.reload_us.is_none() && !self.stop_timer
    }

    /// Apply the effects: the line first, then the timer.
    pub fn apply<T: PeriodicTimer, P: OutputPin>(
        &self,
        timer: &mut T,
        pin: &mut P,
    ) -> Result<(), P::Error> {
        if let Some(level) = self.drive {
            pin.set_state(level.into())?;
        }
        if let Some(period) = self.reload_us {
            timer.reload(period);
        }
        if self.stop_timer {
            timer.stop();
        }
        Ok(())
    }
}

impl Transition {
    /// Descriptor for a reset pulse, releasing the line to `next_level` and then
    /// waiting `next_delay_us` before completing.
    pub const fn reset(next_delay_us: u32, next_level: Level) -> Self {
        Self {
            phase: Phase::Reset,
            next_delay_us,
            next_level,
        }
    }

    /// Descriptor for a plain one-shot wait.
    pub const fn single_step(next_delay_us: u32) -> Self {
        Self {
            phase: Phase::SingleStep,
            next_delay_us,
            next_level: Level::High,
        }
    }

    /// The terminal descriptor.
    pub const fn done() -> Self {
        Self {
            phase: Phase::Done,
            next_delay_us: 0,
            next_level: Level::High,
        }
    }

    /// Advance by one timer expiry.
    ///
    /// Pure: returns the next descriptor and the effects the interrupt must apply.
    pub fn advance(self) -> (Self, Effects) {
        match self.phase {
            Phase::Reset => {
                let mut effects = Effects {
                    drive: Some(self.next_level),
                    ..Effects::default()
                };
                let next = if self.next_delay_us > 0 {
                    effects.reload_us = Some(self.next_delay_us);
                    Self {
                        phase: Phase::SingleStep,
                        next_delay_us: 0,
                        ..self
                    }
                } else {
                    effects.stop_timer = true;
                    Self {
                        phase: Phase::Done,
                        ..self
                    }
                };
                (next, effects)
            }
            Phase::SingleStep if self.next_delay_us == 0 => (
                Self {
                    phase: Phase::Done,
                    ..self
                },
                Effects {
                    stop_timer: true,
                    ..Effects::default()
                },
            ),
            Phase::SingleStep => (
                Self {
                    next_delay_us: 0,
                    ..self
                },
                Effects {
                    reload_us: Some(self.next_delay_us),
                    ..Effects::default()
                },
            ),
            // reserved and terminal phases are inert
            Phase::WriteZero | Phase::WriteOne | Phase::Read | Phase::Done | Phase::Fault => {
                (self, Effects::default())
            }
        }
    }
}

/// The [Transition] descriptor of one bus line, shared between the foreground and
/// the timer interrupt.
///
/// The foreground [begin](TransitionCell::begin)s a sequence before starting the
/// timer and afterwards only reads the phase. While the timer runs the interrupt
/// is the only writer.
pub struct TransitionCell {
    phase: AtomicU8,
    next_delay_us: AtomicU32,
    next_level: AtomicBool,
    waker: AtomicWaker,
}

impl TransitionCell {
    /// An inert cell (phase [Done](Phase::Done)), usable in a `static`.
    pub const fn new() -> Self {
        Self {
            phase: AtomicU8::new(Phase::Done as u8),
            next_delay_us: AtomicU32::new(0),
            next_level: AtomicBool::new(true),
            waker: AtomicWaker::new(),
        }
    }

    /// Install a new descriptor. Must happen before the timer interrupt is enabled.
    pub fn begin(&self, transition: Transition) {
        self.store(transition);
    }

    /// Snapshot of the descriptor.
    pub fn load(&self) -> Transition {
        let phase = Phase::from_bits(self.phase.load(Ordering::Acquire));
        Transition {
            phase,
            next_delay_us: self.next_delay_us.load(Ordering::Relaxed),
            next_level: self.next_level.load(Ordering::Relaxed).into(),
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        Phase::from_bits(self.phase.load(Ordering::Acquire))
    }

    /// Whether the sequence has completed.
    pub fn is_done(&self) -> bool {
        self.phase() == Phase::Done
    }

    /// Whether no sequence is in progress, either because it completed or because
    /// it was abandoned.
    pub fn is_settled(&self) -> bool {
        matches!(self.phase(), Phase::Done | Phase::Fault)
    }

    /// Advance the descriptor by one timer expiry and return its effects, without
    /// applying them.
    ///
    /// Wakes the [wait_done](TransitionCell::wait_done) future on entering
    /// [Done](Phase::Done). Idempotent once done.
    pub fn tick(&self) -> Effects {
        let current = self.load();
        let (next, effects) = current.advance();
        self.commit(current, next);
        effects
    }

    /// Timer interrupt body: acknowledge the update, advance and apply the effects
    /// to the timer and the line.
    ///
    /// The next descriptor is only published once the effects are applied. If the
    /// line cannot be driven the timer is stopped and the phase becomes
    /// [Fault](Phase::Fault).
    pub fn on_timer_interrupt<T: PeriodicTimer, P: OutputPin>(
        &self,
        timer: &mut T,
        pin: &mut P,
    ) -> Result<(), P::Error> {
        if !timer.is_interrupt_pending() {
            return Ok(());
        }
        timer.clear_pending_interrupt_flag();
        let current = self.load();
        let (next, effects) = current.advance();
        if let Err(e) = effects.apply(timer, pin) {
            timer.stop();
            self.commit(
                current,
                Transition {
                    phase: Phase::Fault,
                    ..current
                },
            );
            return Err(e);
        }
        self.commit(current, next);
        Ok(())
    }

    /// Completes with the terminal phase once the sequence is
    /// [Done](Phase::Done) or has hit a [Fault](Phase::Fault).
    pub fn wait_done(&self) -> impl Future<Output = Phase> + '_ {
        poll_fn(|cx| {
            self.waker.register(cx.waker());
            let phase = self.phase();
            if matches!(phase, Phase::Done | Phase::Fault) {
                Poll::Ready(phase)
            } else {
                Poll::Pending
            }
        })
    }

    fn commit(&self, current: Transition, next: Transition) {
        if next == current {
            return;
        }
        self.store(next);
        if matches!(next.phase, Phase::Done | Phase::Fault) && current.phase != next.phase {
            self.waker.wake();
        }
    }

    fn store(&self, transition: Transition) {
        self.next_delay_us
            .store(transition.next_delay_us, Ordering::Relaxed);
        self.next_level
            .store(transition.next_level == Level::High, Ordering::Relaxed);
        // phase last, it publishes the other fields
        self.phase.store(transition.phase as u8, Ordering::Release);
    }
}

impl Default for TransitionCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::testing::FakeTimer;
    use embedded_hal_mock::eh1::MockError;
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction as PinTransaction};
    use std::io::ErrorKind;
    use std::vec;

    #[test]
    fn reset_reaches_done_after_two_expiries() {
        let start = Transition::reset(120, Level::High);

        let (first, fx) = start.advance();
        assert_eq!(first.phase, Phase::SingleStep);
        assert_eq!(
            fx,
            Effects {
                drive: Some(Level::High),
                reload_us: Some(120),
                stop_timer: false
            }
        );

        let (second, fx) = first.advance();
        assert_eq!(second.phase, Phase::Done);
        assert_eq!(fx.drive, None);
        assert!(fx.stop_timer);

        let (third, fx) = second.advance();
        assert_eq!(third, second);
        assert!(fx.is_empty());
    }

    #[test]
    fn reset_without_follow_up_is_done_on_release() {
        let (next, fx) = Transition::reset(0, Level::High).advance();
        assert_eq!(next.phase, Phase::Done);
        assert_eq!(fx.drive, Some(Level::High));
        assert!(fx.stop_timer);
    }

    #[test]
    fn single_step_chains_queued_delay() {
        let (next, fx) = Transition::single_step(45).advance();
        assert_eq!(next.phase, Phase::SingleStep);
        assert_eq!(next.next_delay_us, 0);
        assert_eq!(fx.reload_us, Some(45));
        assert_eq!(fx.drive, None);
        let (last, _) = next.advance();
        assert_eq!(last.phase, Phase::Done);
    }

    #[test]
    fn reserved_phases_are_inert() {
        for phase in [Phase::WriteZero, Phase::WriteOne, Phase::Read] {
            let t = Transition {
                phase,
                next_delay_us: 70,
                next_level: Level::Low,
            };
            let (next, fx) = t.advance();
            assert_eq!(next, t);
            assert!(fx.is_empty());
        }
    }

    #[test]
    fn cell_round_trips_descriptor() {
        let cell = TransitionCell::new();
        assert!(cell.is_done());
        let t = Transition::reset(120, Level::Low);
        cell.begin(t);
        assert_eq!(cell.load(), t);
        assert_eq!(cell.phase(), Phase::Reset);
    }

    #[test]
    fn interrupt_applies_effects() {
        let expectations = [PinTransaction::set(State::High)];
        let mut pin = PinMock::new(&expectations);
        let mut timer = FakeTimer::new();
        let cell = TransitionCell::new();
        cell.begin(Transition::reset(120, Level::High));
        timer.start();

        // no pending update, nothing happens
        cell.on_timer_interrupt(&mut timer, &mut pin).unwrap();
        assert_eq!(cell.phase(), Phase::Reset);

        timer.fire();
        cell.on_timer_interrupt(&mut timer, &mut pin).unwrap();
        assert_eq!(cell.phase(), Phase::SingleStep);
        assert_eq!(timer.reloads(), vec![120]);
        assert!(!timer.is_interrupt_pending());

        timer.fire();
        cell.on_timer_interrupt(&mut timer, &mut pin).unwrap();
        assert!(cell.is_done());
        assert!(!timer.is_running());

        // already done: no pin write, no reload
        timer.fire();
        cell.on_timer_interrupt(&mut timer, &mut pin).unwrap();
        assert_eq!(timer.reloads(), vec![120]);
        pin.done();
    }

    #[test]
    fn failed_release_faults_the_cell() {
        let expectations =
            [PinTransaction::set(State::High).with_error(MockError::Io(ErrorKind::Other))];
        let mut pin = PinMock::new(&expectations);
        let mut timer = FakeTimer::new();
        let cell = TransitionCell::new();
        cell.begin(Transition::reset(120, Level::High));
        timer.start();

        timer.fire();
        assert_eq!(
            cell.on_timer_interrupt(&mut timer, &mut pin),
            Err(MockError::Io(ErrorKind::Other))
        );
        assert_eq!(cell.phase(), Phase::Fault);
        assert!(cell.is_settled());
        assert!(!cell.is_done());
        assert!(!timer.is_running());
        assert!(timer.reloads().is_empty());

        // abandoned: later expiries do nothing
        timer.fire();
        cell.on_timer_interrupt(&mut timer, &mut pin).unwrap();
        assert_eq!(cell.phase(), Phase::Fault);
        assert_eq!(embassy_futures::block_on(cell.wait_done()), Phase::Fault);
        pin.done();
    }

    #[test]
    fn wait_done_completes_from_interrupt_context() {
        let cell = TransitionCell::new();
        cell.begin(Transition::single_step(30));
        let phase = std::thread::scope(|s| {
            s.spawn(|| {
                cell.tick();
                cell.tick();
            });
            embassy_futures::block_on(cell.wait_done())
        });
        assert_eq!(phase, Phase::Done);
        assert!(cell.is_done());
    }
}
