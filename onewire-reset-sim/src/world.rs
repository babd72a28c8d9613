use crate::registers::{ControlRegister, InterruptEnableRegister, StatusRegister};
use crate::{SimIdle, SimPin, SimTimer};
use core::fmt;
use onewire_reset::{Direction, Level, RESET_LOW_US, microsecond_prescaler};
use std::cell::RefCell;
use std::rc::Rc;

/// A slave that answers every reset pulse with a presence pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Responder {
    /// Time from the master releasing the line to the slave pulling it low (tPDH).
    pub response_delay_us: u32,
    /// Length of the presence pulse (tPDL).
    pub pulse_us: u32,
}

impl Default for Responder {
    fn default() -> Self {
        Self {
            response_delay_us: 30,
            pulse_us: 120,
        }
    }
}

/// Simulator configuration.
#[derive(Debug, Clone, Copy)]
pub struct SimConfig {
    /// Timer input clock.
    pub clock_hz: u32,
    /// Simulated time consumed by every read of the line.
    pub sample_cost_us: u32,
    /// The device on the bus, if any.
    pub responder: Option<Responder>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            clock_hz: 16_000_000,
            sample_cost_us: 1,
            responder: Some(Responder::default()),
        }
    }
}

/// Simulator setup errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimError {
    /// The timer clock cannot be divided down to 1 µs ticks.
    Clock(u32),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::Clock(hz) => write!(f, "{hz} Hz cannot be prescaled to 1 us ticks"),
        }
    }
}

impl std::error::Error for SimError {}

/// Something that happened on the simulated bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// The master wrote the output data register.
    Drive(Level),
    /// The master changed the pin direction.
    Direction(Direction),
    /// The master read the line.
    Sample(Level),
    /// The timer period register was written.
    Period(u32),
    /// The timer started counting.
    Start,
    /// The timer stopped counting.
    Stop,
    /// The timer rolled over and raised an update event.
    Update,
    /// A period write raised an update event on the leftover count.
    SpuriousUpdate,
    /// The processor woke without an interrupt.
    SpuriousWake,
    /// The slave will hold the line low until `until_us`.
    Presence {
        /// When the slave starts pulling the line low.
        from_us: u64,
        /// When the slave releases the line.
        until_us: u64,
    },
}

/// A timestamped [EventKind].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    /// Simulated time, µs.
    pub at_us: u64,
    /// What happened.
    pub kind: EventKind,
}

struct Timer {
    cr1: ControlRegister,
    dier: InterruptEnableRegister,
    sr: StatusRegister,
    psc: u16,
    arr: u16,
    epoch_us: u64,
}

struct Line {
    direction: Direction,
    odr: Level,
    low_since: Option<u64>,
}

struct World {
    now_us: u64,
    timer: Timer,
    line: Line,
    responder: Option<Responder>,
    presence: Option<(u64, u64)>,
    sample_cost_us: u32,
    events: Vec<Event>,
}

impl World {
    fn record(&mut self, kind: EventKind) {
        log::trace!("{:>8} us  {:?}", self.now_us, kind);
        self.events.push(Event {
            at_us: self.now_us,
            kind,
        });
    }

    fn master_low(&self) -> bool {
        self.line.direction == Direction::Output && self.line.odr == Level::Low
    }

    fn counter(&self) -> u64 {
        self.now_us - self.timer.epoch_us
    }

    fn update_line(&mut self, was_low: bool) {
        let low = self.master_low();
        match (was_low, low) {
            (false, true) => self.line.low_since = Some(self.now_us),
            (true, false) => {
                let held = self.line.low_since.take().map(|t| self.now_us - t);
                if let (Some(held), Some(responder)) = (held, self.responder) {
                    if held >= u64::from(RESET_LOW_US) {
                        let from_us = self.now_us + u64::from(responder.response_delay_us);
                        let until_us = from_us + u64::from(responder.pulse_us);
                        self.presence = Some((from_us, until_us));
                        self.record(EventKind::Presence { from_us, until_us });
                    }
                }
            }
            _ => {}
        }
    }

    fn level(&self) -> Level {
        let slave_low = self
            .presence
            .is_some_and(|(from, until)| (from..until).contains(&self.now_us));
        if self.master_low() || slave_low {
            Level::Low
        } else {
            Level::High
        }
    }
}

/// Handle onto a simulated 1-Wire bus: one master pin, one timer, at most one slave.
///
/// Time only moves when the timer rolls over (see
/// [advance_to_next_update](SimBus::advance_to_next_update)) or when the line is
/// sampled. Clones share the same bus.
#[derive(Clone)]
pub struct SimBus(Rc<RefCell<World>>);

impl SimBus {
    /// Creates a bus at t = 0 with the line released and the timer stopped.
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        let psc = microsecond_prescaler(config.clock_hz).ok_or(SimError::Clock(config.clock_hz))?;
        Ok(Self(Rc::new(RefCell::new(World {
            now_us: 0,
            timer: Timer {
                cr1: ControlRegister::new(),
                dier: InterruptEnableRegister::new(),
                sr: StatusRegister::new(),
                psc,
                arr: u16::MAX,
                epoch_us: 0,
            },
            line: Line {
                direction: Direction::Input,
                odr: Level::High,
                low_since: None,
            },
            responder: config.responder,
            presence: None,
            sample_cost_us: config.sample_cost_us,
            events: Vec::new(),
        }))))
    }

    /// A handle onto the master pin.
    pub fn pin(&self) -> SimPin {
        SimPin(self.clone())
    }

    /// A handle onto the timer.
    pub fn timer(&self) -> SimTimer {
        SimTimer(self.clone())
    }

    /// An idle strategy that lets time pass until the next timer update and then
    /// runs `isr` if the update interrupt is pending.
    pub fn idle<F: FnMut()>(&self, isr: F) -> SimIdle<F> {
        SimIdle::new(self.clone(), isr)
    }

    /// Current simulated time.
    pub fn now_us(&self) -> u64 {
        self.0.borrow().now_us
    }

    /// Timer prescaler derived from the configured clock.
    pub fn prescaler(&self) -> u16 {
        self.0.borrow().timer.psc
    }

    /// Everything recorded so far.
    pub fn events(&self) -> Vec<Event> {
        self.0.borrow().events.clone()
    }

    /// Times at which `kind` was recorded.
    pub fn times_of(&self, kind: EventKind) -> Vec<u64> {
        self.0
            .borrow()
            .events
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.at_us)
            .collect()
    }

    /// Let time pass until the running timer rolls over.
    ///
    /// Returns whether the update interrupt is now pending. Returns `false` without
    /// moving time if the timer is stopped or its period is zero.
    pub fn advance_to_next_update(&self) -> bool {
        let mut w = self.0.borrow_mut();
        // a zero period stalls the counter
        if !w.timer.cr1.counter_enable() || w.timer.arr == 0 {
            return false;
        }
        let period = u64::from(w.timer.arr);
        let at = (w.timer.epoch_us + period).max(w.now_us);
        w.now_us = at;
        w.timer.epoch_us = at;
        if !w.timer.cr1.update_disable() {
            w.timer.sr.set_update_flag(true);
            w.record(EventKind::Update);
        }
        w.timer.sr.update_flag() && w.timer.dier.update_interrupt()
    }

    pub(crate) fn record(&self, kind: EventKind) {
        self.0.borrow_mut().record(kind);
    }

    pub(crate) fn drive(&self, level: Level) {
        let mut w = self.0.borrow_mut();
        let was_low = w.master_low();
        w.line.odr = level;
        w.record(EventKind::Drive(level));
        w.update_line(was_low);
    }

    pub(crate) fn set_direction(&self, direction: Direction) {
        let mut w = self.0.borrow_mut();
        let was_low = w.master_low();
        w.line.direction = direction;
        w.record(EventKind::Direction(direction));
        w.update_line(was_low);
    }

    pub(crate) fn sample(&self) -> Level {
        let mut w = self.0.borrow_mut();
        let level = w.level();
        w.record(EventKind::Sample(level));
        w.now_us += u64::from(w.sample_cost_us);
        level
    }

    pub(crate) fn set_update_events(&self, enabled: bool) {
        self.0.borrow_mut().timer.cr1.set_update_disable(!enabled);
    }

    pub(crate) fn write_period(&self, period_us: u32) {
        let mut w = self.0.borrow_mut();
        let arr = period_us.min(u32::from(u16::MAX)) as u16;
        let t = &w.timer;
        let overrun = t.cr1.counter_enable() && !t.cr1.update_disable() && w.counter() >= u64::from(arr);
        w.timer.arr = arr;
        w.record(EventKind::Period(u32::from(arr)));
        if overrun {
            w.timer.epoch_us = w.now_us;
            w.timer.sr.set_update_flag(true);
            w.record(EventKind::SpuriousUpdate);
        }
    }

    pub(crate) fn reset_counter(&self) {
        let mut w = self.0.borrow_mut();
        w.timer.epoch_us = w.now_us;
    }

    pub(crate) fn set_running(&self, running: bool) {
        let mut w = self.0.borrow_mut();
        if w.timer.cr1.counter_enable() == running {
            return;
        }
        w.timer.cr1.set_counter_enable(running);
        if running {
            w.timer.epoch_us = w.now_us;
            w.record(EventKind::Start);
        } else {
            w.record(EventKind::Stop);
        }
    }

    pub(crate) fn enable_interrupt(&self) {
        self.0.borrow_mut().timer.dier.set_update_interrupt(true);
    }

    pub(crate) fn clear_update_flag(&self) {
        self.0.borrow_mut().timer.sr.set_update_flag(false);
    }

    pub(crate) fn interrupt_pending(&self) -> bool {
        let w = self.0.borrow();
        w.timer.sr.update_flag() && w.timer.dier.update_interrupt()
    }
}
