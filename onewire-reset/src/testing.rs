//! Fakes shared by the unit tests.

extern crate std;

use crate::{BusPin, Direction, OutputMode, PeriodicTimer};
use embedded_hal_mock::eh1::digital::Mock as PinMock;
use std::sync::{Arc, Mutex};
use std::vec::Vec;

impl BusPin for PinMock {
    fn configure(&mut self, _direction: Direction, _mode: OutputMode) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[derive(Debug, Default)]
pub(crate) struct TimerState {
    pub reloads: Vec<u32>,
    pub running: bool,
    pub pending: bool,
    pub interrupt_enabled: bool,
    pub update_events: bool,
    pub writes_with_updates_enabled: u32,
}

/// Timer that records every reprogram. Clones share state.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeTimer(pub Arc<Mutex<TimerState>>);

impl FakeTimer {
    pub fn new() -> Self {
        let timer = Self::default();
        timer.0.lock().unwrap().update_events = true;
        timer
    }

    pub fn reloads(&self) -> Vec<u32> {
        self.0.lock().unwrap().reloads.clone()
    }

    pub fn is_running(&self) -> bool {
        self.0.lock().unwrap().running
    }

    /// Period rollover.
    pub fn fire(&self) {
        self.0.lock().unwrap().pending = true;
    }
}

impl PeriodicTimer for FakeTimer {
    const MAX_PERIOD_US: u32 = 1000;

    fn set_update_events(&mut self, enabled: bool) {
        self.0.lock().unwrap().update_events = enabled;
    }

    fn write_period(&mut self, period_us: u32) {
        let mut state = self.0.lock().unwrap();
        if state.update_events {
            state.writes_with_updates_enabled += 1;
        }
        state.reloads.push(period_us);
    }

    fn reset_counter(&mut self) {}

    fn start(&mut self) {
        self.0.lock().unwrap().running = true;
    }

    fn stop(&mut self) {
        self.0.lock().unwrap().running = false;
    }

    fn enable_interrupt(&mut self) {
        self.0.lock().unwrap().interrupt_enabled = true;
    }

    fn clear_pending_interrupt_flag(&mut self) {
        self.0.lock().unwrap().pending = false;
    }

    fn is_interrupt_pending(&self) -> bool {
        self.0.lock().unwrap().pending
    }
}

/// Delay provider that only records what it was asked for.
#[derive(Debug, Default)]
pub(crate) struct RecordingDelay {
    pub waits_us: Vec<u32>,
}

impl embedded_hal::delay::DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.waits_us.push(ns.div_ceil(1000));
    }

    fn delay_us(&mut self, us: u32) {
        self.waits_us.push(us);
    }
}

impl embedded_hal_async::delay::DelayNs for RecordingDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.waits_us.push(ns.div_ceil(1000));
    }

    async fn delay_us(&mut self, us: u32) {
        self.waits_us.push(us);
    }
}
