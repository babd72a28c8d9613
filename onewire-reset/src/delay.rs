use crate::{Idle, PeriodicTimer, TimingFault};
use embedded_hal::delay::DelayNs;
use portable_atomic::{AtomicBool, Ordering};

/// Elapsed-tick flag shared between the timer interrupt and a waiting [DelayEngine].
///
/// Set by the interrupt on every period expiry, cleared by the waiter before it
/// reprograms the timer.
pub struct TickFlag(AtomicBool);

impl TickFlag {
    /// A cleared flag, usable in a `static`.
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Mark a period as elapsed.
    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Forget any elapsed period.
    pub fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }

    /// Whether a period elapsed since the last [clear](TickFlag::clear).
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Timer interrupt body: acknowledge the update interrupt and set the flag.
    pub fn on_timer_interrupt<T: PeriodicTimer>(&self, timer: &mut T) {
        if timer.is_interrupt_pending() {
            timer.clear_pending_interrupt_flag();
            self.set();
        }
    }
}

impl Default for TickFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Blocking microsecond delay backed by a periodic timer.
///
/// Every wait reprograms the timer for the full duration and idles until the
/// timer interrupt reports the expiry through the shared [TickFlag]. With a
/// [Wfi](crate::Wfi) idle the core sleeps between interrupts.
///
/// The plain waits never give up: if the timer stops interrupting they hang.
/// [try_wait_us](DelayEngine::try_wait_us) bounds the number of wakeups instead.
pub struct DelayEngine<'a, T, I> {
    timer: T,
    idle: I,
    flag: &'a TickFlag,
    wake_limit: u32,
}

impl<'a, T: PeriodicTimer, I: Idle> DelayEngine<'a, T, I> {
    /// Creates a delay engine. Enables the timer interrupt and starts the timer.
    pub fn new(mut timer: T, idle: I, flag: &'a TickFlag) -> Self {
        timer.enable_interrupt();
        timer.start();
        Self {
            timer,
            idle,
            flag,
            wake_limit: 1000,
        }
    }

    /// Set the number of wakeups [try_wait_us](DelayEngine::try_wait_us) tolerates
    /// per timer period before reporting a [TimingFault].
    pub fn with_wake_limit(mut self, wake_limit: u32) -> Self {
        self.wake_limit = wake_limit;
        self
    }

    /// Returns the timer and the idle strategy.
    pub fn into_inner(self) -> (T, I) {
        (self.timer, self.idle)
    }

    /// Wait at least `us` microseconds.
    ///
    /// Durations longer than [`PeriodicTimer::MAX_PERIOD_US`] are split into
    /// back-to-back periods.
    pub fn wait_us(&mut self, us: u32) {
        let mut remaining = us;
        while remaining > 0 {
            let period = remaining.min(T::MAX_PERIOD_US);
            self.arm(period);
            while !self.flag.is_set() {
                self.idle.idle();
            }
            remaining -= period;
        }
    }

    /// Wait at least `ms` milliseconds, as repeated 1000 µs waits.
    pub fn wait_ms(&mut self, ms: u32) {
        for _ in 0..ms {
            self.wait_us(1000);
        }
    }

    /// Like [wait_us](DelayEngine::wait_us), but fails once the processor has woken
    /// more than the wake limit times within one period without seeing it expire.
    pub fn try_wait_us(&mut self, us: u32) -> Result<(), TimingFault> {
        let mut remaining = us;
        while remaining > 0 {
            let period = remaining.min(T::MAX_PERIOD_US);
            self.arm(period);
            let mut wakeups = 0;
            while !self.flag.is_set() {
                if wakeups >= self.wake_limit {
                    log::warn!("timer did not expire after {wakeups} wakeups ({period} us period)");
                    return Err(TimingFault { wakeups });
                }
                self.idle.idle();
                wakeups += 1;
            }
            remaining -= period;
        }
        Ok(())
    }

    fn arm(&mut self, period_us: u32) {
        // clear first: an expiry racing the reload must not be lost
        self.flag.clear();
        self.timer.reload(period_us);
    }
}

impl<T: PeriodicTimer, I: Idle> DelayNs for DelayEngine<'_, T, I> {
    fn delay_ns(&mut self, ns: u32) {
        self.wait_us(ns.div_ceil(1000));
    }

    fn delay_us(&mut self, us: u32) {
        self.wait_us(us);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.wait_ms(ms);
    }
}
