//! Standard-speed reset timing.

/// Minimum time the master holds the line low to reset every slave (tRSTL).
pub const RESET_LOW_US: u32 = 480;

/// Delay from releasing the line to sampling it for a presence pulse (tMSP).
pub const PRESENCE_SAMPLE_US: u32 = 60;

/// Length of the presence-detect window measured from the release point.
/// The next reset may only start once this window has elapsed.
pub const PRESENCE_WINDOW_US: u32 = 180;

/// Upper bound on the time spent switching the pin to input, reading it and
/// switching it back to output.
pub const SAMPLE_COST_US: u32 = 1;

/// Release-to-sample delay for the interrupt-driven sequence. Samples in the
/// middle of the slowest slave's presence pulse.
pub const MID_WINDOW_SAMPLE_US: u32 = 120;

/// Presence-detect window used with [`MID_WINDOW_SAMPLE_US`].
pub const MID_WINDOW_PRESENCE_WINDOW_US: u32 = 240;

/// Timing of one reset/presence-detect cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetTiming {
    /// Time the line is held low.
    pub reset_low_us: u32,
    /// Time from the release to the presence sample.
    pub sample_delay_us: u32,
    /// Total window from the release to the end of the cycle.
    pub presence_window_us: u32,
    /// Budgeted cost of the sample itself.
    pub sample_cost_us: u32,
}

impl ResetTiming {
    /// 480 µs low, sample 60 µs after release, 180 µs window.
    pub const STANDARD: Self = Self {
        reset_low_us: RESET_LOW_US,
        sample_delay_us: PRESENCE_SAMPLE_US,
        presence_window_us: PRESENCE_WINDOW_US,
        sample_cost_us: SAMPLE_COST_US,
    };

    /// 480 µs low, sample 120 µs after release, 240 µs window.
    pub const MID_WINDOW: Self = Self {
        reset_low_us: RESET_LOW_US,
        sample_delay_us: MID_WINDOW_SAMPLE_US,
        presence_window_us: MID_WINDOW_PRESENCE_WINDOW_US,
        sample_cost_us: SAMPLE_COST_US,
    };

    /// Set the reset low time.
    pub const fn with_reset_low_us(mut self, us: u32) -> Self {
        self.reset_low_us = us;
        self
    }

    /// Set the release-to-sample delay.
    pub const fn with_sample_delay_us(mut self, us: u32) -> Self {
        self.sample_delay_us = us;
        self
    }

    /// Set the presence-detect window.
    pub const fn with_presence_window_us(mut self, us: u32) -> Self {
        self.presence_window_us = us;
        self
    }

    /// Set the budgeted sampling cost.
    ///
    /// Measure it on the target (pin mode switch + read + switch back) and round up.
    pub const fn with_sample_cost_us(mut self, us: u32) -> Self {
        self.sample_cost_us = us;
        self
    }

    /// Time still to wait once the sample has been taken so that the cycle ends
    /// exactly `presence_window_us` after the release.
    pub const fn recovery_us(&self) -> u32 {
        self.presence_window_us
            .saturating_sub(self.sample_delay_us)
            .saturating_sub(self.sample_cost_us)
    }
}

impl Default for ResetTiming {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Timer prescaler that turns a `clock_hz` input clock into 1 µs counter ticks.
///
/// Returns `None` if the clock is not a whole number of MHz, or the divider does
/// not fit the 16-bit prescaler register.
pub const fn microsecond_prescaler(clock_hz: u32) -> Option<u16> {
    if clock_hz < 1_000_000 || clock_hz % 1_000_000 != 0 {
        return None;
    }
    let div = clock_hz / 1_000_000 - 1;
    if div > u16::MAX as u32 {
        None
    } else {
        Some(div as u16)
    }
}
