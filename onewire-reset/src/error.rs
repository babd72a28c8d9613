/// Reset sequence error type.
///
/// A reset that finds no device on the bus is not an error: it is reported as
/// `Ok(false)` by [`BusReset::reset`](crate::BusReset::reset).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetError<E> {
    /// Encapsulates the error type from the underlying pin.
    Pin(E),
    /// The line was sampled while it was configured as an output.
    NotSampling,
    /// The timer failed to signal an expiry within the configured number of wakeups.
    TimingFault,
    /// A sequence is still running; it cannot be restarted or sampled yet.
    Busy,
    /// The timer interrupt could not drive the line and abandoned the sequence.
    InterruptFault,
}

/// The timer did not report an elapsed period within the wakeup limit of a
/// bounded wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingFault {
    /// Number of times the processor woke without observing the expiry.
    pub wakeups: u32,
}

impl<E> From<TimingFault> for ResetError<E> {
    fn from(_: TimingFault) -> Self {
        Self::TimingFault
    }
}
