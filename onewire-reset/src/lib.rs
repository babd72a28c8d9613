#![no_std]
#![deny(missing_docs)]
//! # onewire-reset
//! A no-std implementation of the 1-Wire reset/presence-detect sequence, timed
//! entirely by a periodic hardware timer.
//!
//! The crate provides two interchangeable ways of producing a bus reset:
//! - [ResetSequencer] (and its async sibling [ResetSequencerAsync]) runs the
//!   sequence as straight-line code on top of a delay provider, typically the
//!   timer-backed [DelayEngine].
//! - [ResetMachine] advances a [Transition] descriptor one phase per timer
//!   interrupt, so the processor is free between line transitions.
//!
//! Both implement [BusReset], which is the primitive higher-level bus-command
//! code (ROM addressing, search, data bytes) builds on.
//!
//! The hardware is reached through three small seams: [BusPin] for the open-drain
//! line, [PeriodicTimer] for the timer, and [Idle] for whatever the foreground does
//! while it waits for the next interrupt.

mod consts;
mod delay;
mod error;
mod irq;
mod line;
mod machine;
mod sequencer;
mod sequencer_async;
#[cfg(test)]
mod testing;
mod traits;
mod traits_async;

pub use consts::{
    MID_WINDOW_PRESENCE_WINDOW_US, MID_WINDOW_SAMPLE_US, PRESENCE_SAMPLE_US, PRESENCE_WINDOW_US,
    RESET_LOW_US, ResetTiming, SAMPLE_COST_US, microsecond_prescaler,
};
pub use delay::{DelayEngine, TickFlag};
pub use error::{ResetError, TimingFault};
pub use irq::ResetMachine;
pub use line::LineDriver;
pub use machine::{Effects, Phase, Transition, TransitionCell};
pub use sequencer::ResetSequencer;
pub use sequencer_async::ResetSequencerAsync;
#[cfg(feature = "cortex-m")]
pub use traits::Wfi;
pub use traits::{BusPin, BusReset, BusyPoll, Direction, Idle, Level, OutputMode, PeriodicTimer};
pub use traits_async::BusResetAsync;

/// Result of reset operations.
pub type ResetResult<T, E> = Result<T, ResetError<E>>;
