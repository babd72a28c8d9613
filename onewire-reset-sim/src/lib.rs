//! Host-side simulation of a 1-Wire master pin and its microsecond timer.
//!
//! A [SimBus] owns a virtual clock, an STM32-style up-counting timer, the bus line
//! and an optional slave [Responder]. The [SimPin] and [SimTimer] handles plug into
//! the `onewire-reset` sequencers; [SimIdle] runs the timer interrupt handler each
//! time simulated time reaches a timer update. Everything that happens is recorded
//! as a timestamped [Event].
#![deny(missing_docs)]

mod hal;
mod registers;
mod world;

pub use hal::{SimIdle, SimPin, SimTimer};
pub use registers::{ControlRegister, InterruptEnableRegister, StatusRegister};
pub use world::{Event, EventKind, Responder, SimBus, SimConfig, SimError};
