//! Register image of a general-purpose up-counting timer (STM32 `TIMx` layout).

use bitfield_struct::bitfield;

/// Control register 1 (`TIMx_CR1`).
#[bitfield(u16)]
pub struct ControlRegister {
    /// Counter enable (CEN).
    pub counter_enable: bool,
    /// Update disable (UDIS). While set, no update event is generated, so the
    /// period register can be rewritten without a spurious rollover.
    pub update_disable: bool,
    /// Update request source (URS).
    pub update_request_source: bool,
    /// One-pulse mode (OPM).
    pub one_pulse: bool,
    #[bits(12)]
    __: u16,
}

/// DMA/interrupt enable register (`TIMx_DIER`).
#[bitfield(u16)]
pub struct InterruptEnableRegister {
    /// Update interrupt enable (UIE).
    pub update_interrupt: bool,
    #[bits(15)]
    __: u16,
}

/// Status register (`TIMx_SR`).
#[bitfield(u16)]
pub struct StatusRegister {
    /// Update interrupt flag (UIF).
    pub update_flag: bool,
    #[bits(15)]
    __: u16,
}
