#![allow(async_fn_in_trait)]
use crate::ResetResult;

/// Trait for the 1-Wire reset primitive, in async environments.
pub trait BusResetAsync {
    /// The error type of the underlying pin.
    type Error;

    /// Resets the 1-Wire bus.
    ///
    /// # Returns
    /// `true` if a slave answered with a presence pulse, `false` if the line stayed
    /// high.
    ///
    /// # Errors
    /// This method returns an error if the pin fails.
    async fn reset(&mut self) -> ResetResult<bool, Self::Error>;
}
