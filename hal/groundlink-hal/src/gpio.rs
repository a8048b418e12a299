//! GPIO pin abstractions

/// Digital output pin
///
/// Writes cannot fail; pins whose driver can report errors are wrapped by
/// an adapter that proves the error type uninhabited.
pub trait OutputPin {
    /// Set the pin high (logic 1)
    fn set_high(&mut self);

    /// Set the pin low (logic 0)
    fn set_low(&mut self);

    /// Set the pin to a specific state
    fn set_state(&mut self, high: bool) {
        if high {
            self.set_high();
        } else {
            self.set_low();
        }
    }
}

/// Output pin that is not connected
///
/// For boards that tie a reset line off.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPin;

impl OutputPin for NoPin {
    fn set_high(&mut self) {}

    fn set_low(&mut self) {}
}
