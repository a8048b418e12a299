//! Radio transport trait
//!
//! The link session sees the transceiver as two blocking operations. Chip
//! bring-up, register programming and encryption are the driver's concern.

use heapless::Vec;

/// Largest frame a transport hands back
pub const MAX_RECEPTION_LEN: usize = 255;

/// Errors that can occur in the radio transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioError {
    /// SPI transfer failed
    Bus,
    /// Chip reported an unexpected silicon version
    UnexpectedVersion(u8),
    /// Frame does not fit the transceiver FIFO
    FrameTooLarge(usize),
    /// Packet was not sent within the allowed time
    TransmitTimeout,
    /// Chip did not reach the requested operating mode
    ModeTimeout,
}

/// One frame taken off the air
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reception {
    pub frame: Vec<u8, MAX_RECEPTION_LEN>,
    /// Received signal strength in dBm, 0 when unavailable
    pub rssi: i16,
}

/// Half-duplex packet radio
pub trait RadioTransport {
    /// Send one frame and return once it has left the antenna
    fn transmit(&mut self, frame: &[u8]) -> Result<(), RadioError>;

    /// Wait up to `timeout_ms` for a frame
    ///
    /// Returns `Ok(None)` when nothing arrived in time.
    fn receive(&mut self, timeout_ms: u32) -> Result<Option<Reception>, RadioError>;
}

impl<T: RadioTransport + ?Sized> RadioTransport for &mut T {
    fn transmit(&mut self, frame: &[u8]) -> Result<(), RadioError> {
        (**self).transmit(frame)
    }

    fn receive(&mut self, timeout_ms: u32) -> Result<Option<Reception>, RadioError> {
        (**self).receive(timeout_ms)
    }
}
