//! SPI bus abstractions
//!
//! Chip select is not part of the bus; drivers toggle it through an
//! [`OutputPin`](crate::gpio::OutputPin) around each transaction.

/// SPI bus master
pub trait SpiBus {
    /// Error type for SPI operations
    type Error;

    /// Write data from `data` while reading into the same buffer
    fn transfer_in_place(&mut self, data: &mut [u8]) -> Result<(), Self::Error>;

    /// Write data without reading
    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Block until every queued byte has been clocked out
    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// SPI configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiConfig {
    /// Clock frequency in Hz
    pub frequency: u32,
    pub mode: Mode,
}

impl SpiConfig {
    /// Settings for the RFM69 register interface (mode 0, up to 10 MHz)
    pub const RFM69: Self = Self {
        frequency: 8_000_000,
        mode: Mode::Mode0,
    };
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self {
            frequency: 1_000_000, // 1 MHz
            mode: Mode::Mode0,
        }
    }
}

/// SPI clock polarity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    /// Clock idles low (CPOL=0)
    IdleLow,
    /// Clock idles high (CPOL=1)
    IdleHigh,
}

/// SPI clock phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// Data captured on first clock transition (CPHA=0)
    CaptureOnFirstTransition,
    /// Data captured on second clock transition (CPHA=1)
    CaptureOnSecondTransition,
}

/// SPI mode (combined polarity and phase)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Mode 0: CPOL=0, CPHA=0
    Mode0,
    /// Mode 1: CPOL=0, CPHA=1
    Mode1,
    /// Mode 2: CPOL=1, CPHA=0
    Mode2,
    /// Mode 3: CPOL=1, CPHA=1
    Mode3,
}

impl Mode {
    pub fn polarity(self) -> Polarity {
        match self {
            Mode::Mode0 | Mode::Mode1 => Polarity::IdleLow,
            Mode::Mode2 | Mode::Mode3 => Polarity::IdleHigh,
        }
    }

    pub fn phase(self) -> Phase {
        match self {
            Mode::Mode0 | Mode::Mode2 => Phase::CaptureOnFirstTransition,
            Mode::Mode1 | Mode::Mode3 => Phase::CaptureOnSecondTransition,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_split() {
        assert_eq!(Mode::Mode0.polarity(), Polarity::IdleLow);
        assert_eq!(Mode::Mode0.phase(), Phase::CaptureOnFirstTransition);
        assert_eq!(Mode::Mode3.polarity(), Polarity::IdleHigh);
        assert_eq!(Mode::Mode3.phase(), Phase::CaptureOnSecondTransition);
    }

    #[test]
    fn test_radio_config_within_chip_limit() {
        assert!(SpiConfig::RFM69.frequency <= 10_000_000);
        assert_eq!(SpiConfig::RFM69.mode, Mode::Mode0);
    }
}
