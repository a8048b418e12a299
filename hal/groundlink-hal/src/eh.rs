//! Adapters from `embedded-hal` 1.0 peripherals
//!
//! Chip HALs such as embassy-rp implement the `embedded-hal` traits; these
//! newtypes let the drivers take them through the traits of this crate.

use core::convert::Infallible;

use embedded_hal::digital::OutputPin as EhOutputPin;
use embedded_hal::i2c::I2c as EhI2c;
use embedded_hal::spi::SpiBus as EhSpiBus;

use crate::gpio::OutputPin;
use crate::i2c::I2cBus;
use crate::spi::SpiBus;

/// [`SpiBus`] over an `embedded-hal` SPI bus
pub struct EhSpi<T>(pub T);

impl<T: EhSpiBus<u8>> SpiBus for EhSpi<T> {
    type Error = T::Error;

    fn transfer_in_place(&mut self, data: &mut [u8]) -> Result<(), Self::Error> {
        self.0.transfer_in_place(data)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.0.write(data)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.0.flush()
    }
}

/// [`I2cBus`] over an `embedded-hal` I2C bus
pub struct EhI2cBus<T>(pub T);

impl<T: EhI2c> I2cBus for EhI2cBus<T> {
    type Error = T::Error;

    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), Self::Error> {
        self.0.write(address, data)
    }

    fn write_read(
        &mut self,
        address: u8,
        write_data: &[u8],
        read_buf: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.0.write_read(address, write_data, read_buf)
    }
}

/// [`OutputPin`] over an infallible `embedded-hal` output
pub struct EhOutput<P>(pub P);

impl<P: EhOutputPin<Error = Infallible>> OutputPin for EhOutput<P> {
    fn set_high(&mut self) {
        match self.0.set_high() {
            Ok(()) => {}
            Err(never) => match never {},
        }
    }

    fn set_low(&mut self) {
        match self.0.set_low() {
            Ok(()) => {}
            Err(never) => match never {},
        }
    }
}
