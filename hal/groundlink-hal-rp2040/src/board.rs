//! Adafruit Feather RP2040 RFM69 pin map
//!
//! | Signal       | GPIO | Peripheral |
//! |--------------|------|------------|
//! | RFM69 SCK    | 14   | SPI1       |
//! | RFM69 MOSI   | 15   | SPI1       |
//! | RFM69 MISO   | 8    | SPI1       |
//! | RFM69 CS     | 16   |            |
//! | RFM69 RST    | 17   |            |
//! | OLED SDA     | 2    | I2C1       |
//! | OLED SCL     | 3    | I2C1       |

use embassy_rp::gpio::{Level, Output};
use embassy_rp::i2c::{self, I2c};
use embassy_rp::peripherals::{I2C1, PIN_14, PIN_15, PIN_16, PIN_17, PIN_2, PIN_3, PIN_8, SPI1};
use embassy_rp::spi::{self, Blocking, Spi};
use embassy_rp::Peri;

use groundlink_hal::eh::{EhI2cBus, EhOutput, EhSpi};
use groundlink_hal::i2c::I2cConfig;
use groundlink_hal::spi::{Phase, Polarity, SpiConfig};

/// Push-pull output behind the HAL pin trait
pub type OutputLine = EhOutput<Output<'static>>;

/// Transceiver SPI bus
pub type RadioSpi = EhSpi<Spi<'static, SPI1, Blocking>>;

/// Display I2C bus
pub type DisplayBus = EhI2cBus<I2c<'static, I2C1, i2c::Blocking>>;

/// Everything the RFM69 driver needs
pub struct RadioBus {
    pub spi: RadioSpi,
    pub cs: OutputLine,
    pub rst: OutputLine,
}

/// Peripherals wired to the on-board RFM69
pub struct RadioPins {
    pub spi: Peri<'static, SPI1>,
    pub sck: Peri<'static, PIN_14>,
    pub mosi: Peri<'static, PIN_15>,
    pub miso: Peri<'static, PIN_8>,
    pub cs: Peri<'static, PIN_16>,
    pub rst: Peri<'static, PIN_17>,
}

impl RadioPins {
    /// Configure SPI1 and the control lines
    ///
    /// Chip select idles high and reset idles low.
    pub fn into_bus(self, config: &SpiConfig) -> RadioBus {
        let mut spi_config = spi::Config::default();
        spi_config.frequency = config.frequency;
        spi_config.polarity = match config.mode.polarity() {
            Polarity::IdleLow => spi::Polarity::IdleLow,
            Polarity::IdleHigh => spi::Polarity::IdleHigh,
        };
        spi_config.phase = match config.mode.phase() {
            Phase::CaptureOnFirstTransition => spi::Phase::CaptureOnFirstTransition,
            Phase::CaptureOnSecondTransition => spi::Phase::CaptureOnSecondTransition,
        };

        let spi = Spi::new_blocking(self.spi, self.sck, self.mosi, self.miso, spi_config);

        RadioBus {
            spi: EhSpi(spi),
            cs: EhOutput(Output::new(self.cs, Level::High)),
            rst: EhOutput(Output::new(self.rst, Level::Low)),
        }
    }
}

/// Peripherals on the STEMMA QT connector
pub struct DisplayPins {
    pub i2c: Peri<'static, I2C1>,
    pub sda: Peri<'static, PIN_2>,
    pub scl: Peri<'static, PIN_3>,
}

impl DisplayPins {
    pub fn into_bus(self, config: &I2cConfig) -> DisplayBus {
        let mut i2c_config = i2c::Config::default();
        i2c_config.frequency = config.frequency;
        EhI2cBus(I2c::new_blocking(self.i2c, self.scl, self.sda, i2c_config))
    }
}
