//! RFM69 packet transceiver (SPI)
//!
//! The RFM69HCW is an SX1231-based FSK transceiver with a 66-byte FIFO,
//! hardware CRC, data whitening and optional AES-128.
//!
//! # SPI Protocol
//!
//! Every access is one chip-select window:
//! - Address byte, bit 7 set for a write
//! - Data bytes; the address auto-increments except for the FIFO
//!
//! # Packet Format
//!
//! Variable-length packet mode. The first FIFO byte is the length of the
//! rest of the packet. In [`FifoMode::Raw`] the frame handed to
//! [`Rfm69::send`] already begins with that byte; in
//! [`FifoMode::RadioHead`] the driver writes the length and a broadcast
//! 4-byte address header itself and strips them on receive.

use embedded_hal::delay::DelayNs;
use heapless::Vec;

use groundlink_core::config::{LinkConfig, RadioConfig, AES_KEY_LEN};
use groundlink_core::traits::{RadioError, RadioTransport, Reception, MAX_RECEPTION_LEN};
use groundlink_hal::{OutputPin, SpiBus};
use groundlink_protocol::HeaderMode;

/// RFM69 register addresses
pub mod reg {
    /// FIFO read/write access
    pub const FIFO: u8 = 0x00;
    /// Operating mode
    pub const OP_MODE: u8 = 0x01;
    /// Data processing mode and modulation
    pub const DATA_MODUL: u8 = 0x02;
    pub const BITRATE_MSB: u8 = 0x03;
    pub const BITRATE_LSB: u8 = 0x04;
    /// Frequency deviation
    pub const FDEV_MSB: u8 = 0x05;
    pub const FDEV_LSB: u8 = 0x06;
    /// Carrier frequency, 24 bits
    pub const FRF_MSB: u8 = 0x07;
    pub const FRF_MID: u8 = 0x08;
    pub const FRF_LSB: u8 = 0x09;
    /// Silicon revision
    pub const VERSION: u8 = 0x10;
    /// Power amplifier selection and output power
    pub const PA_LEVEL: u8 = 0x11;
    /// Low-noise amplifier
    pub const LNA: u8 = 0x18;
    /// Channel filter bandwidth
    pub const RX_BW: u8 = 0x19;
    /// AFC channel filter bandwidth
    pub const AFC_BW: u8 = 0x1A;
    /// Last RSSI sample, -value/2 dBm
    pub const RSSI_VALUE: u8 = 0x24;
    pub const DIO_MAPPING1: u8 = 0x25;
    pub const DIO_MAPPING2: u8 = 0x26;
    /// Mode and PLL status flags
    pub const IRQ_FLAGS1: u8 = 0x27;
    /// FIFO and packet status flags
    pub const IRQ_FLAGS2: u8 = 0x28;
    /// RSSI trigger level for RX
    pub const RSSI_THRESH: u8 = 0x29;
    pub const PREAMBLE_MSB: u8 = 0x2C;
    pub const PREAMBLE_LSB: u8 = 0x2D;
    /// Sync word enable and size
    pub const SYNC_CONFIG: u8 = 0x2E;
    /// First of 8 sync word bytes
    pub const SYNC_VALUE1: u8 = 0x2F;
    /// Packet format, whitening, CRC
    pub const PACKET_CONFIG1: u8 = 0x37;
    /// Largest accepted length byte in variable-length mode
    pub const PAYLOAD_LENGTH: u8 = 0x38;
    /// TX start condition and FIFO threshold
    pub const FIFO_THRESH: u8 = 0x3C;
    /// Auto RX restart and AES
    pub const PACKET_CONFIG2: u8 = 0x3D;
    /// First of 16 AES key bytes
    pub const AES_KEY1: u8 = 0x3E;
}

/// `IRQ_FLAGS1` bits
pub mod irq1 {
    /// Requested operating mode is ready
    pub const MODE_READY: u8 = 0x80;
}

/// `IRQ_FLAGS2` bits
pub mod irq2 {
    pub const FIFO_NOT_EMPTY: u8 = 0x40;
    /// Write 1 to clear the FIFO
    pub const FIFO_OVERRUN: u8 = 0x10;
    pub const PACKET_SENT: u8 = 0x08;
    pub const PAYLOAD_READY: u8 = 0x04;
}

/// Expected `VERSION` register content
pub const CHIP_VERSION: u8 = 0x24;

/// Largest packet handled without refilling the FIFO, length byte included
pub const MAX_PACKET_LEN: usize = 64;

/// Address header RadioHead-compatible peers put after the length byte
pub const RADIOHEAD_HEADER: [u8; 4] = [0xFF, 0xFF, 0x00, 0x00];

/// Registers returned by [`Rfm69::read_configuration`]
pub const CONFIG_REGISTERS: usize = 0x50;

/// Crystal oscillator frequency
const FXOSC_HZ: u64 = 32_000_000;

/// Bit set in the address byte for a register write
const WRITE: u8 = 0x80;

/// Mode-ready polling: 100 polls of 100 µs
const MODE_READY_POLLS: u32 = 100;
const MODE_READY_POLL_US: u32 = 100;

/// Fixed register programming for the rover link
///
/// Frequency, bitrate, power, sync word and AES depend on the deployment
/// and are written separately.
const LINK_REGISTERS: [(u8, u8); 13] = [
    // Packet mode, FSK, no shaping
    (reg::DATA_MODUL, 0x00),
    // 50 ohm input, G1 gain set by AGC
    (reg::LNA, 0x08),
    (reg::DIO_MAPPING1, 0x00),
    // ClkOut off
    (reg::DIO_MAPPING2, 0x05),
    // 4 preamble bytes
    (reg::PREAMBLE_MSB, 0x00),
    (reg::PREAMBLE_LSB, 0x04),
    // Sync on, 2 bytes
    (reg::SYNC_CONFIG, 0x88),
    // Variable length, whitening, CRC on
    (reg::PACKET_CONFIG1, 0xD0),
    (reg::PAYLOAD_LENGTH, MAX_PACKET_LEN as u8),
    // TX starts on FIFO not empty, threshold 15
    (reg::FIFO_THRESH, 0x8F),
    // Fdev 0x0138 (about 19 kHz)
    (reg::FDEV_MSB, 0x01),
    (reg::FDEV_LSB, 0x38),
    (reg::RSSI_THRESH, 0xFF),
];

/// Channel and AFC filter setting shared by both registers
const RX_BW_SETTING: u8 = 0xEC;

/// RFM69 errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rfm69Error<E> {
    /// SPI bus error
    Spi(E),
    /// `VERSION` register did not read [`CHIP_VERSION`]
    UnexpectedVersion(u8),
    /// Frame does not fit [`MAX_PACKET_LEN`]
    FrameTooLarge(usize),
    /// `PacketSent` not raised within the transmit timeout
    TransmitTimeout,
    /// `ModeReady` not raised after a mode change
    ModeTimeout,
}

impl<E> From<Rfm69Error<E>> for RadioError {
    fn from(e: Rfm69Error<E>) -> Self {
        match e {
            Rfm69Error::Spi(_) => RadioError::Bus,
            Rfm69Error::UnexpectedVersion(v) => RadioError::UnexpectedVersion(v),
            Rfm69Error::FrameTooLarge(len) => RadioError::FrameTooLarge(len),
            Rfm69Error::TransmitTimeout => RadioError::TransmitTimeout,
            Rfm69Error::ModeTimeout => RadioError::ModeTimeout,
        }
    }
}

/// Transceiver operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OperatingMode {
    Sleep,
    Standby,
    Transmit,
    Receive,
}

impl OperatingMode {
    /// `OP_MODE` value (sequencer on, listen off)
    pub fn bits(self) -> u8 {
        match self {
            OperatingMode::Sleep => 0x00,
            OperatingMode::Standby => 0x04,
            OperatingMode::Transmit => 0x0C,
            OperatingMode::Receive => 0x10,
        }
    }
}

/// Who writes the link header into the FIFO
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FifoMode {
    /// Frames pass through unchanged; they carry their own length byte
    #[default]
    Raw,
    /// Driver adds and strips the length byte and address header
    RadioHead,
}

/// RFM69 driver configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rfm69Config {
    /// Carrier frequency in Hz
    pub frequency_hz: u32,
    /// Bits per second
    pub bitrate: u32,
    /// Output power with PA1 and PA2 on (2-17 dBm)
    pub tx_power_dbm: i8,
    pub sync_word: [u8; 2],
    pub aes_key: Option<[u8; AES_KEY_LEN]>,
    pub fifo: FifoMode,
    /// Longest wait for `PacketSent`
    pub tx_timeout_ms: u32,
}

impl Default for Rfm69Config {
    fn default() -> Self {
        Self::new(&RadioConfig::default(), &LinkConfig::default())
    }
}

impl Rfm69Config {
    /// Driver settings for a ground station configuration
    ///
    /// An implicit frame header puts the driver in RadioHead FIFO mode.
    pub fn new(radio: &RadioConfig, link: &LinkConfig) -> Self {
        Self {
            frequency_hz: radio.frequency_hz,
            bitrate: radio.bitrate,
            tx_power_dbm: radio.tx_power_dbm,
            sync_word: radio.sync_word,
            aes_key: radio.aes_key,
            fifo: match link.header {
                HeaderMode::Explicit => FifoMode::Raw,
                HeaderMode::Implicit => FifoMode::RadioHead,
            },
            tx_timeout_ms: link.tx_timeout_ms,
        }
    }

    /// `FRF` register value: f * 2^19 / FXOSC
    pub fn frf(&self) -> u32 {
        (((self.frequency_hz as u64) << 19) / FXOSC_HZ) as u32
    }

    /// `BITRATE` register value: FXOSC / bitrate
    pub fn bitrate_divider(&self) -> u16 {
        let divider = FXOSC_HZ / (self.bitrate.max(1) as u64);
        divider.min(u16::MAX as u64) as u16
    }

    /// `PA_LEVEL` value with both amplifiers on
    pub fn pa_level(&self) -> u8 {
        let dbm = self.tx_power_dbm.clamp(2, 17);
        0x60 | (dbm + 14) as u8
    }

    /// `PACKET_CONFIG2` value
    pub fn packet_config2(&self) -> u8 {
        // Auto RX restart
        let mut value = 0x02;
        if self.aes_key.is_some() {
            value |= 0x01;
        }
        value
    }

    /// Frame length that still fits the FIFO after driver framing
    pub fn max_frame_len(&self) -> usize {
        match self.fifo {
            FifoMode::Raw => MAX_PACKET_LEN,
            FifoMode::RadioHead => MAX_PACKET_LEN - 1 - RADIOHEAD_HEADER.len(),
        }
    }
}

/// RFM69 driver
pub struct Rfm69<SPI, CS, RST, D> {
    spi: SPI,
    cs: CS,
    rst: RST,
    delay: D,
    config: Rfm69Config,
    mode: OperatingMode,
}

impl<SPI, CS, RST, D> Rfm69<SPI, CS, RST, D>
where
    SPI: SpiBus,
    CS: OutputPin,
    RST: OutputPin,
    D: DelayNs,
{
    /// Create a driver; call [`init`](Self::init) before use
    pub fn new(spi: SPI, mut cs: CS, mut rst: RST, delay: D, config: Rfm69Config) -> Self {
        cs.set_high();
        rst.set_low();
        Self {
            spi,
            cs,
            rst,
            delay,
            config,
            mode: OperatingMode::Standby,
        }
    }

    pub fn config(&self) -> &Rfm69Config {
        &self.config
    }

    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    /// Reset, check the silicon, program the link and go to sleep
    pub fn init(&mut self) -> Result<(), Rfm69Error<SPI::Error>> {
        self.reset();

        let version = self.read_register(reg::VERSION)?;
        if version != CHIP_VERSION {
            return Err(Rfm69Error::UnexpectedVersion(version));
        }

        self.configure()?;
        self.sleep()
    }

    /// Pulse the reset line and wait for the chip to come up
    pub fn reset(&mut self) {
        self.rst.set_high();
        self.delay.delay_us(100);
        self.rst.set_low();
        self.delay.delay_ms(5);
        self.mode = OperatingMode::Standby;
    }

    /// Write every configuration register
    pub fn configure(&mut self) -> Result<(), Rfm69Error<SPI::Error>> {
        self.set_mode(OperatingMode::Standby)?;

        for (addr, value) in LINK_REGISTERS {
            self.write_register(addr, value)?;
        }
        self.write_register(reg::PA_LEVEL, self.config.pa_level())?;
        self.write_register(reg::RX_BW, RX_BW_SETTING)?;
        self.write_register(reg::AFC_BW, RX_BW_SETTING)?;

        let mut sync = [0u8; 8];
        sync[..2].copy_from_slice(&self.config.sync_word);
        self.write_burst(reg::SYNC_VALUE1, &sync)?;

        self.write_register(reg::PACKET_CONFIG2, self.config.packet_config2())?;
        if let Some(key) = self.config.aes_key {
            self.write_burst(reg::AES_KEY1, &key)?;
        }

        self.set_frequency(self.config.frequency_hz)?;
        self.set_bitrate(self.config.bitrate)
    }

    pub fn set_frequency(&mut self, frequency_hz: u32) -> Result<(), Rfm69Error<SPI::Error>> {
        self.config.frequency_hz = frequency_hz;
        let frf = self.config.frf();
        self.write_burst(
            reg::FRF_MSB,
            &[(frf >> 16) as u8, (frf >> 8) as u8, frf as u8],
        )
    }

    pub fn set_bitrate(&mut self, bitrate: u32) -> Result<(), Rfm69Error<SPI::Error>> {
        self.config.bitrate = bitrate;
        let divider = self.config.bitrate_divider();
        self.write_burst(reg::BITRATE_MSB, &divider.to_be_bytes())
    }

    pub fn sleep(&mut self) -> Result<(), Rfm69Error<SPI::Error>> {
        self.set_mode(OperatingMode::Sleep)
    }

    /// Switch operating mode and wait until the chip reports it ready
    pub fn set_mode(&mut self, mode: OperatingMode) -> Result<(), Rfm69Error<SPI::Error>> {
        self.write_register(reg::OP_MODE, mode.bits())?;
        self.mode = mode;

        // ModeReady is not meaningful in sleep
        if mode == OperatingMode::Sleep {
            return Ok(());
        }
        for _ in 0..MODE_READY_POLLS {
            if self.read_register(reg::IRQ_FLAGS1)? & irq1::MODE_READY != 0 {
                return Ok(());
            }
            self.delay.delay_us(MODE_READY_POLL_US);
        }
        Err(Rfm69Error::ModeTimeout)
    }

    /// Last RSSI sample in dBm
    pub fn rssi(&mut self) -> Result<i16, Rfm69Error<SPI::Error>> {
        let raw = self.read_register(reg::RSSI_VALUE)?;
        Ok(-(raw as i16) / 2)
    }

    /// Send one frame and wait for `PacketSent`
    pub fn send(&mut self, frame: &[u8]) -> Result<(), Rfm69Error<SPI::Error>> {
        if frame.len() > self.config.max_frame_len() {
            return Err(Rfm69Error::FrameTooLarge(frame.len()));
        }

        self.set_mode(OperatingMode::Standby)?;
        self.write_register(reg::IRQ_FLAGS2, irq2::FIFO_OVERRUN)?;
        self.write_fifo(frame)?;
        self.set_mode(OperatingMode::Transmit)?;

        let sent = self.poll_flags2(irq2::PACKET_SENT, self.config.tx_timeout_ms)?;
        self.set_mode(OperatingMode::Standby)?;

        if sent {
            Ok(())
        } else {
            Err(Rfm69Error::TransmitTimeout)
        }
    }

    /// Listen for up to `timeout_ms` and return the first packet
    pub fn recv(&mut self, timeout_ms: u32) -> Result<Option<Reception>, Rfm69Error<SPI::Error>> {
        self.set_mode(OperatingMode::Receive)?;

        if !self.poll_flags2(irq2::PAYLOAD_READY, timeout_ms)? {
            self.set_mode(OperatingMode::Standby)?;
            return Ok(None);
        }

        let rssi = self.rssi()?;
        self.set_mode(OperatingMode::Standby)?;
        let frame = self.read_fifo()?;
        Ok(Some(Reception { frame, rssi }))
    }

    /// Read registers `0x01..0x50` for a debug dump
    ///
    /// Slot 0 is left zero; reading the FIFO address would consume data.
    pub fn read_configuration(
        &mut self,
        regs: &mut [u8; CONFIG_REGISTERS],
    ) -> Result<(), Rfm69Error<SPI::Error>> {
        regs[0] = 0;
        self.transaction(|spi| {
            spi.write(&[reg::OP_MODE])?;
            regs[1..].fill(0);
            spi.transfer_in_place(&mut regs[1..])
        })
    }

    /// Release the bus and pins
    pub fn release(self) -> (SPI, CS, RST, D) {
        (self.spi, self.cs, self.rst, self.delay)
    }

    /// Poll `IRQ_FLAGS2` in 1 ms steps; true once any bit of `mask` is set
    fn poll_flags2(&mut self, mask: u8, timeout_ms: u32) -> Result<bool, Rfm69Error<SPI::Error>> {
        let mut waited = 0;
        loop {
            if self.read_register(reg::IRQ_FLAGS2)? & mask != 0 {
                return Ok(true);
            }
            if waited >= timeout_ms {
                return Ok(false);
            }
            self.delay.delay_ms(1);
            waited += 1;
        }
    }

    fn write_fifo(&mut self, frame: &[u8]) -> Result<(), Rfm69Error<SPI::Error>> {
        let fifo = self.config.fifo;
        self.transaction(|spi| {
            spi.write(&[reg::FIFO | WRITE])?;
            if fifo == FifoMode::RadioHead {
                // Fits in u8: frame length is checked against the FIFO
                spi.write(&[(frame.len() + RADIOHEAD_HEADER.len()) as u8])?;
                spi.write(&RADIOHEAD_HEADER)?;
            }
            spi.write(frame)
        })
    }

    fn read_fifo(&mut self) -> Result<Vec<u8, MAX_RECEPTION_LEN>, Rfm69Error<SPI::Error>> {
        let mut packet = [0u8; MAX_PACKET_LEN];
        let len = self.transaction(|spi| {
            spi.write(&[reg::FIFO])?;
            spi.transfer_in_place(&mut packet[..1])?;
            // A corrupt length byte must not run past the FIFO
            let len = (packet[0] as usize).min(MAX_PACKET_LEN - 1);
            spi.transfer_in_place(&mut packet[1..=len])?;
            Ok(len)
        })?;

        let frame = match self.config.fifo {
            FifoMode::Raw => &packet[..=len],
            FifoMode::RadioHead => {
                let skip = (1 + RADIOHEAD_HEADER.len()).min(len + 1);
                &packet[skip..=len]
            }
        };
        Vec::from_slice(frame).map_err(|_| Rfm69Error::FrameTooLarge(frame.len()))
    }

    fn read_register(&mut self, addr: u8) -> Result<u8, Rfm69Error<SPI::Error>> {
        let mut buf = [addr & !WRITE, 0];
        self.transaction(|spi| spi.transfer_in_place(&mut buf))?;
        Ok(buf[1])
    }

    fn write_register(&mut self, addr: u8, value: u8) -> Result<(), Rfm69Error<SPI::Error>> {
        self.transaction(|spi| spi.write(&[addr | WRITE, value]))
    }

    fn write_burst(&mut self, addr: u8, data: &[u8]) -> Result<(), Rfm69Error<SPI::Error>> {
        self.transaction(|spi| {
            spi.write(&[addr | WRITE])?;
            spi.write(data)
        })
    }

    /// Run `f` inside one chip-select window
    fn transaction<T>(
        &mut self,
        f: impl FnOnce(&mut SPI) -> Result<T, SPI::Error>,
    ) -> Result<T, Rfm69Error<SPI::Error>> {
        self.cs.set_low();
        let result = f(&mut self.spi).and_then(|value| self.spi.flush().map(|()| value));
        self.cs.set_high();
        result.map_err(Rfm69Error::Spi)
    }
}

impl<SPI, CS, RST, D> RadioTransport for Rfm69<SPI, CS, RST, D>
where
    SPI: SpiBus,
    CS: OutputPin,
    RST: OutputPin,
    D: DelayNs,
{
    fn transmit(&mut self, frame: &[u8]) -> Result<(), RadioError> {
        self.send(frame).map_err(RadioError::from)
    }

    fn receive(&mut self, timeout_ms: u32) -> Result<Option<Reception>, RadioError> {
        self.recv(timeout_ms).map_err(RadioError::from)
    }
}
