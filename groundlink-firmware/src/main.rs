//! GroundLink - Rover Ground Station Firmware
//!
//! Firmware for the Adafruit Feather RP2040 RFM69. Listens for rover
//! telemetry, acknowledges every frame with the ground's time, and shows
//! a running link summary on an SSD1306 OLED.
//!
//! All deployment settings come from ground.toml, embedded at build time.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_time::{Delay, Timer};
use portable_atomic::Ordering;
use {defmt_rtt as _, panic_probe as _};

use groundlink_core::config::GroundConfig;
use groundlink_core::traits::{RadioError, StatusDisplay, WallClock};
use groundlink_core::{LinkSession, Supervisor};
use groundlink_drivers::display::Ssd1306;
use groundlink_drivers::radio::rfm69::CONFIG_REGISTERS;
use groundlink_drivers::radio::{Rfm69, Rfm69Config};
use groundlink_hal::i2c::I2cConfig;
use groundlink_hal::spi::SpiConfig;
use groundlink_hal_rp2040::{DisplayBus, DisplayPins, RadioPins, RtcClock};

use crate::channels::{EXCHANGES, LINK_UP};
use crate::tasks::{LinkSupervisor, Radio};

mod channels;
mod config;
mod tasks;

/// Seconds between heartbeat log lines
///
/// The link task runs each cycle with a blocking delay, so no other task
/// runs until the cycle ends. Heartbeats and display updates can therefore
/// lag by up to `GroundConfig::max_cycle_ms`, about 14.5 s with the shipped
/// ground.toml.
const HEARTBEAT_SECS: u64 = 60;

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("GroundLink firmware starting...");

    // Initialize RP2040 peripherals
    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let config = config::load();
    config::log_summary(&config);

    // Wall clock for acknowledgment timestamps
    let mut clock = RtcClock::new(p.RTC, config.clock.start);
    match clock.set(config.clock.start) {
        Ok(()) => info!("RTC started at {:?}", clock.now()),
        Err(e) => warn!("RTC not set ({:?}), acks carry the start time", e),
    }

    // Status display (optional)
    let display = if config.display.enabled {
        let bus = DisplayPins {
            i2c: p.I2C1,
            sda: p.PIN_2,
            scl: p.PIN_3,
        }
        .into_bus(&I2cConfig::FAST);
        init_display(bus, &config)
    } else {
        info!("Display disabled");
        None
    };

    // Radio
    let bus = RadioPins {
        spi: p.SPI1,
        sck: p.PIN_14,
        mosi: p.PIN_15,
        miso: p.PIN_8,
        cs: p.PIN_16,
        rst: p.PIN_17,
    }
    .into_bus(&SpiConfig::RFM69);

    let radio_config = Rfm69Config::new(&config.radio, &config.link);
    let mut radio: Radio = Rfm69::new(bus.spi, bus.cs, bus.rst, Delay, radio_config);
    if let Err(e) = radio.init() {
        halt(RadioError::from(e)).await;
    }
    info!("RFM69 initialized");
    dump_registers(&mut radio);

    let codec_limit = config.link.codec().max_len();
    if codec_limit > radio_config.max_frame_len() {
        warn!(
            "max_frame_len {} exceeds the radio FIFO ({}), longer acks fail to send",
            codec_limit,
            radio_config.max_frame_len()
        );
    }

    let max_cycle_ms = config.max_cycle_ms();
    info!("Longest link cycle: {}ms", max_cycle_ms);
    if u64::from(max_cycle_ms) >= HEARTBEAT_SECS * 1000 {
        warn!("Link cycles can outlast the {}s heartbeat interval", HEARTBEAT_SECS);
    }

    let session = LinkSession::new(radio, clock, Delay, config.session_config());
    let supervisor: LinkSupervisor = Supervisor::new(session, config.recovery.policy());

    if let Some(oled) = display {
        spawner.spawn(tasks::display_task(oled)).unwrap();
    }
    spawner.spawn(tasks::link_task(supervisor)).unwrap();

    info!("All tasks spawned, ground station running");

    loop {
        Timer::after_secs(HEARTBEAT_SECS).await;
        if LINK_UP.load(Ordering::Relaxed) {
            trace!(
                "Heartbeat: {} exchanges",
                EXCHANGES.load(Ordering::Relaxed)
            );
        } else {
            warn!(
                "Heartbeat: link down after {} exchanges",
                EXCHANGES.load(Ordering::Relaxed)
            );
        }
    }
}

/// Bring up the OLED and show the splash text
fn init_display(bus: DisplayBus, config: &GroundConfig) -> Option<Ssd1306<DisplayBus>> {
    let mut oled = Ssd1306::new(bus, config.display.i2c_address);
    if let Err(e) = oled.init() {
        warn!(
            "No display at {=u8:#x}: {}, continuing without it",
            config.display.i2c_address,
            Debug2Format(&e)
        );
        return None;
    }

    if let Err(e) = oled.show(&config.display.splash) {
        warn!("Splash failed: {:?}", e);
    }
    info!("Display initialized");
    Some(oled)
}

/// Log the transceiver's configuration registers
fn dump_registers(radio: &mut Radio) {
    let mut regs = [0u8; CONFIG_REGISTERS];
    match radio.read_configuration(&mut regs) {
        Ok(()) => {
            for (row, chunk) in regs.chunks(16).enumerate() {
                debug!("RFM69 {=u8:#04x}: {=[u8]:#04x}", (row * 16) as u8, chunk);
            }
        }
        Err(e) => warn!("Register dump failed: {:?}", RadioError::from(e)),
    }
}

/// Park the firmware after a fatal radio error
async fn halt(error: RadioError) -> ! {
    error!("RFM69 init failed: {:?}", error);
    loop {
        Timer::after_secs(HEARTBEAT_SECS).await;
        error!("Radio unavailable, reset the board");
    }
}
