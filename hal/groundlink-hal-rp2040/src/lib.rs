//! RP2040-specific HAL for the ground station firmware
//!
//! This crate binds the shared `groundlink-hal` traits to embassy-rp
//! peripherals and provides RP2040-specific functionality:
//!
//! - Board pin map and bus bring-up for the Feather RP2040 RFM69
//! - RTC-backed wall clock

#![no_std]

pub mod board;
pub mod rtc;

pub use board::{DisplayBus, DisplayPins, OutputLine, RadioBus, RadioPins, RadioSpi};
pub use rtc::{ClockError, RtcClock};
