//! Hardware driver implementations
//!
//! This crate provides concrete implementations of the traits defined
//! in groundlink-core, written against the groundlink-hal bus traits:
//!
//! - Radio transport (RFM69 packet transceiver over SPI)
//! - Status display (SSD1306 128x64 OLED over I2C)

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod display;
pub mod radio;
