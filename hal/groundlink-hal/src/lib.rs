//! GroundLink Hardware Abstraction Layer
//!
//! This crate defines the bus and pin traits the ground station drivers are
//! written against. Chip-specific crates implement them, either directly or
//! through the [`eh`] adapters over `embedded-hal` 1.0 peripherals.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  groundlink-drivers (RFM69, SSD1306)    │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  groundlink-hal (this crate - traits)   │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  groundlink-hal-rp2040                  │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::OutputPin`] - Chip select and reset lines
//! - [`i2c::I2cBus`] - I2C bus operations
//! - [`spi::SpiBus`] - SPI bus operations

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod eh;
pub mod gpio;
pub mod i2c;
pub mod spi;

// Re-export key traits at crate root for convenience
pub use gpio::OutputPin;
pub use i2c::I2cBus;
pub use spi::SpiBus;
