//! Packet radio drivers

pub mod rfm69;

pub use rfm69::{FifoMode, OperatingMode, Rfm69, Rfm69Config, Rfm69Error};
