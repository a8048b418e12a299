//! Configuration types and parsing
//!
//! Deployment settings are written as a small TOML file embedded in the
//! firmware image and parsed by a no_std parser at boot.

pub mod parse;
pub mod types;

pub use parse::{parse_config, ParseError};
pub use types::*;
