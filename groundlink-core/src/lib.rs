//! Board-agnostic core logic for the ground station
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Transport, display and clock traits
//! - Link session state machine (receive, dispatch, turnaround, acknowledge)
//! - Session statistics
//! - Supervisor and recovery policy
//! - Configuration types and the embedded TOML parser

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod config;
pub mod session;
pub mod stats;
pub mod supervisor;
pub mod traits;

pub use session::{ErrorKind, Exchange, LinkError, LinkSession, LinkState, SessionConfig};
pub use stats::SessionStats;
pub use supervisor::{CycleReport, RecoveryPolicy, Supervisor};
