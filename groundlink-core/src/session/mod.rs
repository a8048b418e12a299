//! Link session
//!
//! One telemetry/acknowledgment exchange per cycle over a half-duplex
//! radio. The state machine is explicit, finite, and deterministic; the
//! session drives it and owns the transport, clock and statistics.

pub mod error;
pub mod events;
pub mod link;
pub mod machine;

pub use error::{ErrorKind, LinkError};
pub use events::LinkEvent;
pub use link::{AckRetry, Exchange, LinkSession, SessionConfig};
pub use machine::LinkState;
