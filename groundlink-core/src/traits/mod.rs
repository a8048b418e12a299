//! Hardware abstraction traits
//!
//! These traits define the interface between the link logic and the
//! board-specific radio, display and clock implementations.

pub mod clock;
pub mod display;
pub mod radio;

pub use clock::{weekday, WallClock};
pub use display::{DisplayError, StatusDisplay};
pub use radio::{RadioError, RadioTransport, Reception, MAX_RECEPTION_LEN};
