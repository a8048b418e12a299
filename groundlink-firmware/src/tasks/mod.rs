//! Embassy async tasks
//!
//! The link task owns the radio; the display task owns the I2C bus. They
//! communicate through the signals in [`crate::channels`].

pub mod display;
pub mod link;

pub use display::display_task;
pub use link::{link_task, LinkSupervisor, Radio};
