//! Inter-task communication
//!
//! The link task owns the radio and publishes what the display should show.
//! Only the latest update matters, so a signal replaces any unread one.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use portable_atomic::{AtomicBool, AtomicU32};

use groundlink_core::{ErrorKind, SessionStats};

/// Content for the status display
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayUpdate {
    /// Statistics after the latest cycle
    Status(SessionStats),
    /// The supervisor stopped the link
    LinkDown(ErrorKind),
}

/// Latest display content (updated by the link task)
pub static DISPLAY_UPDATE: Signal<CriticalSectionRawMutex, DisplayUpdate> = Signal::new();

/// Set while the supervisor keeps the link running
pub static LINK_UP: AtomicBool = AtomicBool::new(false);

/// Completed exchanges since boot (read by the heartbeat)
pub static EXCHANGES: AtomicU32 = AtomicU32::new(0);
