//! RTC-backed wall clock
//!
//! The RP2040 RTC counts calendar time from whatever it was last set to.
//! Without a battery-backed source the firmware seeds it from the
//! configured start time at boot.

use embassy_rp::peripherals::RTC;
use embassy_rp::rtc::{DateTime, DayOfWeek, Rtc};
use embassy_rp::Peri;

use groundlink_core::traits::{weekday, WallClock};
use groundlink_protocol::Timestamp;

/// Errors from the RTC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockError {
    /// Start time rejected by the peripheral
    InvalidStart,
}

/// [`WallClock`] reading the on-chip RTC
pub struct RtcClock {
    rtc: Rtc<'static, RTC>,
    /// Returned if the RTC cannot be read
    fallback: Timestamp,
}

impl RtcClock {
    /// Take the RTC; it reports `fallback` until [`set`](Self::set) succeeds
    pub fn new(rtc: Peri<'static, RTC>, fallback: Timestamp) -> Self {
        Self {
            rtc: Rtc::new(rtc),
            fallback,
        }
    }

    /// Set the calendar time and start counting
    pub fn set(&mut self, start: Timestamp) -> Result<(), ClockError> {
        self.rtc
            .set_datetime(to_datetime(&start))
            .map_err(|_| ClockError::InvalidStart)?;
        self.fallback = start;
        Ok(())
    }
}

impl WallClock for RtcClock {
    fn now(&mut self) -> Timestamp {
        match self.rtc.now() {
            Ok(dt) => {
                let ts = from_datetime(&dt);
                self.fallback = ts;
                ts
            }
            // Not running yet; report the last good reading
            Err(_) => self.fallback,
        }
    }
}

fn to_datetime(ts: &Timestamp) -> DateTime {
    let day_of_week = match weekday(ts) {
        0 => DayOfWeek::Sunday,
        1 => DayOfWeek::Monday,
        2 => DayOfWeek::Tuesday,
        3 => DayOfWeek::Wednesday,
        4 => DayOfWeek::Thursday,
        5 => DayOfWeek::Friday,
        _ => DayOfWeek::Saturday,
    };
    DateTime {
        year: 2000 + ts.year as u16,
        month: ts.month,
        day: ts.day,
        day_of_week,
        hour: ts.hour,
        minute: ts.minute,
        second: ts.second,
    }
}

fn from_datetime(dt: &DateTime) -> Timestamp {
    Timestamp::new(
        dt.year.saturating_sub(2000).min(u8::MAX as u16) as u8,
        dt.month,
        dt.day,
        dt.hour,
        dt.minute,
        dt.second,
    )
}
