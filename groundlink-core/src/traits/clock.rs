//! Ground wall clock

use groundlink_protocol::Timestamp;

/// Source of the ground station's current time
///
/// Outbound acknowledgments carry this value, so implementations must return
/// the wire form: year counted from 2000.
pub trait WallClock {
    fn now(&mut self) -> Timestamp;
}

/// Day of the week for `ts`, 0 = Sunday
///
/// RTC peripherals that track the weekday need it when the date is set.
pub fn weekday(ts: &Timestamp) -> u8 {
    const MONTH_OFFSET: [u32; 12] = [0, 3, 2, 5, 0, 3, 5, 1, 4, 6, 2, 4];

    let month = ts.month.clamp(1, 12) as usize;
    let mut year = 2000 + ts.year as u32;
    if month < 3 {
        year -= 1;
    }
    let days = year + year / 4 - year / 100 + year / 400 + MONTH_OFFSET[month - 1] + ts.day as u32;
    (days % 7) as u8
}
