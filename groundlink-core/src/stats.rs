//! Session statistics
//!
//! Running means over the telemetry received in one session. Nothing here
//! is persisted.
//!
//! A reading of zero means "unavailable" for both signal strengths and is
//! left out of the respective mean. A genuine 0 dBm reading is therefore
//! indistinguishable from a missing one.

use core::fmt::Write;

use heapless::String;

use groundlink_protocol::Telemetry;

/// Capacity of the status line
pub const STATUS_LINE_LEN: usize = 40;

/// Incremental arithmetic mean
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RunningMean {
    count: u32,
    mean: f32,
}

impl RunningMean {
    pub const fn new() -> Self {
        Self {
            count: 0,
            mean: 0.0,
        }
    }

    /// Fold one sample into the mean
    pub fn update(&mut self, sample: f32) {
        self.count = self.count.saturating_add(1);
        self.mean += (sample - self.mean) / self.count as f32;
    }

    /// Number of samples seen
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Current mean, or `None` before the first sample
    pub fn value(&self) -> Option<f32> {
        if self.count == 0 {
            None
        } else {
            Some(self.mean)
        }
    }
}

/// Per-session link statistics
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SessionStats {
    messages: u32,
    ground_rssi: RunningMean,
    rover_signal: RunningMean,
    rover_retries: RunningMean,
}

impl SessionStats {
    pub const fn new() -> Self {
        Self {
            messages: 0,
            ground_rssi: RunningMean::new(),
            rover_signal: RunningMean::new(),
            rover_retries: RunningMean::new(),
        }
    }

    /// Record one decoded Telemetry and the RSSI it was received at
    pub fn record_telemetry(&mut self, rssi: i16, telemetry: &Telemetry) {
        self.record(rssi, telemetry.signal_strength, telemetry.reported_retries());
    }

    /// Record one message's raw readings
    pub fn record(&mut self, ground_rssi: i16, rover_signal: i16, rover_retries: u16) {
        self.messages = self.messages.saturating_add(1);
        if ground_rssi != 0 {
            self.ground_rssi.update(ground_rssi as f32);
        }
        if rover_signal != 0 {
            self.rover_signal.update(rover_signal as f32);
        }
        self.rover_retries.update(rover_retries as f32);
    }

    /// Telemetry messages recorded
    pub fn messages(&self) -> u32 {
        self.messages
    }

    /// Mean ground-side RSSI over non-zero readings
    pub fn mean_ground_rssi(&self) -> Option<f32> {
        self.ground_rssi.value()
    }

    /// Mean rover-reported signal strength over non-zero readings
    pub fn mean_rover_signal(&self) -> Option<f32> {
        self.rover_signal.value()
    }

    /// Mean rover retry count over every message
    pub fn mean_rover_retries(&self) -> Option<f32> {
        self.rover_retries.value()
    }

    /// Compact one-line summary for the status display
    ///
    /// Example: `RX 12 G-70 R-73 T0.5`
    pub fn status_line(&self) -> String<STATUS_LINE_LEN> {
        let mut line = String::new();
        // Longest possible line is 38 characters
        let _ = write!(line, "RX {}", self.messages);
        push_mean(&mut line, " G", self.mean_ground_rssi());
        push_mean(&mut line, " R", self.mean_rover_signal());
        if let Some(retries) = self.mean_rover_retries() {
            let tenths = round(retries * 10.0);
            let _ = write!(line, " T{}.{}", tenths / 10, tenths % 10);
        }
        line
    }
}

fn push_mean(line: &mut String<STATUS_LINE_LEN>, label: &str, mean: Option<f32>) {
    let _ = match mean {
        Some(m) => write!(line, "{}{}", label, round(m)),
        None => write!(line, "{}--", label),
    };
}

/// Round half away from zero
fn round(x: f32) -> i32 {
    if x >= 0.0 {
        (x + 0.5) as i32
    } else {
        (x - 0.5) as i32
    }
}
