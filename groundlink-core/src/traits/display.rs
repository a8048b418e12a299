//! Status display trait

use core::fmt::Write;

use heapless::String;

use crate::session::ErrorKind;
use crate::stats::SessionStats;

/// Errors that can occur while updating the display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayError {
    /// I2C transfer failed
    Bus,
    /// Text could not be rendered
    Render,
}

/// Single-line operator display
pub trait StatusDisplay {
    /// Replace the shown status line
    fn show(&mut self, line: &str) -> Result<(), DisplayError>;

    /// Show the compact statistics summary
    fn show_stats(&mut self, stats: &SessionStats) -> Result<(), DisplayError> {
        self.show(&stats.status_line())
    }

    /// Show the error that stopped the link
    fn show_error(&mut self, kind: ErrorKind) -> Result<(), DisplayError> {
        let mut line: String<32> = String::new();
        // Capacity covers the longest kind name
        let _ = write!(line, "LINK DOWN: {}", kind.label());
        self.show(&line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Capture(std::vec::Vec<std::string::String>);

    impl StatusDisplay for Capture {
        fn show(&mut self, line: &str) -> Result<(), DisplayError> {
            self.0.push(line.into());
            Ok(())
        }
    }

    #[test]
    fn test_show_error_line() {
        let mut display = Capture::default();
        display.show_error(ErrorKind::TransportTimeout).unwrap();
        assert_eq!(display.0, ["LINK DOWN: TIMEOUT"]);
    }

    #[test]
    fn test_show_stats_uses_status_line() {
        let mut display = Capture::default();
        let stats = SessionStats::new();
        display.show_stats(&stats).unwrap();
        assert_eq!(display.0[0], stats.status_line().as_str());
    }
}
