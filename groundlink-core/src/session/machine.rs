//! Link state machine definition

use super::events::LinkEvent;

/// Link session states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkState {
    /// Between cycles
    #[default]
    Idle,
    /// Blocked in receive, waiting for the rover
    AwaitingTelemetry,
    /// Frame in hand, routing by tag
    Dispatching,
    /// Turnaround delay and acknowledgment transmit
    Acknowledging,
}

impl LinkState {
    /// Check if the radio may transmit in this state
    pub fn may_transmit(&self) -> bool {
        matches!(self, LinkState::Acknowledging)
    }

    /// Process an event and return the next state
    pub fn transition(self, event: LinkEvent) -> Self {
        use LinkEvent::*;
        use LinkState::*;

        match (self, event) {
            (Idle, Listen) => AwaitingTelemetry,

            (AwaitingTelemetry, FrameReceived) => Dispatching,
            (AwaitingTelemetry, ReceiveFailed) => Idle,

            (Dispatching, TelemetryDecoded) => Acknowledging,
            (Dispatching, FrameRejected) => Idle,

            (Acknowledging, AckSent) => Idle,
            (Acknowledging, AckFailed) => Idle,

            // Default: stay in current state
            _ => self,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_exchange() {
        let state = LinkState::Idle
            .transition(LinkEvent::Listen)
            .transition(LinkEvent::FrameReceived)
            .transition(LinkEvent::TelemetryDecoded);
        assert_eq!(state, LinkState::Acknowledging);
        assert!(state.may_transmit());
        assert_eq!(state.transition(LinkEvent::AckSent), LinkState::Idle);
    }

    #[test]
    fn test_failures_return_to_idle() {
        assert_eq!(
            LinkState::AwaitingTelemetry.transition(LinkEvent::ReceiveFailed),
            LinkState::Idle
        );
        assert_eq!(
            LinkState::Dispatching.transition(LinkEvent::FrameRejected),
            LinkState::Idle
        );
        assert_eq!(
            LinkState::Acknowledging.transition(LinkEvent::AckFailed),
            LinkState::Idle
        );
    }

    #[test]
    fn test_no_transmit_outside_acknowledging() {
        let states = [
            LinkState::Idle,
            LinkState::AwaitingTelemetry,
            LinkState::Dispatching,
        ];

        for state in states {
            assert!(!state.may_transmit());
        }
    }

    #[test]
    fn test_ignored_events_keep_state() {
        assert_eq!(LinkState::Idle.transition(LinkEvent::AckSent), LinkState::Idle);
        assert_eq!(
            LinkState::AwaitingTelemetry.transition(LinkEvent::TelemetryDecoded),
            LinkState::AwaitingTelemetry
        );
    }
}
