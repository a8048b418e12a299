//! Events that drive the link state machine

/// Events that can trigger state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkEvent {
    /// Session loop started a receive
    Listen,
    /// A frame arrived within the timeout
    FrameReceived,
    /// Receive ended without a frame, or the transport failed
    ReceiveFailed,
    /// Frame decoded as Telemetry
    TelemetryDecoded,
    /// Frame was malformed or of a kind the ground does not handle
    FrameRejected,
    /// Acknowledgment left the radio
    AckSent,
    /// Acknowledgment could not be encoded or sent
    AckFailed,
}
