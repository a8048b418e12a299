//! Link errors and their classification

use groundlink_protocol::FrameError;

use crate::traits::RadioError;

/// Error taxonomy used for recovery decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorKind {
    /// No frame within the receive window
    TransportTimeout,
    /// Outbound frame exceeds the configured maximum
    OversizedMessage,
    /// Frame or payload failed to decode
    MalformedPayload,
    /// Frame of a kind the ground does not handle
    UnexpectedMessageKind,
    /// Transport reported a failure
    TransmitFailure,
}

impl ErrorKind {
    /// Short label for the status display
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::TransportTimeout => "TIMEOUT",
            ErrorKind::OversizedMessage => "OVERSIZE",
            ErrorKind::MalformedPayload => "MALFORMED",
            ErrorKind::UnexpectedMessageKind => "UNEXPECTED",
            ErrorKind::TransmitFailure => "TX FAILURE",
        }
    }
}

/// Errors returned by one link session cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// Nothing received within `waited_ms`
    Timeout { waited_ms: u32 },
    /// Transport failed while receiving
    Receive(RadioError),
    /// Received frame could not be decoded
    Malformed(FrameError),
    /// Received a known or unknown kind other than Telemetry
    Unexpected { tag: u8 },
    /// Acknowledgment would exceed the frame limit
    Oversized { len: usize, max: usize },
    /// Acknowledgment transmit failed on every attempt
    Transmit { error: RadioError, attempts: u16 },
}

impl LinkError {
    /// Classify for the recovery policy
    pub fn kind(&self) -> ErrorKind {
        match self {
            LinkError::Timeout { .. } => ErrorKind::TransportTimeout,
            LinkError::Receive(_) | LinkError::Transmit { .. } => ErrorKind::TransmitFailure,
            LinkError::Malformed(_) => ErrorKind::MalformedPayload,
            LinkError::Unexpected { .. } => ErrorKind::UnexpectedMessageKind,
            LinkError::Oversized { .. } => ErrorKind::OversizedMessage,
        }
    }
}

impl From<FrameError> for LinkError {
    fn from(e: FrameError) -> Self {
        match e {
            FrameError::Oversized { len, max } => LinkError::Oversized { len, max },
            FrameError::UnknownTag(tag) => LinkError::Unexpected { tag },
            other => LinkError::Malformed(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groundlink_protocol::CodecError;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            LinkError::Timeout { waited_ms: 10_000 }.kind(),
            ErrorKind::TransportTimeout
        );
        assert_eq!(
            LinkError::Receive(RadioError::Bus).kind(),
            ErrorKind::TransmitFailure
        );
        assert_eq!(
            LinkError::Unexpected { tag: 9 }.kind(),
            ErrorKind::UnexpectedMessageKind
        );
    }

    #[test]
    fn test_from_frame_error() {
        assert_eq!(
            LinkError::from(FrameError::Oversized { len: 70, max: 64 }),
            LinkError::Oversized { len: 70, max: 64 }
        );
        assert_eq!(
            LinkError::from(FrameError::UnknownTag(255)).kind(),
            ErrorKind::UnexpectedMessageKind
        );
        assert_eq!(
            LinkError::from(FrameError::Codec(CodecError::TrailingBytes(1))).kind(),
            ErrorKind::MalformedPayload
        );
    }
}
