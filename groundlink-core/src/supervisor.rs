//! Supervisor and recovery policy
//!
//! The supervisor runs the link session one cycle at a time and decides,
//! per error kind, whether to drop the cycle and keep going or to stop the
//! link. Transmit retries happen inside the session; by the time a transmit
//! failure reaches the supervisor the retries are spent.

use embedded_hal::delay::DelayNs;

use crate::session::{AckRetry, ErrorKind, Exchange, LinkError, LinkSession};
use crate::stats::SessionStats;
use crate::traits::{RadioTransport, WallClock};

/// What to do with a failed cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Decision {
    /// Discard the cycle and listen again
    Continue,
    /// Stop the link
    Escalate,
}

/// Recovery behaviour per error kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RecoveryPolicy {
    /// Drop undecodable frames instead of stopping
    pub drop_malformed: bool,
    /// Keep listening through timeouts until the rover is first heard
    pub wait_for_first_contact: bool,
    /// Consecutive timeouts after contact that stop the link
    ///
    /// Zero stops on the first timeout.
    pub max_silent_timeouts: u8,
    pub ack_retry: AckRetry,
}

impl RecoveryPolicy {
    /// Stop on every error except a frame of the wrong kind
    pub const fn strict() -> Self {
        Self {
            drop_malformed: false,
            wait_for_first_contact: false,
            max_silent_timeouts: 0,
            ack_retry: AckRetry::NONE,
        }
    }

    /// Decide how to handle `kind`
    ///
    /// `contact` is whether the rover has completed an exchange yet and
    /// `silent` the number of consecutive timeouts including this one.
    pub fn decide(&self, kind: ErrorKind, contact: bool, silent: u8) -> Decision {
        match kind {
            ErrorKind::UnexpectedMessageKind => Decision::Continue,
            ErrorKind::MalformedPayload if self.drop_malformed => Decision::Continue,
            ErrorKind::MalformedPayload => Decision::Escalate,
            ErrorKind::TransportTimeout if !contact && self.wait_for_first_contact => {
                Decision::Continue
            }
            ErrorKind::TransportTimeout if silent < self.max_silent_timeouts => Decision::Continue,
            ErrorKind::TransportTimeout => Decision::Escalate,
            ErrorKind::TransmitFailure | ErrorKind::OversizedMessage => Decision::Escalate,
        }
    }
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self {
            drop_malformed: true,
            wait_for_first_contact: true,
            max_silent_timeouts: 3,
            ack_retry: AckRetry {
                max_retries: 3,
                backoff_base_ms: 50,
                backoff_max_ms: 400,
            },
        }
    }
}

/// Result of one supervised cycle that did not stop the link
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CycleReport {
    /// Telemetry received and acknowledged
    Acknowledged(Exchange),
    /// Frame discarded
    Dropped(LinkError),
    /// Receive timed out; `waiting` is true before first contact
    Silent { consecutive: u8, waiting: bool },
}

/// Runs the link session under a recovery policy
pub struct Supervisor<R, C, D> {
    session: LinkSession<R, C, D>,
    policy: RecoveryPolicy,
    contact: bool,
    silent: u8,
}

impl<R, C, D> Supervisor<R, C, D>
where
    R: RadioTransport,
    C: WallClock,
    D: DelayNs,
{
    /// Take over `session`; the policy's retry settings replace the session's
    pub fn new(mut session: LinkSession<R, C, D>, policy: RecoveryPolicy) -> Self {
        session.set_ack_retry(policy.ack_retry);
        Self {
            session,
            policy,
            contact: false,
            silent: 0,
        }
    }

    pub fn policy(&self) -> &RecoveryPolicy {
        &self.policy
    }

    pub fn session(&self) -> &LinkSession<R, C, D> {
        &self.session
    }

    pub fn stats(&self) -> &SessionStats {
        self.session.stats()
    }

    /// Whether the rover has completed at least one exchange
    pub fn has_contact(&self) -> bool {
        self.contact
    }

    /// Run one cycle
    ///
    /// Returns `Err` only when the policy escalates.
    pub fn run_cycle(&mut self) -> Result<CycleReport, LinkError> {
        let error = match self.session.step() {
            Ok(exchange) => {
                self.contact = true;
                self.silent = 0;
                return Ok(CycleReport::Acknowledged(exchange));
            }
            Err(e) => e,
        };

        let kind = error.kind();
        if kind == ErrorKind::TransportTimeout {
            self.silent = self.silent.saturating_add(1);
        } else {
            // Something arrived, so the channel is not silent
            self.silent = 0;
        }

        match self.policy.decide(kind, self.contact, self.silent) {
            Decision::Escalate => Err(error),
            Decision::Continue if kind == ErrorKind::TransportTimeout => Ok(CycleReport::Silent {
                consecutive: self.silent,
                waiting: !self.contact,
            }),
            Decision::Continue => Ok(CycleReport::Dropped(error)),
        }
    }
}
