//! Telemetry/acknowledgment exchange
//!
//! Each call to [`LinkSession::step`] runs one cycle:
//!
//! 1. Receive with the telemetry timeout
//! 2. Split the frame and route by tag; only Telemetry is handled
//! 3. Record statistics
//! 4. Wait the turnaround delay so the rover can switch to receive
//! 5. Encode and transmit a TelemetryAck stamped with the ground's clock
//!
//! The ground never transmits while it is waiting for the rover.

use embedded_hal::delay::DelayNs;

use groundlink_protocol::{
    FrameCodec, Message, MessageKind, Telemetry, TelemetryAck, WireMessage,
};

use super::error::LinkError;
use super::events::LinkEvent;
use super::machine::LinkState;
use crate::stats::SessionStats;
use crate::traits::{RadioTransport, WallClock};

/// Default wait for rover telemetry
pub const DEFAULT_TELEMETRY_TIMEOUT_MS: u32 = 10_000;

/// Default wait for the radio to report an acknowledgment sent
pub const DEFAULT_TX_TIMEOUT_MS: u32 = 1_000;

/// Default pause between receive and transmit
pub const DEFAULT_TURNAROUND_MS: u32 = 100;

/// Local retry of a failed acknowledgment transmit
///
/// This only repeats a send the transport rejected. The ground never waits
/// for the rover to confirm an acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AckRetry {
    /// Extra attempts after the first
    pub max_retries: u8,
    pub backoff_base_ms: u32,
    pub backoff_max_ms: u32,
}

impl AckRetry {
    /// Single attempt, no retry
    pub const NONE: Self = Self {
        max_retries: 0,
        backoff_base_ms: 0,
        backoff_max_ms: 0,
    };

    /// Pause before retry number `attempt + 1`
    ///
    /// `base * 2^attempt`, capped at `backoff_max_ms`.
    pub fn backoff_ms(&self, attempt: u8) -> u32 {
        let factor = 1u32.checked_shl(attempt as u32).unwrap_or(u32::MAX);
        self.backoff_base_ms
            .saturating_mul(factor)
            .min(self.backoff_max_ms)
    }
}

impl Default for AckRetry {
    fn default() -> Self {
        Self::NONE
    }
}

/// Session timing and framing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SessionConfig {
    pub telemetry_timeout_ms: u32,
    pub turnaround_ms: u32,
    pub codec: FrameCodec,
    pub ack_retry: AckRetry,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            telemetry_timeout_ms: DEFAULT_TELEMETRY_TIMEOUT_MS,
            turnaround_ms: DEFAULT_TURNAROUND_MS,
            codec: FrameCodec::default(),
            ack_retry: AckRetry::NONE,
        }
    }
}

/// One completed exchange
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Exchange {
    pub telemetry: Telemetry,
    /// Ground-side RSSI of the telemetry frame
    pub rssi: i16,
    pub ack: TelemetryAck,
    /// Transmit attempts the acknowledgment took
    pub attempts: u16,
}

/// Ground side of the rover link
pub struct LinkSession<R, C, D> {
    radio: R,
    clock: C,
    delay: D,
    config: SessionConfig,
    state: LinkState,
    stats: SessionStats,
}

impl<R, C, D> LinkSession<R, C, D>
where
    R: RadioTransport,
    C: WallClock,
    D: DelayNs,
{
    pub fn new(radio: R, clock: C, delay: D, config: SessionConfig) -> Self {
        Self {
            radio,
            clock,
            delay,
            config,
            state: LinkState::Idle,
            stats: SessionStats::new(),
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    pub fn set_ack_retry(&mut self, retry: AckRetry) {
        self.config.ack_retry = retry;
    }

    /// Give back the transport, clock and delay
    pub fn release(self) -> (R, C, D) {
        (self.radio, self.clock, self.delay)
    }

    fn apply(&mut self, event: LinkEvent) {
        self.state = self.state.transition(event);
    }

    /// Run one receive/acknowledge cycle
    ///
    /// Always returns with the session back in [`LinkState::Idle`].
    pub fn step(&mut self) -> Result<Exchange, LinkError> {
        self.apply(LinkEvent::Listen);

        let timeout = self.config.telemetry_timeout_ms;
        let reception = match self.radio.receive(timeout) {
            Ok(Some(reception)) => reception,
            Ok(None) => {
                self.apply(LinkEvent::ReceiveFailed);
                return Err(LinkError::Timeout { waited_ms: timeout });
            }
            Err(e) => {
                self.apply(LinkEvent::ReceiveFailed);
                return Err(LinkError::Receive(e));
            }
        };
        self.apply(LinkEvent::FrameReceived);

        let telemetry = match self.dispatch(&reception.frame) {
            Ok(telemetry) => telemetry,
            Err(e) => {
                self.apply(LinkEvent::FrameRejected);
                return Err(e);
            }
        };
        self.stats.record_telemetry(reception.rssi, &telemetry);
        self.apply(LinkEvent::TelemetryDecoded);

        match self.acknowledge() {
            Ok((ack, attempts)) => {
                self.apply(LinkEvent::AckSent);
                Ok(Exchange {
                    telemetry,
                    rssi: reception.rssi,
                    ack,
                    attempts,
                })
            }
            Err(e) => {
                self.apply(LinkEvent::AckFailed);
                Err(e)
            }
        }
    }

    /// Route a received frame by its tag
    fn dispatch(&self, frame: &[u8]) -> Result<Telemetry, LinkError> {
        let raw = self.config.codec.decode(frame)?;
        match raw.kind() {
            Some(MessageKind::Telemetry) => Telemetry::deserialize(raw.payload)
                .map_err(|e| LinkError::Malformed(e.into())),
            _ => Err(LinkError::Unexpected { tag: raw.tag }),
        }
    }

    fn acknowledge(&mut self) -> Result<(TelemetryAck, u16), LinkError> {
        debug_assert!(self.state.may_transmit());
        self.delay.delay_ms(self.config.turnaround_ms);

        let ack = TelemetryAck {
            timestamp: self.clock.now(),
            ack: true,
            command_waiting: false,
        };
        let frame = self.config.codec.encode_to_vec(&Message::TelemetryAck(ack))?;
        let attempts = self.transmit_with_retry(&frame)?;

        Ok((ack, attempts))
    }

    /// Returns the number of attempts used
    ///
    /// Counted in `u16` so the first send plus 255 retries still fits.
    fn transmit_with_retry(&mut self, frame: &[u8]) -> Result<u16, LinkError> {
        let retry = self.config.ack_retry;
        let mut retries: u8 = 0;

        loop {
            let attempts = u16::from(retries) + 1;
            match self.radio.transmit(frame) {
                Ok(()) => return Ok(attempts),
                Err(error) if retries >= retry.max_retries => {
                    return Err(LinkError::Transmit { error, attempts });
                }
                Err(_) => {
                    self.delay.delay_ms(retry.backoff_ms(retries));
                    retries += 1;
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::traits::{RadioError, Reception};
    use groundlink_protocol::{
        CommandAck, HeaderMode, LocationFix, Timestamp, MAX_FRAME_LEN,
    };
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;
    use std::vec::Vec;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Op {
        Receive(u32),
        Transmit(Vec<u8>),
        Delay(u32),
    }

    pub type Journal = Rc<RefCell<Vec<Op>>>;

    pub struct MockRadio {
        pub journal: Journal,
        pub inbound: VecDeque<Result<Option<Reception>, RadioError>>,
        pub tx_results: VecDeque<Result<(), RadioError>>,
    }

    impl MockRadio {
        pub fn new(journal: &Journal) -> Self {
            Self {
                journal: journal.clone(),
                inbound: VecDeque::new(),
                tx_results: VecDeque::new(),
            }
        }
    }

    impl RadioTransport for MockRadio {
        fn transmit(&mut self, frame: &[u8]) -> Result<(), RadioError> {
            self.journal.borrow_mut().push(Op::Transmit(frame.to_vec()));
            self.tx_results.pop_front().unwrap_or(Ok(()))
        }

        fn receive(&mut self, timeout_ms: u32) -> Result<Option<Reception>, RadioError> {
            self.journal.borrow_mut().push(Op::Receive(timeout_ms));
            self.inbound.pop_front().unwrap_or(Ok(None))
        }
    }

    pub struct MockDelay(pub Journal);

    impl DelayNs for MockDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.0.borrow_mut().push(Op::Delay(ns / 1_000_000));
        }

        fn delay_ms(&mut self, ms: u32) {
            self.0.borrow_mut().push(Op::Delay(ms));
        }
    }

    pub struct MockClock(pub Timestamp);

    impl WallClock for MockClock {
        fn now(&mut self) -> Timestamp {
            self.0
        }
    }

    pub const GROUND_NOW: Timestamp = Timestamp::new(24, 6, 1, 12, 0, 5);

    pub fn scenario_telemetry() -> Telemetry {
        Telemetry::new(
            Timestamp::new(24, 6, 1, 12, 0, 0),
            LocationFix {
                latitude: 37.0,
                longitude: -122.0,
                altitude: 10.0,
                speed: 0.0,
                satellites: 8,
                heading: 90,
            },
            -65,
            2048,
            "OK",
        )
        .unwrap()
    }

    pub fn reception(codec: &FrameCodec, msg: Message, rssi: i16) -> Reception {
        Reception {
            frame: codec.encode_to_vec(&msg).unwrap(),
            rssi,
        }
    }

    pub type TestSession = LinkSession<MockRadio, MockClock, MockDelay>;

    pub fn session(journal: &Journal, config: SessionConfig) -> TestSession {
        LinkSession::new(
            MockRadio::new(journal),
            MockClock(GROUND_NOW),
            MockDelay(journal.clone()),
            config,
        )
    }

    fn push_inbound(session: &mut TestSession, rx: Result<Option<Reception>, RadioError>) {
        session.radio.inbound.push_back(rx);
    }

    #[test]
    fn test_telemetry_is_acknowledged() {
        let journal = Journal::default();
        let config = SessionConfig::default();
        let mut session = session(&journal, config);
        let rx = reception(&config.codec, scenario_telemetry().into(), -72);
        push_inbound(&mut session, Ok(Some(rx)));

        let exchange = session.step().unwrap();

        assert_eq!(exchange.telemetry, scenario_telemetry());
        assert_eq!(exchange.rssi, -72);
        assert_eq!(exchange.attempts, 1);
        assert_eq!(
            exchange.ack,
            TelemetryAck {
                timestamp: GROUND_NOW,
                ack: true,
                command_waiting: false,
            }
        );
        assert_eq!(session.state(), LinkState::Idle);

        let ops = journal.borrow();
        assert_eq!(
            ops.as_slice(),
            &[
                Op::Receive(DEFAULT_TELEMETRY_TIMEOUT_MS),
                Op::Delay(DEFAULT_TURNAROUND_MS),
                Op::Transmit(vec![13, 0xFF, 0xFF, 0x00, 0x00, 1, 24, 6, 1, 12, 0, 5, 1, 0]),
            ]
        );

        let stats = session.stats();
        assert_eq!(stats.messages(), 1);
        assert_eq!(stats.mean_ground_rssi(), Some(-72.0));
        assert_eq!(stats.mean_rover_signal(), Some(-65.0));
    }

    #[test]
    fn test_turnaround_precedes_transmit() {
        let journal = Journal::default();
        let config = SessionConfig {
            turnaround_ms: 250,
            ..SessionConfig::default()
        };
        let mut session = session(&journal, config);
        let rx = reception(&config.codec, scenario_telemetry().into(), -60);
        push_inbound(&mut session, Ok(Some(rx)));

        session.step().unwrap();

        let ops = journal.borrow();
        let delay = ops.iter().position(|op| *op == Op::Delay(250)).unwrap();
        let tx = ops
            .iter()
            .position(|op| matches!(op, Op::Transmit(_)))
            .unwrap();
        assert!(delay < tx);
    }

    #[test]
    fn test_unknown_tag_is_not_acknowledged() {
        let journal = Journal::default();
        let mut session = session(&journal, SessionConfig::default());
        let mut frame = heapless::Vec::<u8, MAX_FRAME_LEN>::new();
        frame
            .extend_from_slice(&[7, 0xFF, 0xFF, 0, 0, 9, 1, 2])
            .unwrap();
        push_inbound(&mut session, Ok(Some(Reception { frame, rssi: -50 })));

        assert_eq!(session.step(), Err(LinkError::Unexpected { tag: 9 }));
        assert_eq!(session.state(), LinkState::Idle);
        assert_eq!(session.stats().messages(), 0);
        assert_eq!(journal.borrow().len(), 1);
    }

    #[test]
    fn test_other_known_kind_is_unexpected() {
        let journal = Journal::default();
        let config = SessionConfig::default();
        let mut session = session(&journal, config);
        let ack = CommandAck {
            timestamp: Timestamp::default(),
            ack: true,
        };
        push_inbound(&mut session, Ok(Some(reception(&config.codec, ack.into(), -50))));

        assert_eq!(session.step(), Err(LinkError::Unexpected { tag: 4 }));
        assert_eq!(session.stats(), &SessionStats::new());
    }

    #[test]
    fn test_timeout() {
        let journal = Journal::default();
        let mut session = session(&journal, SessionConfig::default());

        assert_eq!(
            session.step(),
            Err(LinkError::Timeout {
                waited_ms: DEFAULT_TELEMETRY_TIMEOUT_MS
            })
        );
        assert_eq!(session.state(), LinkState::Idle);
    }

    #[test]
    fn test_receive_failure_surfaces() {
        let journal = Journal::default();
        let mut session = session(&journal, SessionConfig::default());
        push_inbound(&mut session, Err(RadioError::Bus));

        assert_eq!(session.step(), Err(LinkError::Receive(RadioError::Bus)));
    }

    #[test]
    fn test_truncated_telemetry_is_malformed() {
        let journal = Journal::default();
        let config = SessionConfig {
            codec: FrameCodec::new(HeaderMode::Implicit, 64),
            ..SessionConfig::default()
        };
        let mut session = session(&journal, config);
        let mut frame = heapless::Vec::<u8, MAX_FRAME_LEN>::new();
        frame.extend_from_slice(&[0, 24, 6, 1]).unwrap();
        push_inbound(&mut session, Ok(Some(Reception { frame, rssi: -50 })));

        let err = session.step().unwrap_err();
        assert_eq!(err.kind(), super::super::ErrorKind::MalformedPayload);
        assert_eq!(session.stats().messages(), 0);
        assert!(!journal
            .borrow()
            .iter()
            .any(|op| matches!(op, Op::Transmit(_))));
    }

    #[test]
    fn test_oversized_ack_never_transmits() {
        let journal = Journal::default();
        let config = SessionConfig {
            codec: FrameCodec::new(HeaderMode::Explicit, 13),
            ..SessionConfig::default()
        };
        let mut session = session(&journal, config);
        // Build the inbound frame with a roomier codec than the session's
        let roomy = FrameCodec::new(HeaderMode::Explicit, MAX_FRAME_LEN);
        push_inbound(
            &mut session,
            Ok(Some(reception(&roomy, scenario_telemetry().into(), -60))),
        );

        assert_eq!(
            session.step(),
            Err(LinkError::Oversized { len: 14, max: 13 })
        );
        assert!(!journal
            .borrow()
            .iter()
            .any(|op| matches!(op, Op::Transmit(_))));
        assert_eq!(session.state(), LinkState::Idle);
    }

    #[test]
    fn test_ack_retry_with_backoff() {
        let journal = Journal::default();
        let config = SessionConfig {
            ack_retry: AckRetry {
                max_retries: 3,
                backoff_base_ms: 50,
                backoff_max_ms: 400,
            },
            ..SessionConfig::default()
        };
        let mut session = session(&journal, config);
        let rx = reception(&config.codec, scenario_telemetry().into(), -60);
        push_inbound(&mut session, Ok(Some(rx)));
        session.radio.tx_results.extend([
            Err(RadioError::TransmitTimeout),
            Err(RadioError::TransmitTimeout),
        ]);

        let exchange = session.step().unwrap();
        assert_eq!(exchange.attempts, 3);

        let delays: Vec<u32> = journal
            .borrow()
            .iter()
            .filter_map(|op| match op {
                Op::Delay(ms) => Some(*ms),
                _ => None,
            })
            .collect();
        assert_eq!(delays, [100, 50, 100]);
    }

    #[test]
    fn test_ack_retry_exhausted() {
        let journal = Journal::default();
        let config = SessionConfig {
            ack_retry: AckRetry {
                max_retries: 2,
                backoff_base_ms: 10,
                backoff_max_ms: 15,
            },
            ..SessionConfig::default()
        };
        let mut session = session(&journal, config);
        let rx = reception(&config.codec, scenario_telemetry().into(), -60);
        push_inbound(&mut session, Ok(Some(rx)));
        session
            .radio
            .tx_results
            .extend([Err(RadioError::Bus), Err(RadioError::Bus), Err(RadioError::Bus)]);

        assert_eq!(
            session.step(),
            Err(LinkError::Transmit {
                error: RadioError::Bus,
                attempts: 3
            })
        );
        // Stats were recorded before the acknowledgment failed
        assert_eq!(session.stats().messages(), 1);

        let transmits = journal
            .borrow()
            .iter()
            .filter(|op| matches!(op, Op::Transmit(_)))
            .count();
        assert_eq!(transmits, 3);
        assert!(journal.borrow().contains(&Op::Delay(15)));
    }

    #[test]
    fn test_ack_retry_at_maximum_count() {
        let journal = Journal::default();
        let config = SessionConfig {
            ack_retry: AckRetry {
                max_retries: u8::MAX,
                backoff_base_ms: 0,
                backoff_max_ms: 0,
            },
            ..SessionConfig::default()
        };
        let mut session = session(&journal, config);
        let rx = reception(&config.codec, scenario_telemetry().into(), -60);
        push_inbound(&mut session, Ok(Some(rx)));
        session
            .radio
            .tx_results
            .extend(core::iter::repeat(Err(RadioError::Bus)).take(300));

        assert_eq!(
            session.step(),
            Err(LinkError::Transmit {
                error: RadioError::Bus,
                attempts: 256
            })
        );
        assert_eq!(session.radio.tx_results.len(), 300 - 256);
        assert_eq!(session.state(), LinkState::Idle);
    }

    #[test]
    fn test_backoff_schedule() {
        let retry = AckRetry {
            max_retries: 5,
            backoff_base_ms: 50,
            backoff_max_ms: 400,
        };
        assert_eq!(retry.backoff_ms(0), 50);
        assert_eq!(retry.backoff_ms(1), 100);
        assert_eq!(retry.backoff_ms(2), 200);
        assert_eq!(retry.backoff_ms(3), 400);
        assert_eq!(retry.backoff_ms(4), 400);
        assert_eq!(retry.backoff_ms(40), 400);
        assert_eq!(AckRetry::NONE.backoff_ms(3), 0);
    }

    proptest::proptest! {
        #[test]
        fn test_backoff_is_monotonic_and_capped(
            base in 0u32..10_000,
            max in 0u32..100_000,
            attempt in 0u8..64,
        ) {
            let retry = AckRetry { max_retries: 3, backoff_base_ms: base, backoff_max_ms: max };
            proptest::prop_assert!(retry.backoff_ms(attempt) <= max);
            proptest::prop_assert!(retry.backoff_ms(attempt) <= retry.backoff_ms(attempt.saturating_add(1)));
        }
    }

    #[test]
    fn test_stats_across_cycles() {
        let journal = Journal::default();
        let config = SessionConfig::default();
        let mut session = session(&journal, config);

        for (rssi, signal) in [(0, -70), (-60, 0), (-80, -75)] {
            let mut tm = scenario_telemetry();
            tm.signal_strength = signal;
            let rx = reception(&config.codec, tm.into(), rssi);
            push_inbound(&mut session, Ok(Some(rx)));
            session.step().unwrap();
        }

        let stats = session.stats();
        assert_eq!(stats.messages(), 3);
        assert_eq!(stats.mean_ground_rssi(), Some(-70.0));
        assert_eq!(stats.mean_rover_signal(), Some(-72.5));
    }
}
