//! Configuration type definitions
//!
//! These types describe one ground station deployment. The firmware embeds
//! a TOML file and parses it at boot; every field has a compiled default.

use heapless::String;

use groundlink_protocol::{
    FrameCodec, HeaderMode, Timestamp, LINK_HEADER_LEN, MAX_ENCRYPTED_FRAME_LEN, MAX_FRAME_LEN,
};

use crate::session::link::{
    DEFAULT_TX_TIMEOUT_MS, DEFAULT_TELEMETRY_TIMEOUT_MS, DEFAULT_TURNAROUND_MS,
};
use crate::session::{AckRetry, SessionConfig};
use crate::supervisor::RecoveryPolicy;

/// Maximum splash text length
pub const MAX_SPLASH_LEN: usize = 32;

/// AES-128 key length
pub const AES_KEY_LEN: usize = 16;

/// Smallest usable frame: header, tag and the shortest payload
pub const MIN_FRAME_LEN: u16 = 7;

/// Transmit power range with both power amplifiers on
pub const TX_POWER_RANGE_DBM: core::ops::RangeInclusive<i8> = 2..=17;

/// Carrier range the transceiver can synthesize
pub const FREQUENCY_RANGE_HZ: core::ops::RangeInclusive<u32> = 290_000_000..=1_020_000_000;

/// Validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// `max_frame_len` outside 7..=255
    FrameLengthOutOfRange(u16),
    /// `max_frame_len` above 64 with an AES key set
    FrameTooLongForAes(u16),
    /// Turnaround not shorter than the telemetry timeout
    TurnaroundTooLong,
    /// Zero telemetry timeout
    ZeroTimeout,
    FrequencyOutOfRange(u32),
    TxPowerOutOfRange(i8),
    ZeroBitrate,
}

/// Link timing and framing (`[link]`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkConfig {
    /// Wait for rover telemetry
    pub telemetry_timeout_ms: u32,
    /// Wait for the radio to finish sending a frame
    pub tx_timeout_ms: u32,
    /// Pause between receive and transmit
    pub turnaround_ms: u32,
    /// Link header written by the frame codec or by the radio driver
    pub header: HeaderMode,
    /// Largest frame on the air, header included
    pub max_frame_len: u16,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            telemetry_timeout_ms: DEFAULT_TELEMETRY_TIMEOUT_MS,
            tx_timeout_ms: DEFAULT_TX_TIMEOUT_MS,
            turnaround_ms: DEFAULT_TURNAROUND_MS,
            header: HeaderMode::Explicit,
            max_frame_len: MAX_ENCRYPTED_FRAME_LEN as u16,
        }
    }
}

impl LinkConfig {
    /// Frame codec for this link
    ///
    /// With an implicit header the driver adds the link header below the
    /// codec, so the codec's limit shrinks by its size.
    pub fn codec(&self) -> FrameCodec {
        let max = match self.header {
            HeaderMode::Explicit => self.max_frame_len as usize,
            HeaderMode::Implicit => (self.max_frame_len as usize).saturating_sub(LINK_HEADER_LEN),
        };
        FrameCodec::new(self.header, max)
    }

    /// Session settings with the given acknowledgment retry
    pub fn session_config(&self, ack_retry: AckRetry) -> SessionConfig {
        SessionConfig {
            telemetry_timeout_ms: self.telemetry_timeout_ms,
            turnaround_ms: self.turnaround_ms,
            codec: self.codec(),
            ack_retry,
        }
    }
}

/// Transceiver settings (`[radio]`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RadioConfig {
    pub frequency_hz: u32,
    /// Bits per second
    pub bitrate: u32,
    pub tx_power_dbm: i8,
    pub sync_word: [u8; 2],
    /// Radio-level encryption; `None` disables AES
    pub aes_key: Option<[u8; AES_KEY_LEN]>,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 915_000_000,
            bitrate: 9600,
            tx_power_dbm: 17,
            sync_word: [0x2D, 0xD4],
            aes_key: None,
        }
    }
}

/// Recovery policy choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PolicyPreset {
    #[default]
    Hardened,
    Strict,
}

/// Recovery settings (`[recovery]`)
///
/// The preset supplies every value; keys present in the file override it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RecoveryConfig {
    pub preset: PolicyPreset,
    pub ack_retries: Option<u8>,
    pub backoff_base_ms: Option<u32>,
    pub backoff_max_ms: Option<u32>,
    pub max_silent_timeouts: Option<u8>,
    pub drop_malformed: Option<bool>,
    pub wait_for_first_contact: Option<bool>,
}

impl RecoveryConfig {
    pub fn policy(&self) -> RecoveryPolicy {
        let mut policy = match self.preset {
            PolicyPreset::Hardened => RecoveryPolicy::default(),
            PolicyPreset::Strict => RecoveryPolicy::strict(),
        };

        if let Some(v) = self.ack_retries {
            policy.ack_retry.max_retries = v;
        }
        if let Some(v) = self.backoff_base_ms {
            policy.ack_retry.backoff_base_ms = v;
        }
        if let Some(v) = self.backoff_max_ms {
            policy.ack_retry.backoff_max_ms = v;
        }
        if let Some(v) = self.max_silent_timeouts {
            policy.max_silent_timeouts = v;
        }
        if let Some(v) = self.drop_malformed {
            policy.drop_malformed = v;
        }
        if let Some(v) = self.wait_for_first_contact {
            policy.wait_for_first_contact = v;
        }

        policy
    }
}

/// Status display settings (`[display]`)
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplayConfig {
    pub enabled: bool,
    /// 7-bit I2C address
    pub i2c_address: u8,
    /// Shown once at boot
    pub splash: String<MAX_SPLASH_LEN>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        let mut splash = String::new();
        let _ = splash.push_str("GROUND STATION READY");
        Self {
            enabled: true,
            i2c_address: 0x3C,
            splash,
        }
    }
}

/// Wall clock settings (`[clock]`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockConfig {
    /// Time the RTC starts from at power-on
    pub start: Timestamp,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            start: Timestamp::new(24, 1, 1, 0, 0, 0),
        }
    }
}

/// Complete ground station configuration
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GroundConfig {
    pub link: LinkConfig,
    pub radio: RadioConfig,
    pub recovery: RecoveryConfig,
    pub display: DisplayConfig,
    pub clock: ClockConfig,
}

impl GroundConfig {
    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        let max = self.link.max_frame_len;
        if !(MIN_FRAME_LEN..=MAX_FRAME_LEN as u16).contains(&max) {
            return Err(ConfigError::FrameLengthOutOfRange(max));
        }
        if self.radio.aes_key.is_some() && max as usize > MAX_ENCRYPTED_FRAME_LEN {
            return Err(ConfigError::FrameTooLongForAes(max));
        }
        if self.link.telemetry_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.link.turnaround_ms >= self.link.telemetry_timeout_ms {
            return Err(ConfigError::TurnaroundTooLong);
        }
        if !FREQUENCY_RANGE_HZ.contains(&self.radio.frequency_hz) {
            return Err(ConfigError::FrequencyOutOfRange(self.radio.frequency_hz));
        }
        if !TX_POWER_RANGE_DBM.contains(&self.radio.tx_power_dbm) {
            return Err(ConfigError::TxPowerOutOfRange(self.radio.tx_power_dbm));
        }
        if self.radio.bitrate == 0 {
            return Err(ConfigError::ZeroBitrate);
        }
        Ok(())
    }

    /// Session settings including the recovery policy's retry
    pub fn session_config(&self) -> SessionConfig {
        self.link.session_config(self.recovery.policy().ack_retry)
    }

    /// Longest a single blocking link cycle can take
    ///
    /// Receive timeout, turnaround, then every acknowledgment attempt
    /// running into the transmit timeout with the backoff between them.
    pub fn max_cycle_ms(&self) -> u32 {
        let retry = self.recovery.policy().ack_retry;
        let backoff = (0..retry.max_retries)
            .fold(0u32, |total, attempt| total.saturating_add(retry.backoff_ms(attempt)));
        let attempts = u32::from(retry.max_retries) + 1;

        self.link
            .telemetry_timeout_ms
            .saturating_add(self.link.turnaround_ms)
            .saturating_add(attempts.saturating_mul(self.link.tx_timeout_ms))
            .saturating_add(backoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GroundConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.display.splash.as_str(), "GROUND STATION READY");
        assert_eq!(config.link.codec().max_len(), 64);
    }

    #[test]
    fn test_implicit_header_reserves_driver_header() {
        let link = LinkConfig {
            header: HeaderMode::Implicit,
            ..LinkConfig::default()
        };
        assert_eq!(link.codec().max_len(), 59);
        assert_eq!(link.codec().header_mode(), HeaderMode::Implicit);
    }

    #[test]
    fn test_aes_limits_frame_length() {
        let mut config = GroundConfig::default();
        config.link.max_frame_len = 255;
        assert_eq!(config.validate(), Ok(()));

        config.radio.aes_key = Some([0x11; AES_KEY_LEN]);
        assert_eq!(config.validate(), Err(ConfigError::FrameTooLongForAes(255)));
    }

    #[test]
    fn test_frame_length_bounds() {
        let mut config = GroundConfig::default();
        config.link.max_frame_len = 6;
        assert_eq!(
            config.validate(),
            Err(ConfigError::FrameLengthOutOfRange(6))
        );
        config.link.max_frame_len = 256;
        assert_eq!(
            config.validate(),
            Err(ConfigError::FrameLengthOutOfRange(256))
        );
    }

    #[test]
    fn test_turnaround_must_be_shorter_than_timeout() {
        let mut config = GroundConfig::default();
        config.link.turnaround_ms = config.link.telemetry_timeout_ms;
        assert_eq!(config.validate(), Err(ConfigError::TurnaroundTooLong));
    }

    #[test]
    fn test_preset_with_overrides() {
        let recovery = RecoveryConfig {
            preset: PolicyPreset::Strict,
            ack_retries: Some(2),
            ..RecoveryConfig::default()
        };
        let policy = recovery.policy();
        assert!(!policy.drop_malformed);
        assert_eq!(policy.ack_retry.max_retries, 2);
        assert_eq!(policy.max_silent_timeouts, 0);

        assert_eq!(RecoveryConfig::default().policy(), RecoveryPolicy::default());
    }

    #[test]
    fn test_max_cycle_covers_every_ack_attempt() {
        let config = GroundConfig::default();
        // 10 s receive, 100 ms turnaround, 4 x 1 s sends, 50 + 100 + 200 ms backoff
        assert_eq!(config.max_cycle_ms(), 10_000 + 100 + 4_000 + 350);

        let mut strict = config.clone();
        strict.recovery.preset = PolicyPreset::Strict;
        assert_eq!(strict.max_cycle_ms(), 10_000 + 100 + 1_000);

        let mut extreme = config;
        extreme.recovery.ack_retries = Some(u8::MAX);
        extreme.link.tx_timeout_ms = u32::MAX;
        assert_eq!(extreme.max_cycle_ms(), u32::MAX);
    }

    #[test]
    fn test_session_config_carries_policy_retry() {
        let config = GroundConfig::default();
        let session = config.session_config();
        assert_eq!(session.ack_retry, RecoveryPolicy::default().ack_retry);
        assert_eq!(session.telemetry_timeout_ms, 10_000);
        assert_eq!(session.turnaround_ms, 100);
    }
}
