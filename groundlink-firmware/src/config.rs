//! Configuration loading
//!
//! The deployment file is compiled into the image. build.rs rejects a bad
//! file at build time; if parsing still fails at boot the firmware runs on
//! the compiled defaults.

use defmt::*;

use groundlink_core::config::{parse_config, GroundConfig, PolicyPreset};
use groundlink_protocol::HeaderMode;

/// Embedded configuration (compiled into firmware)
/// Edit ground.toml and rebuild to customize
pub const EMBEDDED_CONFIG: &str = include_str!("../ground.toml");

/// Parse the embedded configuration, falling back to defaults
pub fn load() -> GroundConfig {
    match parse_config(EMBEDDED_CONFIG) {
        Ok(config) => {
            info!("Loaded ground.toml");
            config
        }
        Err(e) => {
            error!("ground.toml rejected: {:?}, using defaults", e);
            GroundConfig::default()
        }
    }
}

/// Log the settings the link will run with
pub fn log_summary(config: &GroundConfig) {
    let link = &config.link;
    let header = match link.header {
        HeaderMode::Explicit => "explicit",
        HeaderMode::Implicit => "radiohead",
    };
    info!(
        "Link: timeout={}ms ack={}ms turnaround={}ms header={} max_frame={}",
        link.telemetry_timeout_ms, link.tx_timeout_ms, link.turnaround_ms, header, link.max_frame_len
    );

    let radio = &config.radio;
    info!(
        "Radio: {}Hz {}bps {}dBm aes={}",
        radio.frequency_hz,
        radio.bitrate,
        radio.tx_power_dbm,
        radio.aes_key.is_some()
    );

    let policy = config.recovery.policy();
    let preset = match config.recovery.preset {
        PolicyPreset::Hardened => "hardened",
        PolicyPreset::Strict => "strict",
    };
    info!(
        "Recovery: {} retries={} backoff={}..{}ms silent={} drop_malformed={} wait_first={}",
        preset,
        policy.ack_retry.max_retries,
        policy.ack_retry.backoff_base_ms,
        policy.ack_retry.backoff_max_ms,
        policy.max_silent_timeouts,
        policy.drop_malformed,
        policy.wait_for_first_contact
    );
}
