//! Simple TOML parser for ground station configuration
//!
//! This is a minimal TOML parser that handles only the subset needed for
//! the ground station. It does NOT support the full TOML spec.
//!
//! Supported features:
//! - Key = value pairs (string, integer, boolean)
//! - Decimal and `0x` hexadecimal integers
//! - Single-line byte arrays: `sync_word = [0x2D, 0xD4]`
//! - [section] headers
//! - Comments (# ...)
//!
//! Unknown keys are ignored; unknown sections are an error.

use heapless::String;

use groundlink_protocol::{HeaderMode, Timestamp};

use super::types::{ConfigError, GroundConfig, PolicyPreset, AES_KEY_LEN};

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Unknown or malformed section header
    InvalidSection,
    /// Value has the wrong type or is out of range for its field
    InvalidValue,
    /// Text value exceeds its capacity
    TooLong,
    /// Array has the wrong number of elements
    WrongLength { expected: usize, found: usize },
    /// Parsed configuration failed validation
    Invalid(ConfigError),
}

impl From<ConfigError> for ParseError {
    fn from(e: ConfigError) -> Self {
        ParseError::Invalid(e)
    }
}

/// Current parsing context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Link,
    Radio,
    Recovery,
    Display,
    Clock,
}

/// Parse TOML configuration into a validated [`GroundConfig`]
///
/// Missing keys keep their defaults.
pub fn parse_config(input: &str) -> Result<GroundConfig, ParseError> {
    let mut config = GroundConfig::default();
    let mut section = Section::Root;

    for line in input.lines() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') {
            section = parse_section_header(line)?;
            continue;
        }

        if let Some((key, value)) = parse_key_value(line) {
            apply_value(section, key, value, &mut config)?;
        }
    }

    config.validate()?;
    Ok(config)
}

/// Parse a header line such as `[radio]`, trailing comment allowed
fn parse_section_header(line: &str) -> Result<Section, ParseError> {
    let end = line.find(']').ok_or(ParseError::InvalidSection)?;
    let rest = line[end + 1..].trim();
    if !rest.is_empty() && !rest.starts_with('#') {
        return Err(ParseError::InvalidSection);
    }

    match line[1..end].trim() {
        "link" => Ok(Section::Link),
        "radio" => Ok(Section::Radio),
        "recovery" => Ok(Section::Recovery),
        "display" => Ok(Section::Display),
        "clock" => Ok(Section::Clock),
        _ => Err(ParseError::InvalidSection),
    }
}

/// Parse a key = value line
fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let eq_pos = line.find('=')?;
    let key = line[..eq_pos].trim();
    let value = line[eq_pos + 1..].trim();

    // Remove inline comments
    let value = match value.find('#') {
        // Make sure # is not inside a string
        Some(hash_pos) if value[..hash_pos].matches('"').count() % 2 == 0 => {
            value[..hash_pos].trim()
        }
        _ => value,
    };

    if key.is_empty() || value.is_empty() {
        return None;
    }

    Some((key, value))
}

/// Parse a string value (removes quotes)
fn parse_string(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        // Allow unquoted strings for simple values
        value
    }
}

/// Parse a decimal or `0x` hexadecimal integer
fn parse_int<T: TryFrom<i64>>(value: &str) -> Result<T, ParseError> {
    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value),
    };
    // Digit separators
    let mut clean: String<24> = String::new();
    for c in digits.chars().filter(|&c| c != '_') {
        clean.push(c).map_err(|_| ParseError::InvalidValue)?;
    }

    let magnitude = match clean
        .strip_prefix("0x")
        .or_else(|| clean.strip_prefix("0X"))
    {
        Some(hex) => i64::from_str_radix(hex, 16),
        None => clean.parse::<i64>(),
    }
    .map_err(|_| ParseError::InvalidValue)?;

    let n = if negative { -magnitude } else { magnitude };
    T::try_from(n).map_err(|_| ParseError::InvalidValue)
}

/// Parse a boolean value
fn parse_bool(value: &str) -> Result<bool, ParseError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ParseError::InvalidValue),
    }
}

/// Parse a fixed-length byte array like `[0x2D, 0xD4]`
fn parse_bytes<const N: usize>(value: &str) -> Result<[u8; N], ParseError> {
    let inner = value
        .strip_prefix('[')
        .and_then(|v| v.strip_suffix(']'))
        .ok_or(ParseError::InvalidValue)?;

    let mut out = [0u8; N];
    let mut found = 0;
    for item in inner.split(',').map(str::trim) {
        if item.is_empty() {
            // Trailing comma
            continue;
        }
        if found < N {
            out[found] = parse_int(item)?;
        }
        found += 1;
    }

    if found != N {
        return Err(ParseError::WrongLength { expected: N, found });
    }
    Ok(out)
}

fn parse_header_mode(value: &str) -> Result<HeaderMode, ParseError> {
    match parse_string(value) {
        "explicit" => Ok(HeaderMode::Explicit),
        "implicit" | "radiohead" => Ok(HeaderMode::Implicit),
        _ => Err(ParseError::InvalidValue),
    }
}

fn parse_preset(value: &str) -> Result<PolicyPreset, ParseError> {
    match parse_string(value) {
        "hardened" => Ok(PolicyPreset::Hardened),
        "strict" => Ok(PolicyPreset::Strict),
        _ => Err(ParseError::InvalidValue),
    }
}

fn parse_timestamp(value: &str) -> Result<Timestamp, ParseError> {
    let [year, month, day, hour, minute, second] = parse_bytes::<6>(value)?;
    Ok(Timestamp::new(year, month, day, hour, minute, second))
}

fn apply_value(
    section: Section,
    key: &str,
    value: &str,
    config: &mut GroundConfig,
) -> Result<(), ParseError> {
    match section {
        Section::Link => {
            let l = &mut config.link;
            match key {
                "telemetry_timeout_ms" => l.telemetry_timeout_ms = parse_int(value)?,
                "tx_timeout_ms" => l.tx_timeout_ms = parse_int(value)?,
                "turnaround_ms" => l.turnaround_ms = parse_int(value)?,
                "header" => l.header = parse_header_mode(value)?,
                "max_frame_len" => l.max_frame_len = parse_int(value)?,
                _ => {} // Ignore unknown keys
            }
        }
        Section::Radio => {
            let r = &mut config.radio;
            match key {
                "frequency_hz" => r.frequency_hz = parse_int(value)?,
                "frequency_mhz" => {
                    let mhz: u32 = parse_int(value)?;
                    r.frequency_hz = mhz.checked_mul(1_000_000).ok_or(ParseError::InvalidValue)?;
                }
                "bitrate" => r.bitrate = parse_int(value)?,
                "tx_power_dbm" => r.tx_power_dbm = parse_int(value)?,
                "sync_word" => r.sync_word = parse_bytes(value)?,
                "aes_key" => r.aes_key = Some(parse_bytes::<AES_KEY_LEN>(value)?),
                "encrypt" => {
                    if !parse_bool(value)? {
                        r.aes_key = None;
                    }
                }
                _ => {}
            }
        }
        Section::Recovery => {
            let r = &mut config.recovery;
            match key {
                "policy" => r.preset = parse_preset(value)?,
                "ack_retries" => r.ack_retries = Some(parse_int(value)?),
                "backoff_base_ms" => r.backoff_base_ms = Some(parse_int(value)?),
                "backoff_max_ms" => r.backoff_max_ms = Some(parse_int(value)?),
                "max_silent_timeouts" => r.max_silent_timeouts = Some(parse_int(value)?),
                "drop_malformed" => r.drop_malformed = Some(parse_bool(value)?),
                "wait_for_first_contact" => {
                    r.wait_for_first_contact = Some(parse_bool(value)?)
                }
                _ => {}
            }
        }
        Section::Display => {
            let d = &mut config.display;
            match key {
                "enabled" => d.enabled = parse_bool(value)?,
                "i2c_address" => d.i2c_address = parse_int(value)?,
                "splash" => {
                    d.splash.clear();
                    d.splash
                        .push_str(parse_string(value))
                        .map_err(|_| ParseError::TooLong)?;
                }
                _ => {}
            }
        }
        Section::Clock => {
            if key == "start" {
                config.clock.start = parse_timestamp(value)?;
            }
        }
        Section::Root => {
            // No root-level keys
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::RecoveryConfig;

    #[test]
    fn test_parse_int_forms() {
        assert_eq!(parse_int::<u8>("0x3C"), Ok(0x3C));
        assert_eq!(parse_int::<u32>("10_000"), Ok(10_000));
        assert_eq!(parse_int::<i8>("-5"), Ok(-5));
        assert_eq!(parse_int::<u8>("256"), Err(ParseError::InvalidValue));
        assert_eq!(parse_int::<u8>("-1"), Err(ParseError::InvalidValue));
        assert_eq!(parse_int::<u8>("ten"), Err(ParseError::InvalidValue));
    }

    #[test]
    fn test_parse_bytes() {
        assert_eq!(parse_bytes::<2>("[0x2D, 0xD4]"), Ok([0x2D, 0xD4]));
        assert_eq!(parse_bytes::<2>("[1, 2,]"), Ok([1, 2]));
        assert_eq!(
            parse_bytes::<2>("[1, 2, 3]"),
            Err(ParseError::WrongLength {
                expected: 2,
                found: 3
            })
        );
        assert_eq!(parse_bytes::<2>("1, 2"), Err(ParseError::InvalidValue));
    }

    #[test]
    fn test_parse_key_value_strips_comments() {
        assert_eq!(
            parse_key_value("turnaround_ms = 100 # pause"),
            Some(("turnaround_ms", "100"))
        );
        assert_eq!(
            parse_key_value("splash = \"# READY\""),
            Some(("splash", "\"# READY\""))
        );
        assert_eq!(parse_key_value("empty ="), None);
    }

    #[test]
    fn test_parse_section_header() {
        assert_eq!(parse_section_header("[radio]"), Ok(Section::Radio));
        assert_eq!(parse_section_header("[ clock ] # rtc"), Ok(Section::Clock));
        assert_eq!(
            parse_section_header("[stepper]"),
            Err(ParseError::InvalidSection)
        );
        assert_eq!(parse_section_header("[link"), Err(ParseError::InvalidSection));
    }

    #[test]
    fn test_empty_input_gives_defaults() {
        assert_eq!(parse_config(""), Ok(GroundConfig::default()));
    }

    #[test]
    fn test_parse_full_config() {
        let config_str = r#"
# Ground station
[link]
telemetry_timeout_ms = 8000
tx_timeout_ms = 500
turnaround_ms = 120
header = "radiohead"
max_frame_len = 64

[radio]
frequency_mhz = 915
bitrate = 9600
tx_power_dbm = 13
sync_word = [0x2D, 0xD4]
aes_key = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16]

[recovery]
policy = "strict"
ack_retries = 2
unknown_key = 7

[display]
enabled = false
i2c_address = 0x3D
splash = "BASE CAMP"

[clock]
start = [24, 6, 1, 12, 0, 0]
"#;
        let config = parse_config(config_str).unwrap();

        assert_eq!(config.link.telemetry_timeout_ms, 8000);
        assert_eq!(config.link.tx_timeout_ms, 500);
        assert_eq!(config.link.turnaround_ms, 120);
        assert_eq!(config.link.header, HeaderMode::Implicit);
        assert_eq!(config.radio.frequency_hz, 915_000_000);
        assert_eq!(config.radio.tx_power_dbm, 13);
        assert_eq!(config.radio.aes_key.unwrap()[15], 16);
        assert_eq!(
            config.recovery,
            RecoveryConfig {
                preset: PolicyPreset::Strict,
                ack_retries: Some(2),
                ..RecoveryConfig::default()
            }
        );
        assert!(!config.display.enabled);
        assert_eq!(config.display.i2c_address, 0x3D);
        assert_eq!(config.display.splash.as_str(), "BASE CAMP");
        assert_eq!(config.clock.start, Timestamp::new(24, 6, 1, 12, 0, 0));
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let config_str = r#"
[link]
max_frame_len = 200

[radio]
aes_key = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]
"#;
        assert_eq!(
            parse_config(config_str),
            Err(ParseError::Invalid(ConfigError::FrameTooLongForAes(200)))
        );
    }

    #[test]
    fn test_short_aes_key_rejected() {
        let config_str = "[radio]\naes_key = [1, 2, 3]\n";
        assert_eq!(
            parse_config(config_str),
            Err(ParseError::WrongLength {
                expected: 16,
                found: 3
            })
        );
    }

    #[test]
    fn test_splash_too_long() {
        let config_str = "[display]\nsplash = \"0123456789012345678901234567890123\"\n";
        assert_eq!(parse_config(config_str), Err(ParseError::TooLong));
    }
}
