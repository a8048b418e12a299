//! Build script for groundlink-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates ground.toml at compile time

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

fn main() {
    setup_linker();
    validate_config();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());

    // cortex-m-rt, embassy-rp boot2 and defmt linker scripts
    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tlink-rp.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate ground.toml at compile time
///
/// The firmware falls back to defaults on a bad file, so catching mistakes
/// here keeps a typo from silently shipping the default link settings.
fn validate_config() {
    println!("cargo:rerun-if-changed=ground.toml");

    let config_path = Path::new("ground.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: ground.toml not found!                                   ║\n\
            ║                                                                  ║\n\
            ║  The firmware embeds a ground.toml configuration file.           ║\n\
            ║  Please create one in the groundlink-firmware directory.         ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read ground.toml                               ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let config: toml::Value = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in ground.toml                       ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                {}\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    let mut errors = Vec::new();
    validate_sections(&config, &mut errors);
    validate_link(&config, &mut errors);
    validate_radio(&config, &mut errors);
    validate_recovery(&config, &mut errors);
    validate_display(&config, &mut errors);
    validate_clock(&config, &mut errors);

    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Invalid configuration in ground.toml                     ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            errors
                .iter()
                .map(|e| format!("║  • {:<62} ║", e))
                .collect::<Vec<_>>()
                .join("\n")
        );
    }

    println!("cargo:warning=ground.toml validated successfully");
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn section<'a>(config: &'a toml::Value, name: &str) -> Option<&'a toml::value::Table> {
    config.get(name).and_then(|s| s.as_table())
}

fn int(table: &toml::value::Table, key: &str) -> Option<i64> {
    table.get(key).and_then(|v| v.as_integer())
}

/// Integer key within `range`, if present
fn check_int(
    table: &toml::value::Table,
    section: &str,
    key: &str,
    range: std::ops::RangeInclusive<i64>,
    errors: &mut Vec<String>,
) {
    match table.get(key) {
        None => {}
        Some(toml::Value::Integer(n)) if range.contains(n) => {}
        Some(toml::Value::Integer(_)) => errors.push(format!(
            "[{}] {} must be {}-{}",
            section,
            key,
            range.start(),
            range.end()
        )),
        Some(_) => errors.push(format!("[{}] {} must be an integer", section, key)),
    }
}

fn check_bool(table: &toml::value::Table, section: &str, key: &str, errors: &mut Vec<String>) {
    if let Some(value) = table.get(key) {
        if !value.is_bool() {
            errors.push(format!("[{}] {} must be true or false", section, key));
        }
    }
}

/// Byte array key of exactly `len` elements, if present
fn check_bytes(
    table: &toml::value::Table,
    section: &str,
    key: &str,
    len: usize,
    errors: &mut Vec<String>,
) {
    let Some(value) = table.get(key) else {
        return;
    };
    let valid = value.as_array().is_some_and(|items| {
        items.len() == len
            && items
                .iter()
                .all(|v| v.as_integer().is_some_and(|n| (0..=255).contains(&n)))
    });
    if !valid {
        errors.push(format!("[{}] {} must be {} bytes", section, key, len));
    }
}

fn check_choice(
    table: &toml::value::Table,
    section: &str,
    key: &str,
    choices: &[&str],
    errors: &mut Vec<String>,
) {
    if let Some(value) = table.get(key) {
        if !value.as_str().is_some_and(|s| choices.contains(&s)) {
            errors.push(format!(
                "[{}] {} must be one of {}",
                section,
                key,
                choices.join(", ")
            ));
        }
    }
}

fn validate_sections(config: &toml::Value, errors: &mut Vec<String>) {
    const KNOWN: [&str; 5] = ["link", "radio", "recovery", "display", "clock"];

    let Some(root) = config.as_table() else {
        return;
    };
    for (name, value) in root {
        if !KNOWN.contains(&name.as_str()) {
            errors.push(format!("unknown section [{}]", name));
        } else if !value.is_table() {
            errors.push(format!("[{}] must be a table", name));
        }
    }
}

fn validate_link(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(link) = section(config, "link") else {
        return;
    };

    check_int(link, "link", "telemetry_timeout_ms", 1..=u32::MAX as i64, errors);
    check_int(link, "link", "tx_timeout_ms", 1..=u32::MAX as i64, errors);
    check_int(link, "link", "turnaround_ms", 0..=u32::MAX as i64, errors);
    check_int(link, "link", "max_frame_len", 7..=255, errors);
    check_choice(
        link,
        "link",
        "header",
        &["explicit", "implicit", "radiohead"],
        errors,
    );

    let timeout = int(link, "telemetry_timeout_ms").unwrap_or(10_000);
    let turnaround = int(link, "turnaround_ms").unwrap_or(100);
    if turnaround >= timeout {
        errors.push("[link] turnaround_ms must be below telemetry_timeout_ms".to_string());
    }

    let encrypted = section(config, "radio").is_some_and(|r| {
        r.contains_key("aes_key") && r.get("encrypt").and_then(|v| v.as_bool()) != Some(false)
    });
    if encrypted && int(link, "max_frame_len").unwrap_or(64) > 64 {
        errors.push("[link] max_frame_len must be at most 64 with an aes_key".to_string());
    }
}

fn validate_radio(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(radio) = section(config, "radio") else {
        return;
    };

    check_int(radio, "radio", "frequency_hz", 290_000_000..=1_020_000_000, errors);
    check_int(radio, "radio", "frequency_mhz", 290..=1020, errors);
    check_int(radio, "radio", "bitrate", 1..=300_000, errors);
    check_int(radio, "radio", "tx_power_dbm", 2..=17, errors);
    check_bytes(radio, "radio", "sync_word", 2, errors);
    check_bytes(radio, "radio", "aes_key", 16, errors);
    check_bool(radio, "radio", "encrypt", errors);

    if radio.contains_key("frequency_hz") && radio.contains_key("frequency_mhz") {
        errors.push("[radio] set frequency_hz or frequency_mhz, not both".to_string());
    }
}

fn validate_recovery(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(recovery) = section(config, "recovery") else {
        return;
    };

    check_choice(recovery, "recovery", "policy", &["hardened", "strict"], errors);
    check_int(recovery, "recovery", "ack_retries", 0..=255, errors);
    check_int(recovery, "recovery", "backoff_base_ms", 0..=u32::MAX as i64, errors);
    check_int(recovery, "recovery", "backoff_max_ms", 0..=u32::MAX as i64, errors);
    check_int(recovery, "recovery", "max_silent_timeouts", 0..=255, errors);
    check_bool(recovery, "recovery", "drop_malformed", errors);
    check_bool(recovery, "recovery", "wait_for_first_contact", errors);
}

fn validate_display(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(display) = section(config, "display") else {
        return;
    };

    check_bool(display, "display", "enabled", errors);
    check_int(display, "display", "i2c_address", 0x08..=0x77, errors);
    if let Some(splash) = display.get("splash") {
        match splash.as_str() {
            Some(s) if s.len() <= 32 => {}
            Some(_) => errors.push("[display] splash must be at most 32 bytes".to_string()),
            None => errors.push("[display] splash must be a string".to_string()),
        }
    }
}

fn validate_clock(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(clock) = section(config, "clock") else {
        return;
    };

    check_bytes(clock, "clock", "start", 6, errors);
    if let Some(start) = clock.get("start").and_then(|v| v.as_array()) {
        let field = |i: usize| start.get(i).and_then(|v| v.as_integer()).unwrap_or(0);
        if !(1..=12).contains(&field(1))
            || !(1..=31).contains(&field(2))
            || field(3) > 23
            || field(4) > 59
            || field(5) > 59
        {
            errors.push("[clock] start must be a valid date and time".to_string());
        }
    }
}
