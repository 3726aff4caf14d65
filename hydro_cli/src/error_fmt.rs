//! Human-readable error descriptions, exit codes and structured JSON errors.

use std::fmt;
use std::path::PathBuf;

use hydro_core::error::{BuildError, ControlError};
use hydro_hardware::error::HwError;

/// Context attached when the config file cannot be read, parsed or validated.
#[derive(Debug)]
pub struct ConfigInvalid(pub PathBuf);

impl fmt::Display for ConfigInvalid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid configuration in {}", self.0.display())
    }
}

pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_CONFIG: i32 = 2;
pub const EXIT_HARDWARE: i32 = 3;

fn is_config_error(err: &eyre::Report) -> bool {
    err.downcast_ref::<ConfigInvalid>().is_some()
        || matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::InvalidConfig(_))
        )
}

/// Device errors from a hardware backend; sink I/O failures do not count.
fn device_error(err: &eyre::Report) -> Option<&HwError> {
    err.chain()
        .filter_map(|e| e.downcast_ref::<HwError>())
        .find(|hw| !matches!(hw, HwError::Io(_) | HwError::Encode(_) | HwError::NotConnected))
}

fn is_hardware_error(err: &eyre::Report) -> bool {
    if device_error(err).is_some() {
        return true;
    }
    matches!(
        err.downcast_ref::<ControlError>(),
        Some(ControlError::Hardware(_) | ControlError::HardwareFault(_) | ControlError::Timeout)
    )
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(cfg) = err.downcast_ref::<ConfigInvalid>() {
        let cause = err
            .chain()
            .nth(1)
            .map(|c| c.to_string())
            .unwrap_or_default();
        return format!(
            "What happened: Invalid configuration in {} ({cause}).\nLikely causes: Missing [thresholds] or [water_level], or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun.",
            cfg.0.display()
        );
    }

    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingSensor => {
                "What happened: No sensor backend was provided to the controller.\nLikely causes: Hardware failed to initialize or was not wired into the builder.\nHow to fix: Check the hardware logs above and the [pins] section.".to_string()
            }
            BuildError::MissingActuator => {
                "What happened: No relay backend was provided to the controller.\nLikely causes: Relay pins failed to initialize or were not wired into the builder.\nHow to fix: Check the [pins] section and GPIO permissions.".to_string()
            }
            BuildError::MissingThresholds => {
                "What happened: Alert thresholds were not set.\nLikely causes: The [thresholds] section was not passed to the builder.\nHow to fix: Provide [thresholds] in the config.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(ce) = err.downcast_ref::<ControlError>() {
        return match ce {
            ControlError::Timeout => "What happened: A sensor read timed out.\nLikely causes: Ultrasonic ranger or ADC not wired or not powered, or echo timeout too low.\nHow to fix: Verify wiring and power, and consider raising hardware.echo_timeout_ms.".to_string(),
            ControlError::Hardware(msg) | ControlError::HardwareFault(msg) => format!(
                "What happened: Hardware fault ({msg}).\nLikely causes: Disconnected sensor, relay board without power, or missing GPIO/I2C permissions.\nHow to fix: Check wiring and run `hydro self-check`. Outputs were switched off where possible."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if let Some(hw) = device_error(err) {
        return format!(
            "What happened: Failed to initialize hardware ({msg}: {hw}).\nLikely causes: Incorrect pin numbers, I2C disabled, or insufficient GPIO permissions.\nHow to fix: Fix the [pins] and [hardware] values in the config; ensure the process may access GPIO and I2C."
        );
    }

    if lower.contains("status file") {
        return format!(
            "What happened: No controller status available ({msg}).\nLikely causes: `hydro run` is not running yet, or it writes a different --status-file.\nHow to fix: Start `hydro run` and pass the same --status-file to both commands."
        );
    }

    if lower.contains("telemetry file") {
        return format!(
            "What happened: Could not open the telemetry file ({msg}).\nHow to fix: Check that the directory exists and is writable."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: configuration 2, hardware 3, anything else 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if is_config_error(err) {
        EXIT_CONFIG
    } else if is_hardware_error(err) {
        EXIT_HARDWARE
    } else {
        EXIT_FAILURE
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if is_config_error(err) {
        "InvalidConfig"
    } else if is_hardware_error(err) {
        "Hardware"
    } else {
        "Error"
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}
