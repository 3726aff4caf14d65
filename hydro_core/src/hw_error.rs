//! Maps `Box<dyn Error>` from trait boundaries to typed `ControlError`.
//!
//! The traits in `hydro_traits` use `Box<dyn Error + Send + Sync>` so any
//! backend can plug in; this module converts those to our typed error enum,
//! with an optional feature-gated path for `hydro_hardware::HwError`.

use crate::error::ControlError;

/// Map a sensor/actuator boundary error to a typed `ControlError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> ControlError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<hydro_hardware::error::HwError>() {
            use hydro_hardware::error::HwError;
            return match hw {
                HwError::Timeout | HwError::EchoTimeout => ControlError::Timeout,
                HwError::NotConnected => ControlError::Transport(hw.to_string()),
                other => ControlError::HardwareFault(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        ControlError::Timeout
    } else {
        ControlError::Hardware(s)
    }
}

/// Map a telemetry transport error; always a `ControlError::Transport`.
pub fn map_transport_error(e: &(dyn std::error::Error + 'static)) -> ControlError {
    ControlError::Transport(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_text_maps_to_timeout() {
        let e = std::io::Error::other("echo timeout after 30ms");
        assert_eq!(map_hw_error(&e), ControlError::Timeout);
    }

    #[test]
    fn other_text_maps_to_hardware() {
        let e = std::io::Error::other("i2c nack");
        assert_eq!(map_hw_error(&e), ControlError::Hardware("i2c nack".into()));
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn typed_hw_errors_are_downcast() {
        let e = hydro_hardware::error::HwError::EchoTimeout;
        assert_eq!(map_hw_error(&e), ControlError::Timeout);
        let e = hydro_hardware::error::HwError::Gpio("pin busy".into());
        assert!(matches!(map_hw_error(&e), ControlError::HardwareFault(_)));
    }
}
