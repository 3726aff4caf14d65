use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControlError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("timeout waiting for sensor")]
    Timeout,
    #[error("invalid reading from {0}")]
    InvalidReading(&'static str),
    #[error("telemetry transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing thresholds")]
    MissingThresholds,
    #[error("missing sensor")]
    MissingSensor,
    #[error("missing actuator")]
    MissingActuator,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
