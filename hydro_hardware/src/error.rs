use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("i2c error: {0}")]
    I2c(String),
    #[error("sensor timeout")]
    Timeout,
    #[error("ultrasonic echo timeout")]
    EchoTimeout,
    #[error("invalid ADC channel {0} (expected 0..=3)")]
    InvalidChannel(u8),
    #[error("invalid reading: {0}")]
    InvalidReading(String),
    #[error("channel not wired: {0}")]
    Unsupported(&'static str),
    #[error("telemetry sink not connected")]
    NotConnected,
    #[error("encode: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
