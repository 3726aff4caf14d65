//! Hardware capability traits shared by the controller core and the
//! hardware backends.
//!
//! All trait-boundary errors are boxed so backends can surface their own
//! error types; the core maps them with `hydro_core::hw_error`.
pub mod clock;

pub use clock::{Clock, FixedWallClock, MonotonicClock, SystemWallClock, WallClock};

use std::time::Duration;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Analog quantities the controller samples every cycle.
///
/// `Tds` and `WaterLevel` report raw ADC counts; `Temperature` (°C) and
/// `Humidity` (%RH) are already in engineering units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalogChannel {
    Temperature,
    Humidity,
    Tds,
    WaterLevel,
}

/// Binary inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigitalInput {
    MaintenanceSwitch,
}

/// Pulse-timed inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PulseInput {
    /// Ultrasonic ranger echo (trigger is issued by the backend).
    UltrasonicEcho,
}

/// Switched outputs (relays, fan).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputChannel {
    /// Refill pump driven by the water-level hysteresis controller.
    MainPump,
    /// Nutrient concentrate pump driven by the dosing cycle.
    DosingPump,
    /// Mixing fan/stirrer run after each dose.
    Mixer,
    /// Drain pump, only energized in maintenance mode.
    Drain,
}

impl OutputChannel {
    pub const ALL: [OutputChannel; 4] = [
        OutputChannel::MainPump,
        OutputChannel::DosingPump,
        OutputChannel::Mixer,
        OutputChannel::Drain,
    ];
}

pub trait Sensor {
    /// Read an analog channel. A NaN result is treated like an error.
    fn read_analog(&mut self, channel: AnalogChannel) -> Result<f32, BoxError>;
    /// Read a digital input's electrical level (`true` = high).
    fn read_digital(&mut self, input: DigitalInput) -> Result<bool, BoxError>;
    /// Measure the width of a high pulse, waiting at most `timeout`.
    fn measure_pulse_width(
        &mut self,
        input: PulseInput,
        timeout: Duration,
    ) -> Result<Duration, BoxError>;
}

pub trait Actuator {
    /// Drive an output. Writes are idempotent and repeated every cycle.
    fn set_output(&mut self, channel: OutputChannel, on: bool) -> Result<(), BoxError>;
}

pub trait TelemetryTransport<R: ?Sized> {
    fn publish(&mut self, record: &R) -> Result<(), BoxError>;
    fn reconnect(&mut self) -> Result<(), BoxError>;
}

impl<T: Sensor + ?Sized> Sensor for Box<T> {
    fn read_analog(&mut self, channel: AnalogChannel) -> Result<f32, BoxError> {
        (**self).read_analog(channel)
    }
    fn read_digital(&mut self, input: DigitalInput) -> Result<bool, BoxError> {
        (**self).read_digital(input)
    }
    fn measure_pulse_width(
        &mut self,
        input: PulseInput,
        timeout: Duration,
    ) -> Result<Duration, BoxError> {
        (**self).measure_pulse_width(input, timeout)
    }
}

impl<T: Actuator + ?Sized> Actuator for Box<T> {
    fn set_output(&mut self, channel: OutputChannel, on: bool) -> Result<(), BoxError> {
        (**self).set_output(channel, on)
    }
}

impl<R: ?Sized, T: TelemetryTransport<R> + ?Sized> TelemetryTransport<R> for Box<T> {
    fn publish(&mut self, record: &R) -> Result<(), BoxError> {
        (**self).publish(record)
    }
    fn reconnect(&mut self) -> Result<(), BoxError> {
        (**self).reconnect()
    }
}
