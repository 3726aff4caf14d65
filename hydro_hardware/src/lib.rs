//! Hardware backends for the hydroponic controller.
//!
//! Always available: the closed-loop simulation, JSON-lines telemetry
//! sinks, the IIO DHT11 reader and the pulse-timing helpers. The
//! `hardware` feature adds Raspberry Pi GPIO relays and inputs plus the
//! ADS1115 ADC (Linux only).
pub mod error;
pub mod iio;
pub mod sim;
pub mod transport;
pub mod util;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod ads1115;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod gpio;

pub use sim::{PlantState, SimFaults, SimPlant, SimulatedActuator, SimulatedSensor};
pub use transport::{JsonLinesTransport, JsonlFileTransport, StatusFile};

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub use gpio::{GpioRelays, HardwareSensor, RelayPins, SensorWiring};
