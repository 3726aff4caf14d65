//! Per-cycle results returned from the control loop.

use hydro_traits::OutputChannel;

use crate::alerts::{AlertFlags, Metrics};
use crate::dosing::DosingPhase;
use crate::mode::OperatingMode;

/// Commanded state of every output for one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Outputs {
    pub main_pump: bool,
    pub dosing_pump: bool,
    pub mixer: bool,
    pub drain: bool,
}

impl Outputs {
    /// Drain on, everything else off.
    pub fn maintenance() -> Self {
        Self {
            drain: true,
            ..Self::default()
        }
    }

    pub fn get(&self, channel: OutputChannel) -> bool {
        match channel {
            OutputChannel::MainPump => self.main_pump,
            OutputChannel::DosingPump => self.dosing_pump,
            OutputChannel::Mixer => self.mixer,
            OutputChannel::Drain => self.drain,
        }
    }
}

/// Which sensor reads failed this cycle. A failed metric keeps its
/// previous value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SensorFaults {
    pub maintenance_switch: bool,
    pub climate: bool,
    pub distance: bool,
    pub tds: bool,
    pub water_level: bool,
}

impl SensorFaults {
    pub fn count(&self) -> usize {
        [
            self.maintenance_switch,
            self.climate,
            self.distance,
            self.tds,
            self.water_level,
        ]
        .into_iter()
        .filter(|f| *f)
        .count()
    }
}

/// Result of one `Controller::step`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleReport {
    /// Milliseconds since the controller epoch at the start of the cycle.
    pub at_ms: u64,
    pub mode: OperatingMode,
    pub metrics: Metrics,
    pub alerts: AlertFlags,
    pub phase: DosingPhase,
    pub outputs: Outputs,
    pub faults: SensorFaults,
    /// Output writes that returned an error.
    pub output_errors: usize,
}
