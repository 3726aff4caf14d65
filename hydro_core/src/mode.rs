//! Maintenance switch arbitration.

use crate::config::MaintenanceCfg;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperatingMode {
    #[default]
    Normal,
    /// Automatic control suspended; drain forced on.
    Maintenance,
}

/// Decides the operating mode from the switch level read at the top of
/// each cycle.
#[derive(Debug, Clone)]
pub struct ModeArbiter {
    active_low: bool,
    mode: OperatingMode,
}

impl ModeArbiter {
    pub fn new(cfg: MaintenanceCfg) -> Self {
        Self {
            active_low: cfg.active_low,
            mode: OperatingMode::Normal,
        }
    }

    /// Apply a switch reading. `None` (failed read) keeps the current mode.
    pub fn update(&mut self, level: Option<bool>) -> OperatingMode {
        let Some(level) = level else {
            return self.mode;
        };
        let asserted = level != self.active_low;
        let next = if asserted {
            OperatingMode::Maintenance
        } else {
            OperatingMode::Normal
        };
        if next != self.mode {
            match next {
                OperatingMode::Maintenance => {
                    tracing::warn!("maintenance switch asserted; automatic control suspended")
                }
                OperatingMode::Normal => {
                    tracing::info!("maintenance switch released; resuming automatic control")
                }
            }
            self.mode = next;
        }
        self.mode
    }

    pub fn mode(&self) -> OperatingMode {
        self.mode
    }
}
