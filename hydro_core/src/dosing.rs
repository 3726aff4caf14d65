//! Timed nutrient dosing cycle: Idle → Dispensing → Mixing → Idle.
//!
//! Only elapsed monotonic time gates the Dispensing and Mixing exits, so
//! every dose and every mix runs for at least its configured duration no
//! matter how the concentration moves meanwhile. Timestamps are
//! milliseconds since the controller epoch.

use serde::Serialize;

use crate::config::DosingCfg;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DosingPhase {
    Idle,
    Dispensing { started_ms: u64 },
    Mixing { started_ms: u64 },
}

/// Phase name without timing, for telemetry and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseKind {
    Idle,
    Dispensing,
    Mixing,
}

impl DosingPhase {
    pub fn kind(&self) -> PhaseKind {
        match self {
            DosingPhase::Idle => PhaseKind::Idle,
            DosingPhase::Dispensing { .. } => PhaseKind::Dispensing,
            DosingPhase::Mixing { .. } => PhaseKind::Mixing,
        }
    }

    /// Dosing pump runs only while dispensing.
    pub fn dosing_pump_on(&self) -> bool {
        matches!(self, DosingPhase::Dispensing { .. })
    }

    /// Mixer runs only while mixing.
    pub fn mixer_on(&self) -> bool {
        matches!(self, DosingPhase::Mixing { .. })
    }
}

/// Pure transition function.
///
/// A zero TDS reading means the probe has not warmed up and never starts a
/// dose; a missing reading behaves the same.
pub fn next_phase(
    phase: DosingPhase,
    now_ms: u64,
    tds_ppm: Option<f32>,
    threshold_ppm: f32,
    cfg: &DosingCfg,
) -> DosingPhase {
    match phase {
        DosingPhase::Idle => match tds_ppm {
            Some(tds) if tds != 0.0 && tds < threshold_ppm => DosingPhase::Dispensing {
                started_ms: now_ms,
            },
            _ => DosingPhase::Idle,
        },
        DosingPhase::Dispensing { started_ms } => {
            if now_ms.saturating_sub(started_ms) >= cfg.dispense_ms {
                DosingPhase::Mixing { started_ms: now_ms }
            } else {
                phase
            }
        }
        DosingPhase::Mixing { started_ms } => {
            if now_ms.saturating_sub(started_ms) >= cfg.mix_ms {
                DosingPhase::Idle
            } else {
                phase
            }
        }
    }
}

/// Owns the current phase and applies `next_phase` once per control cycle.
#[derive(Debug, Clone)]
pub struct DosingStateMachine {
    cfg: DosingCfg,
    threshold_ppm: f32,
    phase: DosingPhase,
    last_transition_ms: Option<u64>,
    doses_completed: u64,
}

impl DosingStateMachine {
    pub fn new(cfg: DosingCfg, threshold_ppm: f32) -> Self {
        Self {
            cfg,
            threshold_ppm,
            phase: DosingPhase::Idle,
            last_transition_ms: None,
            doses_completed: 0,
        }
    }

    /// Evaluate one transition and return the resulting phase.
    pub fn update(&mut self, now_ms: u64, tds_ppm: Option<f32>) -> DosingPhase {
        let next = next_phase(self.phase, now_ms, tds_ppm, self.threshold_ppm, &self.cfg);
        if next != self.phase {
            if matches!(self.phase, DosingPhase::Mixing { .. }) {
                self.doses_completed += 1;
            }
            tracing::info!(
                from = ?self.phase.kind(),
                to = ?next.kind(),
                now_ms,
                tds_ppm,
                "dosing phase transition"
            );
            self.phase = next;
            self.last_transition_ms = Some(now_ms);
        }
        self.phase
    }

    pub fn phase(&self) -> DosingPhase {
        self.phase
    }

    /// Time of the most recent transition, including entries into Idle.
    pub fn last_transition_ms(&self) -> Option<u64> {
        self.last_transition_ms
    }

    /// Completed Dispensing + Mixing cycles.
    pub fn doses_completed(&self) -> u64 {
        self.doses_completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn above_threshold_stays_idle() {
        let cfg = DosingCfg::default();
        assert_eq!(
            next_phase(DosingPhase::Idle, 0, Some(800.0), 500.0, &cfg),
            DosingPhase::Idle
        );
        assert_eq!(
            next_phase(DosingPhase::Idle, 0, Some(500.0), 500.0, &cfg),
            DosingPhase::Idle
        );
    }

    #[test]
    fn missing_reading_stays_idle() {
        let cfg = DosingCfg::default();
        assert_eq!(
            next_phase(DosingPhase::Idle, 0, None, 500.0, &cfg),
            DosingPhase::Idle
        );
    }

    #[test]
    fn dispensing_ignores_concentration() {
        let cfg = DosingCfg::default();
        let p = DosingPhase::Dispensing { started_ms: 100 };
        // concentration already recovered, still dispensing until the dwell elapses
        assert_eq!(next_phase(p, 1_000, Some(900.0), 500.0, &cfg), p);
    }

    #[test]
    fn completed_cycle_is_counted() {
        let mut m = DosingStateMachine::new(DosingCfg::default(), 500.0);
        m.update(0, Some(100.0));
        m.update(2_000, Some(100.0));
        assert_eq!(m.doses_completed(), 0);
        m.update(12_000, Some(100.0));
        assert_eq!(m.phase(), DosingPhase::Idle);
        assert_eq!(m.doses_completed(), 1);
        assert_eq!(m.last_transition_ms(), Some(12_000));
    }
}
