//! Schmitt-trigger control for the refill pump.

use crate::config::LevelBand;

/// One step of a two-threshold (deadband) switch.
///
/// Turns on strictly below `lower`, off strictly above `upper`, and holds
/// `previous` anywhere in `[lower, upper]`.
#[inline]
pub fn decide(level: f32, lower: f32, upper: f32, previous: bool) -> bool {
    if level < lower {
        true
    } else if level > upper {
        false
    } else {
        previous
    }
}

/// Stateful wrapper that remembers the last intent between cycles.
#[derive(Debug, Clone)]
pub struct HysteresisController {
    band: LevelBand,
    active: bool,
}

impl HysteresisController {
    /// Starts inactive.
    pub fn new(band: LevelBand) -> Self {
        Self {
            band,
            active: false,
        }
    }

    /// Feed the current level and return the new intent.
    ///
    /// A missing or non-finite level holds the current intent.
    pub fn update(&mut self, level: Option<f32>) -> bool {
        if let Some(level) = level.filter(|l| l.is_finite()) {
            let next = decide(level, self.band.lower_pct, self.band.upper_pct, self.active);
            if next != self.active {
                tracing::info!(
                    level,
                    lower = self.band.lower_pct,
                    upper = self.band.upper_pct,
                    active = next,
                    "refill pump intent changed"
                );
            }
            self.active = next;
        }
        self.active
    }

    pub fn intent(&self) -> bool {
        self.active
    }

    pub fn band(&self) -> LevelBand {
        self.band
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_are_inside_the_deadband() {
        assert!(!decide(40.0, 40.0, 60.0, false));
        assert!(decide(40.0, 40.0, 60.0, true));
        assert!(decide(60.0, 40.0, 60.0, true));
        assert!(!decide(60.0, 40.0, 60.0, false));
    }

    #[test]
    fn missing_level_holds_intent() {
        let mut c = HysteresisController::new(LevelBand::default());
        assert!(c.update(Some(10.0)));
        assert!(c.update(None));
        assert!(c.update(Some(f32::NAN)));
        assert!(!c.update(Some(90.0)));
    }
}
