//! Threshold alerts derived from the current metrics.

use crate::config::Thresholds;

/// Latest accepted value of every monitored quantity.
///
/// `None` means no valid reading has been accepted yet; a failed read
/// leaves the previous value in place.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Metrics {
    pub temperature_c: Option<f32>,
    pub humidity_pct: Option<f32>,
    pub distance_cm: Option<f32>,
    /// Smoothed (moving-average) TDS
    pub tds_ppm: Option<f32>,
    pub water_level_pct: Option<u8>,
}

/// One flag per monitored quantity; recomputed every cycle, never latched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertFlags {
    pub temperature: bool,
    pub humidity: bool,
    pub distance: bool,
    pub tds: bool,
    pub water_level: bool,
}

impl AlertFlags {
    pub fn any(&self) -> bool {
        self.temperature || self.humidity || self.distance || self.tds || self.water_level
    }
}

/// Compare metrics against thresholds. Absent metrics never alert.
pub fn evaluate(metrics: &Metrics, thresholds: &Thresholds) -> AlertFlags {
    let band = thresholds.water_level;
    AlertFlags {
        temperature: metrics
            .temperature_c
            .is_some_and(|t| t > thresholds.temperature_max_c),
        humidity: metrics
            .humidity_pct
            .is_some_and(|h| h > thresholds.humidity_max_pct),
        distance: metrics
            .distance_cm
            .is_some_and(|d| d < thresholds.distance_min_cm),
        tds: metrics.tds_ppm.is_some_and(|t| t < thresholds.tds_min_ppm),
        water_level: metrics.water_level_pct.is_some_and(|l| {
            let l = f32::from(l);
            l < band.lower_pct || l > band.upper_pct
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warm_up_raises_nothing() {
        let flags = evaluate(&Metrics::default(), &Thresholds::default());
        assert_eq!(flags, AlertFlags::default());
        assert!(!flags.any());
    }

    #[test]
    fn each_alert_fires_past_its_threshold() {
        let m = Metrics {
            temperature_c: Some(31.0),
            humidity_pct: Some(71.0),
            distance_cm: Some(9.5),
            tds_ppm: Some(499.0),
            water_level_pct: Some(39),
        };
        let flags = evaluate(&m, &Thresholds::default());
        assert!(flags.temperature && flags.humidity && flags.distance);
        assert!(flags.tds && flags.water_level);
    }
}
