//! Raw probe readings to engineering units.

use std::time::Duration;

/// Water temperature assumed when compensation is off (°C).
pub const REFERENCE_TEMP_C: f32 = 25.0;
/// Conductivity drift per °C relative to the reference temperature.
const TEMP_COEFF_PER_C: f32 = 0.02;
/// Speed of sound in cm per microsecond.
const SOUND_CM_PER_US: f32 = 0.034;

/// TDS probe model: ADC counts → volts → compensated ppm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TdsCalibration {
    pub vref: f32,
    pub adc_max: f32,
    pub k_value: f32,
    pub temperature_compensation: bool,
}

impl Default for TdsCalibration {
    fn default() -> Self {
        Self {
            vref: 3.3,
            adc_max: 4095.0,
            k_value: 1.0,
            temperature_compensation: false,
        }
    }
}

impl TdsCalibration {
    /// Convert a raw ADC reading to ppm.
    ///
    /// `water_temp_c` is only used when compensation is enabled; `None`
    /// falls back to the reference temperature. Negative raw counts clamp
    /// to zero. Returns `None` for non-finite input.
    pub fn to_ppm(&self, raw: f32, water_temp_c: Option<f32>) -> Option<f32> {
        if !raw.is_finite() {
            return None;
        }
        let voltage = raw.max(0.0) * (self.vref / self.adc_max);
        let temp = if self.temperature_compensation {
            water_temp_c
                .filter(|t| t.is_finite())
                .unwrap_or(REFERENCE_TEMP_C)
        } else {
            REFERENCE_TEMP_C
        };
        let coeff = 1.0 + TEMP_COEFF_PER_C * (temp - REFERENCE_TEMP_C);
        if coeff <= 0.0 {
            return None;
        }
        let v = voltage / coeff;
        let ppm = (133.42 * v * v * v - 255.86 * v * v + 857.39 * v) * self.k_value;
        ppm.is_finite().then_some(ppm)
    }
}

/// Resistive level probe: linear map of `[dry_raw, wet_raw]` onto 0..=100 %.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelCalibration {
    pub dry_raw: f32,
    pub wet_raw: f32,
}

impl Default for LevelCalibration {
    fn default() -> Self {
        Self {
            dry_raw: 0.0,
            wet_raw: 4095.0,
        }
    }
}

impl LevelCalibration {
    /// Whole percent, truncated toward zero and clamped to 0..=100.
    pub fn to_percent(&self, raw: f32) -> Option<u8> {
        let span = self.wet_raw - self.dry_raw;
        if !raw.is_finite() || span == 0.0 || !span.is_finite() {
            return None;
        }
        let pct = ((raw - self.dry_raw) * 100.0 / span).trunc();
        Some(pct.clamp(0.0, 100.0) as u8)
    }
}

/// Round-trip echo time to one-way distance in centimetres.
pub fn echo_to_cm(echo: Duration) -> f32 {
    echo.as_micros() as f32 * SOUND_CM_PER_US / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_raw_is_zero_ppm() {
        let cal = TdsCalibration::default();
        assert_eq!(cal.to_ppm(0.0, None), Some(0.0));
    }

    #[test]
    fn one_volt_matches_polynomial() {
        // raw that yields exactly 1.0 V at 3.3 Vref / 4095 counts
        let cal = TdsCalibration::default();
        let raw = 4095.0 / 3.3;
        let ppm = cal.to_ppm(raw, None).unwrap();
        let expected = 133.42 - 255.86 + 857.39;
        assert!((ppm - expected).abs() < 0.05, "ppm={ppm}");
    }

    #[test]
    fn compensation_lowers_reading_when_warm() {
        let cal = TdsCalibration {
            temperature_compensation: true,
            ..TdsCalibration::default()
        };
        let at_ref = cal.to_ppm(2000.0, Some(25.0)).unwrap();
        let warm = cal.to_ppm(2000.0, Some(35.0)).unwrap();
        assert!(warm < at_ref);
        // without compensation the temperature is ignored
        let plain = TdsCalibration::default();
        assert_eq!(plain.to_ppm(2000.0, Some(35.0)), plain.to_ppm(2000.0, None));
    }

    #[test]
    fn nan_raw_is_rejected() {
        assert_eq!(TdsCalibration::default().to_ppm(f32::NAN, None), None);
        assert_eq!(LevelCalibration::default().to_percent(f32::NAN), None);
    }

    #[test]
    fn level_maps_and_clamps() {
        let cal = LevelCalibration::default();
        assert_eq!(cal.to_percent(0.0), Some(0));
        assert_eq!(cal.to_percent(4095.0), Some(100));
        assert_eq!(cal.to_percent(2047.0), Some(49));
        assert_eq!(cal.to_percent(5000.0), Some(100));
        assert_eq!(cal.to_percent(-10.0), Some(0));
    }

    #[test]
    fn inverted_level_probe_is_supported() {
        let cal = LevelCalibration {
            dry_raw: 3000.0,
            wet_raw: 1000.0,
        };
        assert_eq!(cal.to_percent(3000.0), Some(0));
        assert_eq!(cal.to_percent(1000.0), Some(100));
        assert_eq!(cal.to_percent(2000.0), Some(50));
    }

    #[test]
    fn echo_conversion() {
        // 1000 us round trip = 17 cm
        let cm = echo_to_cm(Duration::from_micros(1000));
        assert!((cm - 17.0).abs() < 1e-4);
    }
}
