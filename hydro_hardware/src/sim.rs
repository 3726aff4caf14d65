//! Closed-loop simulated greenhouse tank.
//!
//! `SimulatedSensor` and `SimulatedActuator` share one `SimPlant`: pumps
//! that are switched on move the readings on the following cycles, so a
//! controller driving the simulation sees its own effect. The plant
//! advances one tick per TDS read, i.e. once per control cycle.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use hydro_traits::{
    Actuator, AnalogChannel, BoxError, DigitalInput, OutputChannel, PulseInput, Sensor,
};

use crate::error::HwError;

/// Full-scale count of the simulated 12-bit ADC.
pub const SIM_ADC_MAX: f32 = 4095.0;

/// Sensor reads that can be made to fail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimFaults {
    pub climate: bool,
    pub echo: bool,
    pub tds: bool,
    pub level: bool,
    pub switch: bool,
    pub outputs: bool,
}

#[derive(Debug, Clone)]
pub struct PlantState {
    pub temperature_c: f32,
    pub humidity_pct: f32,
    pub distance_cm: f32,
    /// Raw counts from the TDS probe.
    pub tds_raw: f32,
    /// Raw counts from the level probe.
    pub level_raw: f32,
    /// Electrical level of the maintenance switch input.
    pub switch_level: bool,
    pub main_pump: bool,
    pub dosing_pump: bool,
    pub mixer: bool,
    pub drain: bool,
    pub faults: SimFaults,
    /// Counts added per tick while the dosing pump runs.
    pub dose_rate: f32,
    /// Counts lost per tick to plant uptake.
    pub uptake: f32,
    /// Counts added per tick while the refill pump runs.
    pub fill_rate: f32,
    /// Counts removed per tick while draining.
    pub drain_rate: f32,
    /// Counts lost per tick to evaporation.
    pub evaporation: f32,
    /// Peak TDS noise amplitude in counts.
    pub noise: f32,
    rng: u32,
    ticks: u64,
}

impl Default for PlantState {
    fn default() -> Self {
        Self {
            temperature_c: 24.0,
            humidity_pct: 55.0,
            distance_cm: 35.0,
            tds_raw: 900.0,
            level_raw: 2048.0,
            // Released for an active-low switch
            switch_level: true,
            main_pump: false,
            dosing_pump: false,
            mixer: false,
            drain: false,
            faults: SimFaults::default(),
            dose_rate: 40.0,
            uptake: 2.0,
            fill_rate: 120.0,
            drain_rate: 200.0,
            evaporation: 8.0,
            noise: 0.0,
            rng: 0x2545_F491,
            ticks: 0,
        }
    }
}

impl PlantState {
    fn next_noise(&mut self) -> f32 {
        // xorshift32
        let mut x = self.rng;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.rng = x;
        ((x as f32) / (u32::MAX as f32) * 2.0 - 1.0) * self.noise
    }

    fn tick(&mut self) {
        self.ticks += 1;
        if self.dosing_pump {
            self.tds_raw += self.dose_rate;
        }
        self.tds_raw = (self.tds_raw - self.uptake).clamp(0.0, SIM_ADC_MAX);
        if self.main_pump {
            self.level_raw += self.fill_rate;
        }
        if self.drain {
            self.level_raw -= self.drain_rate;
        }
        self.level_raw = (self.level_raw - self.evaporation).clamp(0.0, SIM_ADC_MAX);
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

/// Shared handle to the simulated tank.
#[derive(Debug, Clone, Default)]
pub struct SimPlant {
    state: Rc<RefCell<PlantState>>,
}

impl SimPlant {
    pub fn new(state: PlantState) -> Self {
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    /// Inspect or change the plant between cycles.
    pub fn with<T>(&self, f: impl FnOnce(&mut PlantState) -> T) -> T {
        f(&mut self.state.borrow_mut())
    }

    pub fn sensor(&self) -> SimulatedSensor {
        SimulatedSensor {
            plant: self.clone(),
        }
    }

    pub fn actuator(&self) -> SimulatedActuator {
        SimulatedActuator {
            plant: self.clone(),
        }
    }
}

fn injected(what: &'static str) -> BoxError {
    Box::new(HwError::InvalidReading(format!("simulated {what} fault")))
}

/// Simulated sensor implementation
#[derive(Debug, Clone)]
pub struct SimulatedSensor {
    plant: SimPlant,
}

impl Sensor for SimulatedSensor {
    fn read_analog(&mut self, channel: AnalogChannel) -> Result<f32, BoxError> {
        self.plant.with(|s| match channel {
            AnalogChannel::Temperature if s.faults.climate => Err(injected("temperature")),
            AnalogChannel::Humidity if s.faults.climate => Err(injected("humidity")),
            AnalogChannel::Tds if s.faults.tds => Err(injected("tds")),
            AnalogChannel::WaterLevel if s.faults.level => Err(injected("level")),
            AnalogChannel::Temperature => Ok(s.temperature_c),
            AnalogChannel::Humidity => Ok(s.humidity_pct),
            AnalogChannel::Tds => {
                s.tick();
                let n = s.next_noise();
                Ok((s.tds_raw + n).clamp(0.0, SIM_ADC_MAX))
            }
            AnalogChannel::WaterLevel => Ok(s.level_raw),
        })
    }

    fn read_digital(&mut self, _input: DigitalInput) -> Result<bool, BoxError> {
        self.plant.with(|s| {
            if s.faults.switch {
                Err(injected("switch"))
            } else {
                Ok(s.switch_level)
            }
        })
    }

    fn measure_pulse_width(
        &mut self,
        _input: PulseInput,
        timeout: Duration,
    ) -> Result<Duration, BoxError> {
        self.plant.with(|s| {
            if !s.distance_cm.is_finite() || s.distance_cm < 0.0 {
                return Err(Box::new(HwError::InvalidReading(format!(
                    "simulated distance {} cm",
                    s.distance_cm
                ))) as BoxError);
            }
            // cm = us * 0.034 / 2
            let echo = Duration::from_micros((s.distance_cm * 2.0 / 0.034).round() as u64);
            if s.faults.echo || echo > timeout {
                Err(Box::new(HwError::EchoTimeout) as BoxError)
            } else {
                Ok(echo)
            }
        })
    }
}

/// Simulated relay board
#[derive(Debug, Clone)]
pub struct SimulatedActuator {
    plant: SimPlant,
}

impl Actuator for SimulatedActuator {
    fn set_output(&mut self, channel: OutputChannel, on: bool) -> Result<(), BoxError> {
        self.plant.with(|s| {
            if s.faults.outputs {
                return Err(Box::new(HwError::Gpio("simulated relay fault".into())) as BoxError);
            }
            let slot = match channel {
                OutputChannel::MainPump => &mut s.main_pump,
                OutputChannel::DosingPump => &mut s.dosing_pump,
                OutputChannel::Mixer => &mut s.mixer,
                OutputChannel::Drain => &mut s.drain,
            };
            if *slot != on {
                tracing::debug!(?channel, on, "simulated relay switched");
            }
            *slot = on;
            Ok(())
        })
    }
}
