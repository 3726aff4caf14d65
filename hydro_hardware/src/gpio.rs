//! Raspberry Pi GPIO backends: relay board, maintenance switch and the
//! ultrasonic ranger, plus the combined hardware sensor.

use std::path::PathBuf;
use std::time::Duration;

use hydro_traits::{
    Actuator, AnalogChannel, BoxError, DigitalInput, OutputChannel, PulseInput, Sensor,
};
use rppal::gpio::{Gpio, InputPin, OutputPin};

use crate::ads1115::Ads1115;
use crate::error::{HwError, Result};
use crate::iio::DhtIio;
use crate::util::measure_high_pulse;

fn gpio_err(e: rppal::gpio::Error) -> HwError {
    HwError::Gpio(e.to_string())
}

/// BCM pin numbers of the four relays.
#[derive(Debug, Clone, Copy)]
pub struct RelayPins {
    pub main_pump: u8,
    pub dosing_pump: u8,
    pub mixer: u8,
    pub drain: u8,
    /// Relay modules that energize on a low input.
    pub active_low: bool,
}

pub struct GpioRelays {
    main_pump: OutputPin,
    dosing_pump: OutputPin,
    mixer: OutputPin,
    drain: OutputPin,
    active_low: bool,
}

impl GpioRelays {
    /// Claim the pins with every relay de-energized.
    pub fn open(pins: RelayPins) -> Result<Self> {
        let gpio = Gpio::new().map_err(gpio_err)?;
        let claim = |pin: u8| -> Result<OutputPin> {
            let mut out = gpio.get(pin).map_err(gpio_err)?.into_output();
            // reset_on_drop would float the relay inputs on exit
            out.set_reset_on_drop(false);
            Ok(out)
        };
        let mut relays = Self {
            main_pump: claim(pins.main_pump)?,
            dosing_pump: claim(pins.dosing_pump)?,
            mixer: claim(pins.mixer)?,
            drain: claim(pins.drain)?,
            active_low: pins.active_low,
        };
        for channel in OutputChannel::ALL {
            relays.drive(channel, false);
        }
        Ok(relays)
    }

    fn drive(&mut self, channel: OutputChannel, on: bool) {
        let high = on != self.active_low;
        let pin = match channel {
            OutputChannel::MainPump => &mut self.main_pump,
            OutputChannel::DosingPump => &mut self.dosing_pump,
            OutputChannel::Mixer => &mut self.mixer,
            OutputChannel::Drain => &mut self.drain,
        };
        if high {
            pin.set_high();
        } else {
            pin.set_low();
        }
    }
}

impl Actuator for GpioRelays {
    fn set_output(&mut self, channel: OutputChannel, on: bool) -> std::result::Result<(), BoxError> {
        self.drive(channel, on);
        Ok(())
    }
}

/// Wiring of every input the controller reads.
#[derive(Debug, Clone)]
pub struct SensorWiring {
    pub maintenance_switch: u8,
    pub ultrasonic_trigger: u8,
    pub ultrasonic_echo: u8,
    pub i2c_bus: u8,
    pub adc_address: u16,
    pub tds_adc_channel: u8,
    pub level_adc_channel: u8,
    pub dht_iio_device: PathBuf,
}

/// ADS1115 for the analog probes, IIO DHT11 for climate, GPIO for the
/// switch and the ultrasonic ranger.
pub struct HardwareSensor {
    switch: InputPin,
    trigger: OutputPin,
    echo: InputPin,
    adc: Ads1115,
    tds_channel: u8,
    level_channel: u8,
    dht: DhtIio,
}

impl HardwareSensor {
    pub fn open(w: SensorWiring) -> Result<Self> {
        for ch in [w.tds_adc_channel, w.level_adc_channel] {
            if ch > 3 {
                return Err(HwError::InvalidChannel(ch));
            }
        }
        let gpio = Gpio::new().map_err(gpio_err)?;
        let switch = gpio
            .get(w.maintenance_switch)
            .map_err(gpio_err)?
            .into_input_pullup();
        let mut trigger = gpio
            .get(w.ultrasonic_trigger)
            .map_err(gpio_err)?
            .into_output();
        trigger.set_low();
        let echo = gpio.get(w.ultrasonic_echo).map_err(gpio_err)?.into_input();
        let adc = Ads1115::open(w.i2c_bus, w.adc_address)?;
        tracing::info!(
            adc_address = w.adc_address,
            dht = %w.dht_iio_device.display(),
            "hardware sensors opened"
        );
        Ok(Self {
            switch,
            trigger,
            echo,
            adc,
            tds_channel: w.tds_adc_channel,
            level_channel: w.level_adc_channel,
            dht: DhtIio::new(w.dht_iio_device),
        })
    }

    fn ping(&mut self, timeout: Duration) -> Result<Duration> {
        self.trigger.set_low();
        spin_for(Duration::from_micros(2));
        self.trigger.set_high();
        spin_for(Duration::from_micros(10));
        self.trigger.set_low();
        let echo = &self.echo;
        measure_high_pulse(|| echo.is_high(), timeout)
    }
}

fn spin_for(d: Duration) {
    let end = std::time::Instant::now() + d;
    while std::time::Instant::now() < end {
        std::hint::spin_loop();
    }
}

impl Sensor for HardwareSensor {
    fn read_analog(&mut self, channel: AnalogChannel) -> std::result::Result<f32, BoxError> {
        let v = match channel {
            AnalogChannel::Temperature => self.dht.temperature_c()?,
            AnalogChannel::Humidity => self.dht.humidity_pct()?,
            AnalogChannel::Tds => f32::from(self.adc.read_counts(self.tds_channel)?),
            AnalogChannel::WaterLevel => f32::from(self.adc.read_counts(self.level_channel)?),
        };
        Ok(v)
    }

    fn read_digital(&mut self, _input: DigitalInput) -> std::result::Result<bool, BoxError> {
        Ok(self.switch.is_high())
    }

    fn measure_pulse_width(
        &mut self,
        _input: PulseInput,
        timeout: Duration,
    ) -> std::result::Result<Duration, BoxError> {
        Ok(self.ping(timeout)?)
    }
}
