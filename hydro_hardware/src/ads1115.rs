//! ADS1115 16-bit ADC over I2C, single-shot single-ended reads.

use std::time::{Duration, Instant};

use rppal::i2c::I2c;
use tracing::trace;

use crate::error::{HwError, Result};

const REG_CONVERSION: u8 = 0x00;
const REG_CONFIG: u8 = 0x01;
/// Start a single conversion / conversion finished.
const OS: u16 = 0x8000;
/// AINx vs GND mux base.
const MUX_SINGLE_ENDED: u16 = 0b100;
/// PGA ±4.096 V.
const PGA_4V096: u16 = 0b001;
const MODE_SINGLE_SHOT: u16 = 1 << 8;
/// 128 samples per second.
const DR_128: u16 = 0b100 << 5;
const COMP_DISABLE: u16 = 0b11;
/// One conversion at 128 SPS takes ~7.8 ms.
const CONVERSION_TIMEOUT: Duration = Duration::from_millis(20);

pub struct Ads1115 {
    i2c: I2c,
}

impl Ads1115 {
    pub fn open(bus: u8, address: u16) -> Result<Self> {
        let mut i2c = I2c::with_bus(bus).map_err(|e| HwError::I2c(e.to_string()))?;
        i2c.set_slave_address(address)
            .map_err(|e| HwError::I2c(e.to_string()))?;
        Ok(Self { i2c })
    }

    /// Raw conversion result of one input, negative values clamped to 0.
    pub fn read_counts(&mut self, channel: u8) -> Result<u16> {
        if channel > 3 {
            return Err(HwError::InvalidChannel(channel));
        }
        let config = OS
            | ((MUX_SINGLE_ENDED | u16::from(channel)) << 12)
            | (PGA_4V096 << 9)
            | MODE_SINGLE_SHOT
            | DR_128
            | COMP_DISABLE;
        let [hi, lo] = config.to_be_bytes();
        self.i2c
            .write(&[REG_CONFIG, hi, lo])
            .map_err(|e| HwError::I2c(e.to_string()))?;

        let deadline = Instant::now() + CONVERSION_TIMEOUT;
        loop {
            std::thread::sleep(Duration::from_millis(2));
            if self.read_register(REG_CONFIG)? & OS != 0 {
                break;
            }
            if Instant::now() >= deadline {
                return Err(HwError::Timeout);
            }
        }

        let raw = self.read_register(REG_CONVERSION)? as i16;
        trace!(channel, raw, "ads1115 conversion");
        Ok(raw.max(0) as u16)
    }

    fn read_register(&mut self, reg: u8) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(&[reg], &mut buf)
            .map_err(|e| HwError::I2c(e.to_string()))?;
        Ok(u16::from_be_bytes(buf))
    }
}
