//! DHT11 temperature/humidity via the Linux IIO `dht11` driver.
//!
//! The driver exposes `in_temp_input` (milli-°C) and
//! `in_humidityrelative_input` (milli-%RH) under the device directory.
//! Reads frequently fail with EIO when the sensor misses a handshake; the
//! controller treats that as a skipped reading.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{HwError, Result};

const TEMP_FILE: &str = "in_temp_input";
const HUMIDITY_FILE: &str = "in_humidityrelative_input";

#[derive(Debug, Clone)]
pub struct DhtIio {
    dir: PathBuf,
}

impl DhtIio {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn temperature_c(&self) -> Result<f32> {
        read_milli(&self.dir.join(TEMP_FILE))
    }

    pub fn humidity_pct(&self) -> Result<f32> {
        read_milli(&self.dir.join(HUMIDITY_FILE))
    }
}

fn read_milli(path: &Path) -> Result<f32> {
    let text = fs::read_to_string(path)?;
    let milli: i64 = text
        .trim()
        .parse()
        .map_err(|_| HwError::InvalidReading(format!("{}: {:?}", path.display(), text.trim())))?;
    Ok(milli as f32 / 1000.0)
}
