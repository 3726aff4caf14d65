//! Test and helper mocks for hydro_core.
//!
//! Both mocks hand out a cloneable handle so a test can keep inspecting or
//! scripting them after they have been boxed into a controller.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use hydro_traits::{
    Actuator, AnalogChannel, BoxError, DigitalInput, OutputChannel, PulseInput, Sensor,
    TelemetryTransport,
};

use crate::status::Outputs;
use crate::telemetry::TelemetryRecord;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Values returned by `ScriptedSensor`. `None` makes that read fail.
#[derive(Debug, Clone)]
pub struct SensorScript {
    pub temperature: Option<f32>,
    pub humidity: Option<f32>,
    /// Raw ADC counts.
    pub tds_raw: Option<f32>,
    /// Raw ADC counts.
    pub level_raw: Option<f32>,
    pub echo: Option<Duration>,
    pub switch_level: Option<bool>,
    /// Queued raw TDS readings consumed before falling back to `tds_raw`.
    pub tds_queue: VecDeque<f32>,
}

impl Default for SensorScript {
    fn default() -> Self {
        Self {
            temperature: Some(24.0),
            humidity: Some(55.0),
            tds_raw: Some(1000.0),
            level_raw: Some(2048.0),
            echo: Some(Duration::from_micros(1_000)),
            // Released for the default active-low switch
            switch_level: Some(true),
            tds_queue: VecDeque::new(),
        }
    }
}

/// Sensor whose readings are set from the test.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSensor {
    script: Arc<Mutex<SensorScript>>,
}

impl ScriptedSensor {
    pub fn new(script: SensorScript) -> Self {
        Self {
            script: Arc::new(Mutex::new(script)),
        }
    }

    /// Mutate the script in place.
    pub fn update(&self, f: impl FnOnce(&mut SensorScript)) {
        f(&mut lock(&self.script));
    }
}

fn missing(what: &str) -> BoxError {
    Box::new(std::io::Error::other(format!("{what} unavailable")))
}

impl Sensor for ScriptedSensor {
    fn read_analog(&mut self, channel: AnalogChannel) -> Result<f32, BoxError> {
        let mut s = lock(&self.script);
        let v = match channel {
            AnalogChannel::Temperature => s.temperature,
            AnalogChannel::Humidity => s.humidity,
            AnalogChannel::Tds => s.tds_queue.pop_front().or(s.tds_raw),
            AnalogChannel::WaterLevel => s.level_raw,
        };
        v.ok_or_else(|| missing("analog channel"))
    }

    fn read_digital(&mut self, _input: DigitalInput) -> Result<bool, BoxError> {
        lock(&self.script)
            .switch_level
            .ok_or_else(|| missing("switch"))
    }

    fn measure_pulse_width(
        &mut self,
        _input: PulseInput,
        _timeout: Duration,
    ) -> Result<Duration, BoxError> {
        lock(&self.script)
            .echo
            .ok_or_else(|| missing("echo (timeout)"))
    }
}

#[derive(Debug, Default)]
struct Recorded {
    state: Outputs,
    writes: usize,
    fail: bool,
}

/// Actuator that records the last commanded state of every output.
#[derive(Debug, Clone, Default)]
pub struct RecordingActuator {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingActuator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last written state.
    pub fn outputs(&self) -> Outputs {
        lock(&self.inner).state
    }

    /// Total `set_output` calls, failed ones included.
    pub fn writes(&self) -> usize {
        lock(&self.inner).writes
    }

    /// Make every subsequent write fail.
    pub fn set_failing(&self, fail: bool) {
        lock(&self.inner).fail = fail;
    }
}

impl Actuator for RecordingActuator {
    fn set_output(&mut self, channel: OutputChannel, on: bool) -> Result<(), BoxError> {
        let mut r = lock(&self.inner);
        r.writes += 1;
        if r.fail {
            return Err(Box::new(std::io::Error::other("relay driver fault")));
        }
        match channel {
            OutputChannel::MainPump => r.state.main_pump = on,
            OutputChannel::DosingPump => r.state.dosing_pump = on,
            OutputChannel::Mixer => r.state.mixer = on,
            OutputChannel::Drain => r.state.drain = on,
        }
        Ok(())
    }
}

#[derive(Debug)]
struct Link {
    connected: bool,
    reconnect_failures: u32,
    published: Vec<TelemetryRecord>,
    publish_calls: usize,
    reconnect_calls: usize,
}

/// In-memory transport that can be disconnected on demand.
///
/// `publish` fails while disconnected; `reconnect` fails the scripted
/// number of times, then restores the link.
#[derive(Debug, Clone)]
pub struct ScriptedTransport {
    link: Arc<Mutex<Link>>,
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self {
            link: Arc::new(Mutex::new(Link {
                connected: true,
                reconnect_failures: 0,
                published: Vec::new(),
                publish_calls: 0,
                reconnect_calls: 0,
            })),
        }
    }
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the link; the next `reconnect_failures` reconnects fail too.
    pub fn disconnect(&self, reconnect_failures: u32) {
        let mut l = lock(&self.link);
        l.connected = false;
        l.reconnect_failures = reconnect_failures;
    }

    pub fn published(&self) -> Vec<TelemetryRecord> {
        lock(&self.link).published.clone()
    }

    pub fn publish_calls(&self) -> usize {
        lock(&self.link).publish_calls
    }

    pub fn reconnect_calls(&self) -> usize {
        lock(&self.link).reconnect_calls
    }
}

impl TelemetryTransport<TelemetryRecord> for ScriptedTransport {
    fn publish(&mut self, record: &TelemetryRecord) -> Result<(), BoxError> {
        let mut l = lock(&self.link);
        l.publish_calls += 1;
        if !l.connected {
            return Err(missing("telemetry endpoint"));
        }
        l.published.push(record.clone());
        Ok(())
    }

    fn reconnect(&mut self) -> Result<(), BoxError> {
        let mut l = lock(&self.link);
        l.reconnect_calls += 1;
        if l.reconnect_failures > 0 {
            l.reconnect_failures -= 1;
            return Err(missing("network"));
        }
        l.connected = true;
        Ok(())
    }
}
