//! Temperature + humidity sensor (DHT22-class probe).
//!
//! Two sub-devices: index 0 is temperature, index 1 humidity.  Readings are
//! taken on a fixed interval and only reported when either value moved by
//! more than the configured threshold.
//!
//! The probe needs a minimum quiet time between two samples.  Instead of
//! blocking until it has elapsed, `ready` waits for the sample deadline
//! like any other not-ready sensor, so the node can sleep through it.

use log::{debug, warn};

use crate::config::{NodeConfig, TemperatureUnit};
use crate::device::{Device, DeviceId};
use crate::error::ProbeError;
use crate::message::{DataType, Payload, SensorType};
use crate::ports::{Millis, NodeIo};
use crate::sensors::interval::IntervalTimer;
use crate::sensors::{Deadline, Readiness, Sensor};

/// Extra settle time added to the probe's own minimum sampling period.
const SAMPLE_FUDGE_MS: Millis = 100;

/// Decimals carried in reported values.
const REPORT_DECIMALS: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateReading {
    pub celsius: f32,
    /// Relative humidity in percent.
    pub humidity: f32,
}

/// A combined temperature/humidity probe.
pub trait ClimateProbe {
    fn read(&mut self) -> Result<ClimateReading, ProbeError>;

    /// Shortest time between two reads the probe tolerates.
    fn min_sampling_period(&self) -> Millis;
}

pub struct ClimateSensor<P> {
    device: Device,
    probe: P,
    timer: IntervalTimer,
    next_sample: Millis,
    threshold: f32,
    unit: TemperatureUnit,
    last_temp: f32,
    last_hum: f32,
}

impl<P: ClimateProbe> ClimateSensor<P> {
    pub fn new(probe: P, id: DeviceId, config: &NodeConfig, now: Millis) -> Self {
        let mut device = Device::new(SensorType::TEMP, DataType::TEMP, id, 2, Some("climate"));
        device.set_sensor_type(1, SensorType::HUM);
        device.set_data_type(1, DataType::HUM);
        Self {
            device,
            probe,
            timer: IntervalTimer::new(config.climate_interval_ms, now),
            next_sample: now,
            threshold: config.climate_threshold,
            unit: config.temperature_unit,
            last_temp: f32::NAN,
            last_hum: f32::NAN,
        }
    }

    /// Last temperature in the configured unit, `NaN` if none is cached.
    pub fn temperature(&self) -> f32 {
        self.last_temp
    }

    pub fn humidity(&self) -> f32 {
        self.last_hum
    }

    pub fn probe_mut(&mut self) -> &mut P {
        &mut self.probe
    }

    fn convert(&self, celsius: f32) -> f32 {
        match self.unit {
            TemperatureUnit::Celsius => celsius,
            TemperatureUnit::Fahrenheit => celsius * 9.0 / 5.0 + 32.0,
        }
    }
}

fn changed(new: f32, old: f32, threshold: f32) -> bool {
    old.is_nan() || (new - old).abs() > threshold
}

impl<P: ClimateProbe> Sensor for ClimateSensor<P> {
    fn device(&self) -> &Device {
        &self.device
    }

    fn device_mut(&mut self) -> &mut Device {
        &mut self.device
    }

    fn ready(&mut self, io: &mut NodeIo<'_>) -> Readiness {
        let now = io.now();
        if now < self.next_sample {
            return Readiness::Wait(Deadline::At(self.next_sample));
        }
        self.timer.poll(now)
    }

    fn sense(&mut self, io: &mut NodeIo<'_>) -> bool {
        let now = io.now();
        self.next_sample = now
            .saturating_add(self.probe.min_sampling_period())
            .saturating_add(SAMPLE_FUDGE_MS);

        let reading = match self.probe.read() {
            Ok(r) => r,
            Err(e) => {
                warn!("Climate: read failed ({}), retrying next interval", e);
                return false;
            }
        };

        let temp = self.convert(reading.celsius);
        let hum = reading.humidity;
        let new_data = changed(temp, self.last_temp, self.threshold)
            || changed(hum, self.last_hum, self.threshold);

        self.last_temp = temp;
        self.last_hum = hum;
        new_data
    }

    fn report(&mut self, io: &mut NodeIo<'_>) -> bool {
        debug!("Climate: sending temp {:.1}, humidity {:.1}", self.last_temp, self.last_hum);
        let mut all_ok = true;
        for (sub, value) in [(0, self.last_temp), (1, self.last_hum)] {
            let payload = Payload::Float {
                value,
                decimals: REPORT_DECIMALS,
            };
            all_ok &= self
                .device
                .outbound(sub, payload)
                .is_some_and(|msg| io.net.send(&msg));
        }
        if !all_ok {
            // Forget the cache so the next reading counts as new.
            self.last_temp = f32::NAN;
            self.last_hum = f32::NAN;
        }
        all_ok
    }
}
