//! Heartbeat: toggles a fake light state upstream every interval so the
//! controller can tell the node is alive.

use log::debug;

use crate::config::NodeConfig;
use crate::device::{Device, DeviceId};
use crate::message::{DataType, Payload, SensorType};
use crate::ports::{Millis, NodeIo};
use crate::sensors::interval::IntervalTimer;
use crate::sensors::{Readiness, Sensor};

pub struct HeartbeatSensor {
    device: Device,
    timer: IntervalTimer,
    state: bool,
}

impl HeartbeatSensor {
    pub fn new(id: DeviceId, interval: Millis, now: Millis) -> Self {
        Self {
            device: Device::new(SensorType::LIGHT, DataType::STATUS, id, 1, Some("heartbeat")),
            timer: IntervalTimer::new(interval, now),
            state: false,
        }
    }

    pub fn from_config(id: DeviceId, cfg: &NodeConfig, now: Millis) -> Self {
        Self::new(id, cfg.heartbeat_interval_ms, now)
    }

    pub fn interval(&self) -> Millis {
        self.timer.interval()
    }

    pub fn state(&self) -> bool {
        self.state
    }
}

impl Sensor for HeartbeatSensor {
    fn device(&self) -> &Device {
        &self.device
    }

    fn device_mut(&mut self) -> &mut Device {
        &mut self.device
    }

    fn ready(&mut self, io: &mut NodeIo<'_>) -> Readiness {
        self.timer.poll(io.now())
    }

    fn sense(&mut self, _io: &mut NodeIo<'_>) -> bool {
        self.state = !self.state;
        true
    }

    fn report(&mut self, io: &mut NodeIo<'_>) -> bool {
        debug!("Heartbeat: {}", u8::from(self.state));
        self.device
            .outbound(0, Payload::Bool(self.state))
            .is_some_and(|msg| io.net.send(&msg))
    }
}
