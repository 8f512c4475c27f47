//! Periodic re-presentation.
//!
//! Controllers forget nodes that were offline while they restarted.  This
//! meta-sensor asks the node to present every sensor again once per period.
//! The first expiry is skipped because the node already presents at boot.
//! A period of 0 disables the sensor.

use log::info;

use crate::config::NodeConfig;
use crate::device::{Device, DeviceId};
use crate::message::{DataType, SensorType};
use crate::ports::{Millis, NodeIo};
use crate::sensors::interval::IntervalTimer;
use crate::sensors::{Deadline, NodeRequest, Readiness, Sensor};

pub struct PresentationMetaSensor {
    device: Device,
    timer: Option<IntervalTimer>,
    skip_next: bool,
    request: Option<NodeRequest>,
}

impl PresentationMetaSensor {
    pub fn new(period: Millis, now: Millis) -> Self {
        Self {
            device: Device::new(SensorType::CUSTOM, DataType::VAR1, DeviceId::Auto, 1, Some("presentation")),
            timer: (period > 0).then(|| IntervalTimer::new(period, now)),
            skip_next: true,
            request: None,
        }
    }

    pub fn from_config(cfg: &NodeConfig, now: Millis) -> Self {
        Self::new(cfg.presentation_period_ms, now)
    }

    pub fn is_enabled(&self) -> bool {
        self.timer.is_some()
    }
}

impl Sensor for PresentationMetaSensor {
    fn device(&self) -> &Device {
        &self.device
    }

    fn device_mut(&mut self) -> &mut Device {
        &mut self.device
    }

    /// Nothing to announce for the meta-sensor itself.
    fn present(&mut self, _io: &mut NodeIo<'_>) -> bool {
        true
    }

    fn ready(&mut self, io: &mut NodeIo<'_>) -> Readiness {
        match self.timer.as_mut() {
            Some(timer) => timer.poll(io.now()),
            None => Readiness::Wait(Deadline::Never),
        }
    }

    fn sense(&mut self, _io: &mut NodeIo<'_>) -> bool {
        if self.skip_next {
            self.skip_next = false;
            return false;
        }
        true
    }

    fn report(&mut self, _io: &mut NodeIo<'_>) -> bool {
        info!("Presentation: periodic re-presentation due");
        self.request = Some(NodeRequest::PresentAll);
        true
    }

    fn node_request(&mut self) -> Option<NodeRequest> {
        self.request.take()
    }
}
