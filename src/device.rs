//! Device model: a fixed-capacity group of sub-devices.
//!
//! A physical part often exposes several logical channels (a climate probe
//! reports temperature *and* humidity).  Each channel is a [`SubDevice`]
//! with its own id, presentation type and value type.  Every sub-device
//! carries a pre-stamped outbound [`Message`] template so a sensor can send
//! without re-deriving routing metadata.

use heapless::Vec;
use log::warn;

use crate::error::ConfigError;
use crate::message::{AUTO_WIRE_ID, DataType, Message, Payload, SensorType};

/// Maximum number of sub-devices per device.
pub const MAX_SUB_DEVICES: usize = 2;

/// Highest id that can be handed out; `0xFF` is reserved on the wire.
pub const MAX_DEVICE_ID: u8 = 254;

/// Device id, or a request to have one assigned by the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceId {
    Auto,
    Assigned(u8),
}

impl DeviceId {
    /// Id as carried in message headers.
    pub fn wire(self) -> u8 {
        match self {
            Self::Auto => AUTO_WIRE_ID,
            Self::Assigned(id) => id,
        }
    }

    pub fn assigned(self) -> Option<u8> {
        match self {
            Self::Auto => None,
            Self::Assigned(id) => Some(id),
        }
    }

    pub fn is_auto(self) -> bool {
        self == Self::Auto
    }
}

#[derive(Debug, Clone)]
pub struct SubDevice {
    id: DeviceId,
    sensor_type: SensorType,
    data_type: DataType,
    description: Option<&'static str>,
    msg: Message,
}

impl SubDevice {
    fn new(
        id: DeviceId,
        sensor_type: SensorType,
        data_type: DataType,
        description: Option<&'static str>,
    ) -> Self {
        Self {
            id,
            sensor_type,
            data_type,
            description,
            msg: Message::new(id.wire(), data_type),
        }
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn sensor_type(&self) -> SensorType {
        self.sensor_type
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn description(&self) -> Option<&'static str> {
        self.description
    }

    pub fn message(&self) -> &Message {
        &self.msg
    }
}

/// Ordered, fixed-capacity set of sub-devices.
#[derive(Debug, Clone)]
pub struct Device {
    subs: Vec<SubDevice, MAX_SUB_DEVICES>,
    overflow: Option<ConfigError>,
}

impl Device {
    /// Build a device with `count` sub-devices sharing type, value type and
    /// description.  An explicit `id` is given to sub-device 0 and counted
    /// up for the rest; `DeviceId::Auto` leaves every id for the node.
    ///
    /// A `count` above [`MAX_SUB_DEVICES`] is clamped and recorded in
    /// [`overflow`](Self::overflow); a `count` of zero is raised to one.
    pub fn new(
        sensor_type: SensorType,
        data_type: DataType,
        id: DeviceId,
        count: u8,
        description: Option<&'static str>,
    ) -> Self {
        let mut overflow = None;
        let mut n = usize::from(count.max(1));
        if n > MAX_SUB_DEVICES {
            let err = ConfigError::TooManySubDevices {
                requested: count,
                max: MAX_SUB_DEVICES as u8,
            };
            warn!("Device: {} -- truncating", err);
            overflow = Some(err);
            n = MAX_SUB_DEVICES;
        }

        let mut subs = Vec::new();
        for i in 0..n {
            let sub_id = match id {
                DeviceId::Auto => DeviceId::Auto,
                DeviceId::Assigned(base) => match base.checked_add(i as u8) {
                    Some(v) if v <= MAX_DEVICE_ID => DeviceId::Assigned(v),
                    _ => DeviceId::Auto,
                },
            };
            // Capacity was checked above.
            let _ = subs.push(SubDevice::new(sub_id, sensor_type, data_type, description));
        }

        Self { subs, overflow }
    }

    /// Single sub-device with an automatically assigned id.
    pub fn single(sensor_type: SensorType, data_type: DataType) -> Self {
        Self::new(sensor_type, data_type, DeviceId::Auto, 1, None)
    }

    pub fn len(&self) -> usize {
        self.subs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subs.is_empty()
    }

    /// Configuration error raised while building this device, if any.
    pub fn overflow(&self) -> Option<ConfigError> {
        self.overflow
    }

    pub fn subs(&self) -> &[SubDevice] {
        &self.subs
    }

    pub fn sub(&self, index: usize) -> Option<&SubDevice> {
        self.subs.get(index)
    }

    pub fn id(&self, index: usize) -> Option<DeviceId> {
        self.sub(index).map(SubDevice::id)
    }

    /// Change the id and re-stamp the message template.
    pub fn set_id(&mut self, index: usize, id: DeviceId) -> bool {
        match self.subs.get_mut(index) {
            Some(sub) => {
                sub.id = id;
                sub.msg.sensor = id.wire();
                true
            }
            None => false,
        }
    }

    pub fn sensor_type(&self, index: usize) -> Option<SensorType> {
        self.sub(index).map(SubDevice::sensor_type)
    }

    pub fn set_sensor_type(&mut self, index: usize, sensor_type: SensorType) -> bool {
        match self.subs.get_mut(index) {
            Some(sub) => {
                sub.sensor_type = sensor_type;
                true
            }
            None => false,
        }
    }

    pub fn data_type(&self, index: usize) -> Option<DataType> {
        self.sub(index).map(SubDevice::data_type)
    }

    /// Change the value type and re-stamp the message template.
    pub fn set_data_type(&mut self, index: usize, data_type: DataType) -> bool {
        match self.subs.get_mut(index) {
            Some(sub) => {
                sub.data_type = data_type;
                sub.msg.data_type = data_type;
                true
            }
            None => false,
        }
    }

    pub fn description(&self, index: usize) -> Option<&'static str> {
        self.sub(index).and_then(SubDevice::description)
    }

    pub fn set_description(&mut self, index: usize, description: Option<&'static str>) -> bool {
        match self.subs.get_mut(index) {
            Some(sub) => {
                sub.description = description;
                true
            }
            None => false,
        }
    }

    pub fn message(&self, index: usize) -> Option<&Message> {
        self.sub(index).map(SubDevice::message)
    }

    /// Copy of the sub-device's template carrying `payload`.
    pub fn outbound(&self, index: usize, payload: Payload) -> Option<Message> {
        self.message(index).map(|m| m.clone().with_payload(payload))
    }

    /// Index of the sub-device with id `id`.
    pub fn find(&self, id: u8) -> Option<usize> {
        self.subs
            .iter()
            .position(|s| s.id == DeviceId::Assigned(id))
    }
}
