//! Message model shared by sensors, the scheduler and the network port.
//!
//! Only routing metadata and a typed payload live here; framing, signing
//! and the radio wire format belong to the network collaborator.

use heapless::String;
use serde::{Deserialize, Serialize};

/// Longest text payload carried in one message.
pub const MAX_TEXT_PAYLOAD: usize = 24;

/// Child id used on the wire for a sub-device that has no id yet.
pub const AUTO_WIRE_ID: u8 = 0xFF;

/// Presentation type of a sub-device (what kind of thing it is).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SensorType(pub u8);

impl SensorType {
    pub const DOOR: Self = Self(0);
    pub const MOTION: Self = Self(1);
    pub const LIGHT: Self = Self(3);
    pub const DIMMER: Self = Self(4);
    pub const TEMP: Self = Self(6);
    pub const HUM: Self = Self(7);
    pub const CUSTOM: Self = Self(23);
}

/// Value type carried by a message (what the payload means).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataType(pub u8);

impl DataType {
    pub const TEMP: Self = Self(0);
    pub const HUM: Self = Self(1);
    /// On/off state (light, relay, panel power).
    pub const STATUS: Self = Self(2);
    /// Level in percent (0-100).
    pub const PERCENTAGE: Self = Self(3);
    pub const ARMED: Self = Self(15);
    pub const TRIPPED: Self = Self(16);
    pub const VAR1: Self = Self(24);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Command {
    Presentation = 0,
    Set = 1,
    Req = 2,
    Internal = 3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    Empty,
    Bool(bool),
    Byte(u8),
    Float { value: f32, decimals: u8 },
    Text(String<MAX_TEXT_PAYLOAD>),
}

impl Payload {
    /// Interpret the payload as an on/off value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Byte(v) => Some(*v != 0),
            Self::Float { value, .. } => Some(*value != 0.0),
            Self::Text(s) => match s.as_str().trim() {
                "1" | "on" | "ON" | "true" => Some(true),
                "0" | "off" | "OFF" | "false" => Some(false),
                _ => None,
            },
            Self::Empty => None,
        }
    }

    /// Interpret the payload as a small unsigned integer.
    pub fn as_u8(&self) -> Option<u8> {
        match self {
            Self::Bool(b) => Some(u8::from(*b)),
            Self::Byte(v) => Some(*v),
            Self::Float { value, .. } if (0.0..=255.0).contains(value) => Some(*value as u8),
            Self::Text(s) => s.as_str().trim().parse().ok(),
            _ => None,
        }
    }
}

/// One outbound or inbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Child (sub-device) id the message is addressed to or sent from.
    pub sensor: u8,
    pub command: Command,
    pub data_type: DataType,
    /// Request an end-to-end acknowledgement.
    pub ack: bool,
    pub payload: Payload,
}

impl Message {
    pub fn new(sensor: u8, data_type: DataType) -> Self {
        Self {
            sensor,
            command: Command::Set,
            data_type,
            ack: false,
            payload: Payload::Empty,
        }
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_bool(self, value: bool) -> Self {
        self.with_payload(Payload::Bool(value))
    }

    pub fn with_byte(self, value: u8) -> Self {
        self.with_payload(Payload::Byte(value))
    }

    pub fn with_float(self, value: f32, decimals: u8) -> Self {
        self.with_payload(Payload::Float { value, decimals })
    }

    pub fn with_command(mut self, command: Command) -> Self {
        self.command = command;
        self
    }

    /// True if this is a `Set` for `data_type` addressed to child `sensor`.
    pub fn is_set_for(&self, sensor: u8, data_type: DataType) -> bool {
        self.command == Command::Set && self.sensor == sensor && self.data_type == data_type
    }
}
