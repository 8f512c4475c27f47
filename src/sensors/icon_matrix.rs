//! 8×8 LED matrix showing one icon (MAX7219-class driver).
//!
//! Two sub-devices:
//!
//! | Index | Type     | Value       | Meaning                        |
//! |-------|----------|-------------|--------------------------------|
//! | 0     | DIMMER   | PERCENTAGE  | Panel brightness / on-off      |
//! | 1     | CUSTOM   | VAR1        | Icon index into `drivers::icons` |
//!
//! Presentation is done here rather than by the node: some controllers
//! only create a dimmer once it has reported a value, so the panel sends
//! its initial state right after announcing itself.

use log::{debug, info, warn};

use crate::device::{Device, DeviceId};
use crate::drivers::icons;
use crate::message::{DataType, Message, Payload, SensorType};
use crate::ports::NodeIo;
use crate::sensors::Sensor;

/// Highest intensity the driver accepts.
pub const MAX_INTENSITY: u8 = 15;

/// Panel rows are wired bottom-up.
const fn flip(row: u8) -> u8 {
    7 - row
}

/// Low-level LED matrix driver.
pub trait MatrixDisplay {
    /// Global intensity, `0..=MAX_INTENSITY`.
    fn set_intensity(&mut self, level: u8);

    /// `true` blanks the panel, `false` wakes it.
    fn shutdown(&mut self, off: bool);

    /// One row of LEDs, bit 7 is the leftmost column.
    fn set_row(&mut self, row: u8, bits: u8);
}

pub struct IconMatrix<D> {
    device: Device,
    display: D,
    /// Brightness in percent.
    brightness: u8,
    on: bool,
    icon: u8,
}

impl<D: MatrixDisplay> IconMatrix<D> {
    pub fn new(mut display: D, id: DeviceId) -> Self {
        let mut device = Device::new(SensorType::DIMMER, DataType::PERCENTAGE, id, 2, Some("matrix"));
        device.set_sensor_type(1, SensorType::CUSTOM);
        device.set_data_type(1, DataType::VAR1);
        device.set_description(1, Some("icon"));

        let brightness = 50;
        display.shutdown(false);
        display.set_intensity(intensity(brightness));
        for row in 0..8 {
            display.set_row(row, 0);
        }

        Self {
            device,
            display,
            brightness,
            on: true,
            icon: 0,
        }
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn icon(&self) -> u8 {
        self.icon
    }

    /// Draw icon `index`.  Returns `false` for an unknown icon.
    pub fn draw(&mut self, index: u8) -> bool {
        let Some(icon) = icons::icon(index) else {
            return false;
        };
        for (row, bits) in (0u8..).zip(icon.rows) {
            self.display.set_row(flip(row), bits);
        }
        self.icon = index;
        debug!("Matrix: drawing '{}'", icon.name);
        true
    }

    fn set_on(&mut self, on: bool) {
        self.on = on;
        self.display.shutdown(!on);
    }

    fn set_brightness(&mut self, percent: u8) {
        self.brightness = percent.min(100);
        self.display.set_intensity(intensity(self.brightness));
        self.set_on(self.brightness > 0);
    }
}

/// Percent to driver intensity, rounded.
fn intensity(percent: u8) -> u8 {
    ((u16::from(percent.min(100)) * u16::from(MAX_INTENSITY) + 50) / 100) as u8
}

impl<D: MatrixDisplay> Sensor for IconMatrix<D> {
    fn device(&self) -> &Device {
        &self.device
    }

    fn device_mut(&mut self) -> &mut Device {
        &mut self.device
    }

    fn present(&mut self, io: &mut NodeIo<'_>) -> bool {
        for sub in self.device.subs() {
            if let Some(id) = sub.id().assigned() {
                io.net.present(id, sub.sensor_type(), sub.description(), false);
            }
        }

        let panel = self.device.outbound(0, Payload::Byte(self.brightness));
        let status = self.device.outbound(0, Payload::Bool(self.on)).map(|mut m| {
            m.data_type = DataType::STATUS;
            m
        });
        let icon = self.device.outbound(1, Payload::Byte(self.icon));
        for msg in [panel, status, icon].into_iter().flatten() {
            if !io.net.send(&msg) {
                warn!("Matrix: initial state for child {} not delivered", msg.sensor);
            }
        }
        info!("Matrix: presented");
        true
    }

    fn react(&mut self, msg: &Message, _io: &mut NodeIo<'_>) -> bool {
        let panel = self.device.id(0).and_then(DeviceId::assigned);
        let icon = self.device.id(1).and_then(DeviceId::assigned);

        if let Some(id) = panel {
            if msg.is_set_for(id, DataType::STATUS) {
                match msg.payload.as_bool() {
                    Some(on) => self.set_on(on),
                    None => warn!("Matrix: unreadable status payload"),
                }
                return true;
            }
            if msg.is_set_for(id, DataType::PERCENTAGE) {
                match msg.payload.as_u8() {
                    Some(level) => self.set_brightness(level),
                    None => warn!("Matrix: unreadable brightness payload"),
                }
                return true;
            }
        }
        if let Some(id) = icon {
            if msg.is_set_for(id, DataType::VAR1) {
                match msg.payload.as_u8() {
                    Some(index) if self.draw(index) => {}
                    _ => warn!("Matrix: no such icon"),
                }
                return true;
            }
        }
        false
    }
}
