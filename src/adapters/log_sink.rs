//! Log-based network decorator.
//!
//! Wraps any [`NetworkPort`] and writes every outbound message,
//! presentation and inbound message to the logger (UART / USB-CDC in
//! production) before forwarding to the real transport.

use log::{info, warn};

use crate::message::{Message, Payload, SensorType};
use crate::ports::NetworkPort;

/// Adapter that logs all traffic through the wrapped transport.
pub struct LoggingNetwork<N> {
    inner: N,
}

impl<N: NetworkPort> LoggingNetwork<N> {
    pub fn new(inner: N) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &N {
        &self.inner
    }

    pub fn into_inner(self) -> N {
        self.inner
    }
}

fn payload_text(payload: &Payload) -> String {
    match payload {
        Payload::Empty => "-".to_owned(),
        Payload::Bool(b) => u8::from(*b).to_string(),
        Payload::Byte(v) => v.to_string(),
        Payload::Float { value, decimals } => format!("{:.*}", usize::from(*decimals), value),
        Payload::Text(s) => s.as_str().to_owned(),
    }
}

impl<N: NetworkPort> NetworkPort for LoggingNetwork<N> {
    fn send(&mut self, msg: &Message) -> bool {
        let ok = self.inner.send(msg);
        if ok {
            info!(
                "TX | child={} type={} cmd={:?} | {}",
                msg.sensor,
                msg.data_type.0,
                msg.command,
                payload_text(&msg.payload)
            );
        } else {
            warn!("TX | child={} type={} | send failed", msg.sensor, msg.data_type.0);
        }
        ok
    }

    fn present(&mut self, id: u8, sensor_type: SensorType, description: Option<&str>, ack: bool) {
        info!(
            "PRESENT | child={} type={} desc={}",
            id,
            sensor_type.0,
            description.unwrap_or("")
        );
        self.inner.present(id, sensor_type, description, ack);
    }

    fn process(&mut self) -> Option<Message> {
        let msg = self.inner.process()?;
        info!(
            "RX | child={} type={} cmd={:?} | {}",
            msg.sensor,
            msg.data_type.0,
            msg.command,
            payload_text(&msg.payload)
        );
        Some(msg)
    }
}
