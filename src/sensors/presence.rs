//! PIR presence sensor with off-delay hysteresis.
//!
//! ```text
//!            pin high / report on
//!   ┌──────┐ ───────────────────▶ ┌────────┐
//!   │ Idle │                      │ Active │◀─┐ pin high
//!   └──────┘ ◀──────┐             └────────┘  │ (re-arm, silent)
//!       ▲           │ deadline        │ pin low
//!       │           │ passed          ▼       │
//!       │           │ report off  ┌───────────┴┐
//!       └───────────┴─────────────│ Lingering  │
//!                                 └────────────┘
//! ```
//!
//! Entering `Active` arms `off_after = now + off_delay`.  While lingering
//! the sensor stays ready so the node keeps polling until the deadline
//! passes.  PIR modules glitch low for a moment now and then; the delay
//! keeps those from flapping the reported state.
//!
//! The module output is meaningless for a while after power-up.  Until the
//! warm-up deadline the sensor neither samples the pin nor arms its wake
//! line, and `ready` simply waits for the deadline.

use embedded_hal::digital::InputPin;
use log::{debug, info, warn};

use crate::config::NodeConfig;
use crate::device::{Device, DeviceId};
use crate::message::{DataType, Payload, SensorType};
use crate::ports::{Millis, NodeIo, WakeLine};
use crate::sensors::{Deadline, Readiness, Sensor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceState {
    Idle,
    /// Pin high; "off" not before `off_after`.
    Active { off_after: Millis },
    /// Pin low again, waiting out the off delay.
    Lingering { off_after: Millis },
}

pub struct PresenceSensor<P> {
    device: Device,
    pin: P,
    line: Option<WakeLine>,
    state: PresenceState,
    /// Tripped value still to be sent; kept until a report succeeds.
    pending: Option<bool>,
    warm_up_done: Millis,
    warmed_up: bool,
    off_delay: Millis,
    only_send_on: bool,
}

impl<P: InputPin> PresenceSensor<P> {
    /// `line` is the wake line the pin is wired to, if any.
    pub fn new(pin: P, line: Option<WakeLine>, id: DeviceId, config: &NodeConfig, now: Millis) -> Self {
        info!(
            "Presence: warming up for {} ms (off delay {} ms)",
            config.presence_warm_up_ms, config.presence_off_delay_ms
        );
        Self {
            device: Device::new(SensorType::MOTION, DataType::TRIPPED, id, 1, Some("presence")),
            pin,
            line,
            state: PresenceState::Idle,
            pending: None,
            warm_up_done: now.saturating_add(config.presence_warm_up_ms),
            warmed_up: config.presence_warm_up_ms == 0,
            off_delay: config.presence_off_delay_ms,
            only_send_on: config.presence_only_send_on,
        }
    }

    pub fn state(&self) -> PresenceState {
        self.state
    }

    pub fn pending(&self) -> Option<bool> {
        self.pending
    }

    pub fn is_warmed_up(&self) -> bool {
        self.warmed_up
    }

    fn read_pin(&mut self) -> Option<bool> {
        match self.pin.is_high() {
            Ok(level) => Some(level),
            Err(_) => {
                warn!("Presence: pin read failed");
                None
            }
        }
    }

    fn queue(&mut self, tripped: bool) {
        if !tripped && self.only_send_on {
            return;
        }
        self.pending = Some(tripped);
    }
}

impl<P: InputPin> Sensor for PresenceSensor<P> {
    fn device(&self) -> &Device {
        &self.device
    }

    fn device_mut(&mut self) -> &mut Device {
        &mut self.device
    }

    fn ready(&mut self, io: &mut NodeIo<'_>) -> Readiness {
        let now = io.now();
        if !self.warmed_up {
            if now < self.warm_up_done {
                return Readiness::Wait(Deadline::At(self.warm_up_done));
            }
            info!("Presence: warm-up complete");
            self.warmed_up = true;
        }

        if self.pending.is_some() {
            return Readiness::Ready;
        }

        let Some(high) = self.read_pin() else {
            return Readiness::Wait(Deadline::Never);
        };
        match (self.state, high) {
            (PresenceState::Idle, false) | (PresenceState::Active { .. }, true) => {
                Readiness::Wait(Deadline::Never)
            }
            (PresenceState::Idle, true)
            | (PresenceState::Active { .. }, false)
            | (PresenceState::Lingering { .. }, _) => Readiness::Ready,
        }
    }

    fn sense(&mut self, io: &mut NodeIo<'_>) -> bool {
        if !self.warmed_up {
            return false;
        }
        let now = io.now();
        let Some(high) = self.read_pin() else {
            return self.pending.is_some();
        };

        let next = match (self.state, high) {
            (PresenceState::Idle, true) => {
                debug!("Presence: motion");
                self.queue(true);
                PresenceState::Active {
                    off_after: now.saturating_add(self.off_delay),
                }
            }
            (PresenceState::Idle, false) => PresenceState::Idle,
            (PresenceState::Active { .. } | PresenceState::Lingering { .. }, true) => {
                PresenceState::Active {
                    off_after: now.saturating_add(self.off_delay),
                }
            }
            (PresenceState::Active { off_after }, false) => PresenceState::Lingering { off_after },
            (PresenceState::Lingering { off_after }, false) if now >= off_after => {
                debug!("Presence: quiet for {} ms", self.off_delay);
                self.queue(false);
                PresenceState::Idle
            }
            (lingering @ PresenceState::Lingering { .. }, false) => lingering,
        };
        self.state = next;
        self.pending.is_some()
    }

    fn report(&mut self, io: &mut NodeIo<'_>) -> bool {
        let Some(tripped) = self.pending else {
            return true;
        };
        let sent = self
            .device
            .outbound(0, Payload::Bool(tripped))
            .is_some_and(|msg| io.net.send(&msg));
        if sent {
            info!("Presence: reported {}", if tripped { "on" } else { "off" });
            self.pending = None;
        }
        sent
    }

    fn interrupt_line(&self) -> Option<WakeLine> {
        if self.warmed_up { self.line } else { None }
    }
}
