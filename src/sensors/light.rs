//! PWM dimmable LED.
//!
//! Reacts to on/off (`STATUS`) and level (`PERCENTAGE`) messages by fading
//! to the new level in bounded geometric steps, one step per poll.  Levels
//! are percent (0-100) and go out through
//! [`SetDutyCycle::set_duty_cycle_percent`].
//!
//! The target level is persisted in the id's storage slot and the last
//! non-zero level in the adjacent auxiliary slot, so "on" after a power cut
//! returns to the brightness the user picked.

use embedded_hal::pwm::SetDutyCycle;
use log::{debug, info, warn};

use crate::config::NodeConfig;
use crate::device::{Device, DeviceId};
use crate::drivers::fade::Fade;
use crate::message::{DataType, Message, Payload, SensorType};
use crate::persistence::{aux_slot, slot};
use crate::ports::{Millis, NodeIo};
use crate::sensors::{Deadline, Readiness, Sensor};

pub const MAX_LEVEL: u8 = 100;

/// Storage value of a slot that was never written.
const UNSET: u8 = 0xFF;

pub struct DimmableLed<Pwm> {
    device: Device,
    pwm: Pwm,
    level: u8,
    last_on: u8,
    fade: Option<Fade>,
    next_step: Millis,
    step_ms: Millis,
    max_steps: u8,
    report_due: bool,
    restored: bool,
}

impl<Pwm: SetDutyCycle> DimmableLed<Pwm> {
    pub fn new(pwm: Pwm, id: DeviceId, config: &NodeConfig) -> Self {
        Self {
            device: Device::new(SensorType::DIMMER, DataType::PERCENTAGE, id, 1, Some("dimmer")),
            pwm,
            level: 0,
            last_on: MAX_LEVEL,
            fade: None,
            next_step: 0,
            step_ms: config.fade_step_ms,
            max_steps: config.fade_max_steps,
            report_due: false,
            restored: false,
        }
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    /// Level the current fade is heading for.
    pub fn target(&self) -> u8 {
        self.fade.as_ref().map_or(self.level, Fade::target)
    }

    pub fn is_fading(&self) -> bool {
        self.fade.is_some()
    }

    pub fn pwm(&self) -> &Pwm {
        &self.pwm
    }

    /// Load the persisted level.  Needs an assigned id; the node calls this
    /// on first presentation.  Returns `true` if a stored level was applied.
    pub fn restore(&mut self, io: &mut NodeIo<'_>) -> bool {
        let Some(id) = self.device.id(0).and_then(DeviceId::assigned) else {
            return false;
        };
        self.restored = true;

        let on = io.storage.load_state(aux_slot(id));
        if on != UNSET && (1..=MAX_LEVEL).contains(&on) {
            self.last_on = on;
        }
        let stored = io.storage.load_state(slot(id));
        if stored == UNSET || stored > MAX_LEVEL {
            return false;
        }
        info!("Dimmer: restored level {} (on-level {})", stored, self.last_on);
        self.apply(stored);
        self.report_due = true;
        true
    }

    fn apply(&mut self, level: u8) {
        if self.pwm.set_duty_cycle_percent(level).is_err() {
            warn!("Dimmer: PWM write failed at {}%", level);
        }
        self.level = level;
    }

    fn fade_to(&mut self, target: u8, io: &mut NodeIo<'_>) {
        let target = target.min(MAX_LEVEL);
        if target > 0 {
            self.last_on = target;
        }
        if let Some(id) = self.device.id(0).and_then(DeviceId::assigned) {
            io.storage.save_state(slot(id), target);
            io.storage.save_state(aux_slot(id), self.last_on);
        }
        debug!("Dimmer: fading {} -> {}", self.level, target);
        self.fade = Some(Fade::new(self.level, target, self.max_steps));
        self.next_step = io.now();
    }

    fn status_message(&self) -> Option<Message> {
        let mut msg = self.device.outbound(0, Payload::Bool(self.level > 0))?;
        msg.data_type = DataType::STATUS;
        Some(msg)
    }
}

impl<Pwm: SetDutyCycle> Sensor for DimmableLed<Pwm> {
    fn device(&self) -> &Device {
        &self.device
    }

    fn device_mut(&mut self) -> &mut Device {
        &mut self.device
    }

    fn present(&mut self, io: &mut NodeIo<'_>) -> bool {
        if !self.restored {
            self.restore(io);
        }
        false
    }

    fn ready(&mut self, io: &mut NodeIo<'_>) -> Readiness {
        if self.report_due {
            return Readiness::Ready;
        }
        match self.fade {
            Some(_) if io.now() >= self.next_step => Readiness::Ready,
            Some(_) => Readiness::Wait(Deadline::At(self.next_step)),
            None => Readiness::Wait(Deadline::Never),
        }
    }

    /// Advance the fade by one step.  New data once the target is reached.
    fn sense(&mut self, io: &mut NodeIo<'_>) -> bool {
        if let Some(fade) = self.fade.as_mut() {
            match fade.next() {
                Some(level) => {
                    let done = fade.is_done();
                    self.apply(level);
                    self.next_step = io.now().saturating_add(self.step_ms);
                    if done {
                        self.fade = None;
                        self.report_due = true;
                    }
                }
                None => {
                    self.fade = None;
                    self.report_due = true;
                }
            }
        }
        self.report_due
    }

    fn report(&mut self, io: &mut NodeIo<'_>) -> bool {
        let level = self.device.outbound(0, Payload::Byte(self.level));
        let ok = [level, self.status_message()]
            .into_iter()
            .all(|msg| msg.is_some_and(|m| io.net.send(&m)));
        self.report_due = !ok;
        ok
    }

    fn react(&mut self, msg: &Message, io: &mut NodeIo<'_>) -> bool {
        let Some(id) = self.device.id(0).and_then(DeviceId::assigned) else {
            return false;
        };
        if msg.is_set_for(id, DataType::STATUS) {
            let Some(on) = msg.payload.as_bool() else {
                warn!("Dimmer: unreadable status payload");
                return true;
            };
            let target = if on { self.last_on } else { 0 };
            self.fade_to(target, io);
            true
        } else if msg.is_set_for(id, DataType::PERCENTAGE) {
            let Some(level) = msg.payload.as_u8() else {
                warn!("Dimmer: unreadable level payload");
                return true;
            };
            self.fade_to(level, io);
            true
        } else {
            false
        }
    }
}
