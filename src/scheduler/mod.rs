//! Node scheduler: the cooperative service loop.
//!
//! One call to [`Node::update`] is one scheduling cycle:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  1. drain inbound ──▶ react (first sensor to claim wins)     │
//! │  2. poll sensors  ──▶ ready? sense ──▶ report                │
//! │                        not ready: fold deadline, arm line    │
//! │  3. plan sleep    ──▶ sleep::plan_sleep                      │
//! │  4. veto hook     ──▶ may cancel                             │
//! │  5. sleep         ──▶ ClockPort::sleep(arms, request)        │
//! │  6. repair clock  ──▶ ClockPort::set_millis                  │
//! │  7. wake hook                                                │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The node also owns device-id assignment and default presentation.

pub mod sleep;

use heapless::Vec;
use log::{debug, info, warn};

use crate::config::NodeConfig;
use crate::device::{Device, DeviceId, MAX_DEVICE_ID};
use crate::error::ConfigError;
use crate::message::Message;
use crate::ports::{Edge, NodeIo, WakeSource};
use crate::sensors::{Deadline, NodeRequest, Readiness, Sensor};

use sleep::{SleepPlan, WakeLineSet, plan_sleep, restored_millis};

/// Maximum number of sensors one node can own.
pub const MAX_SENSORS: usize = 10;

/// Called before sleeping.  Return `false` to stay awake this cycle.
pub type SleepVetoFn = fn() -> bool;

/// Called right after waking, with what ended the sleep.
pub type WakeHookFn = fn(WakeSource);

/// Hands out device ids.  Only ever counts up.
#[derive(Debug, Clone, Copy, Default)]
struct IdAllocator {
    next: u16,
}

impl IdAllocator {
    fn next_id(&self) -> u16 {
        self.next
    }

    /// Fill every AUTO id in `device`.  The counter first moves past any
    /// explicit id the device already carries.
    fn assign(&mut self, device: &mut Device) {
        for sub in device.subs() {
            if let Some(id) = sub.id().assigned() {
                self.next = self.next.max(u16::from(id) + 1);
            }
        }

        for i in 0..device.len() {
            if !device.id(i).is_some_and(DeviceId::is_auto) {
                continue;
            }
            if self.next > u16::from(MAX_DEVICE_ID) {
                warn!("Node: {} -- sub-device {} left unassigned", ConfigError::IdSpaceExhausted, i);
                return;
            }
            device.set_id(i, DeviceId::Assigned(self.next as u8));
            self.next += 1;
        }
    }
}

/// Per-cycle summary returned by [`Node::update`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub messages_handled: u16,
    pub messages_unhandled: u16,
    pub sensors_ready: u8,
    pub reports_sent: u8,
    pub reports_failed: u8,
    /// Sleep plan, if the node decided to sleep.
    pub plan: Option<SleepPlan>,
    /// The veto hook cancelled the planned sleep.
    pub vetoed: bool,
    /// What ended the sleep, if the node slept.
    pub wake: Option<WakeSource>,
}

impl CycleReport {
    pub fn slept(&self) -> bool {
        self.wake.is_some()
    }
}

/// The sensor node.
///
/// Sensors are borrowed for `'a`; they are built before the node starts
/// scheduling and outlive its run loop.
pub struct Node<'a> {
    sensors: Vec<&'a mut dyn Sensor, MAX_SENSORS>,
    ids: IdAllocator,
    repeater: bool,
    sleep_veto: Option<SleepVetoFn>,
    wake_hook: Option<WakeHookFn>,
}

impl Default for Node<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Node<'a> {
    pub fn new() -> Self {
        Self {
            sensors: Vec::new(),
            ids: IdAllocator::default(),
            repeater: false,
            sleep_veto: None,
            wake_hook: None,
        }
    }

    pub fn from_config(config: &NodeConfig) -> Self {
        let mut node = Self::new();
        node.set_repeater(config.repeater);
        node
    }

    // ── Configuration ─────────────────────────────────────────

    /// Repeater nodes keep forwarding traffic and never sleep.
    pub fn set_repeater(&mut self, repeater: bool) {
        self.repeater = repeater;
    }

    pub fn is_repeater(&self) -> bool {
        self.repeater
    }

    /// Install (or clear) the pre-sleep veto hook.
    ///
    /// Useful to let a voltage regulator settle after switching a sensor
    /// off, so the motion detector does not trip on the way down.
    pub fn set_sleep_veto(&mut self, hook: Option<SleepVetoFn>) {
        self.sleep_veto = hook;
    }

    /// Install (or clear) the post-wake hook.
    pub fn set_wake_hook(&mut self, hook: Option<WakeHookFn>) {
        self.wake_hook = hook;
    }

    // ── Registration & identity ───────────────────────────────

    /// Register a sensor and assign its AUTO ids.  Returns the sensor's
    /// slot index.
    pub fn add_sensor(&mut self, sensor: &'a mut dyn Sensor) -> Result<usize, ConfigError> {
        if self.sensors.is_full() {
            let err = ConfigError::TooManySensors {
                max: MAX_SENSORS as u8,
            };
            warn!("Node: {} -- sensor rejected", err);
            return Err(err);
        }

        for sub in sensor.device().subs() {
            if let Some(id) = sub.id().assigned() {
                if self.id_in_use(id) {
                    let err = ConfigError::DuplicateId(id);
                    warn!("Node: {} -- sensor rejected", err);
                    return Err(err);
                }
            }
        }

        self.ids.assign(sensor.device_mut());
        let slot = self.sensors.len();
        info!(
            "Node: added '{}' at slot {}",
            sensor.device().description(0).unwrap_or("sensor"),
            slot
        );
        // Capacity was checked above.
        let _ = self.sensors.push(sensor);
        Ok(slot)
    }

    /// Give every AUTO sub-device of `device` the next node-wide id.
    pub fn assign_device_ids(&mut self, device: &mut Device) {
        self.ids.assign(device);
    }

    /// Id the next AUTO sub-device will receive.
    pub fn next_device_id(&self) -> u16 {
        self.ids.next_id()
    }

    fn id_in_use(&self, id: u8) -> bool {
        self.sensors
            .iter()
            .any(|s| s.device().find(id).is_some())
    }

    pub fn sensor_count(&self) -> usize {
        self.sensors.len()
    }

    pub fn sensor(&self, index: usize) -> Option<&(dyn Sensor + 'a)> {
        self.sensors.get(index).map(|s| &**s)
    }

    // ── Presentation ──────────────────────────────────────────

    /// Present one sub-device of the sensor in `slot`.  Returns `false` if
    /// the slot is empty.
    pub fn present_device(&mut self, slot: usize, sub: usize, io: &mut NodeIo<'_>, ack: bool) -> bool {
        let Some(sensor) = self.sensors.get_mut(slot) else {
            return false;
        };
        self.ids.assign(sensor.device_mut());
        if !sensor.present(io) {
            present_sub(sensor.device(), sub, io, ack);
        }
        true
    }

    /// Present every registered sensor.
    pub fn present_all(&mut self, io: &mut NodeIo<'_>, ack: bool) {
        for sensor in self.sensors.iter_mut() {
            self.ids.assign(sensor.device_mut());
            if !sensor.present(io) {
                for sub in 0..sensor.device().len() {
                    present_sub(sensor.device(), sub, io, ack);
                }
            }
        }
        info!("Node: presented {} sensor(s)", self.sensors.len());
    }

    // ── Inbound dispatch ──────────────────────────────────────

    /// Offer `msg` to each sensor in registration order.  Returns the slot
    /// of the sensor that handled it.
    pub fn process_incoming(&mut self, msg: &Message, io: &mut NodeIo<'_>) -> Option<usize> {
        debug!("Node: incoming message for device {}", msg.sensor);
        for (slot, sensor) in self.sensors.iter_mut().enumerate() {
            if sensor.react(msg, io) {
                debug!(
                    "Node: handled by slot {} ({})",
                    slot,
                    sensor.device().description(0).unwrap_or("-")
                );
                return Some(slot);
            }
        }
        debug!("Node: not handled or global");
        None
    }

    // ── Service cycle ─────────────────────────────────────────

    /// Run one scheduling cycle.  May block in low-power sleep.
    pub fn update(&mut self, io: &mut NodeIo<'_>) -> CycleReport {
        let mut report = CycleReport::default();

        // 1. Inbound drain
        while let Some(msg) = io.net.process() {
            if self.process_incoming(&msg, io).is_some() {
                report.messages_handled = report.messages_handled.saturating_add(1);
            } else {
                report.messages_unhandled = report.messages_unhandled.saturating_add(1);
            }
        }

        // 2. Per-sensor poll
        let mut bound = Deadline::Never;
        let mut lines = WakeLineSet::new();
        let mut present_all = false;

        for (slot, sensor) in self.sensors.iter_mut().enumerate() {
            match sensor.ready(io) {
                Readiness::Ready => {
                    report.sensors_ready += 1;
                    if sensor.sense(io) {
                        debug!(
                            "Node: slot {} ({}) reporting to base",
                            slot,
                            sensor.device().description(0).unwrap_or("-")
                        );
                        if sensor.report(io) {
                            report.reports_sent += 1;
                        } else {
                            report.reports_failed += 1;
                            warn!("Node: slot {} report failed, sensor will retry", slot);
                        }
                    }
                    if sensor.node_request() == Some(NodeRequest::PresentAll) {
                        present_all = true;
                    }
                }
                Readiness::Wait(deadline) => {
                    bound = bound.min(deadline);
                    if let Some(line) = sensor.interrupt_line() {
                        if lines.contains(line) {
                            debug!("Node: wake line {} shared by slot {}", line.index(), slot);
                        }
                        lines.arm(line);
                    }
                }
            }
        }

        if present_all {
            self.present_all(io, false);
        }

        // 3. Sleep decision
        if report.sensors_ready > 0 || self.repeater {
            return report;
        }
        let plan = plan_sleep(io.now(), bound, lines);
        report.plan = Some(plan);

        // 4. Veto
        if let Some(veto) = self.sleep_veto {
            if !veto() {
                debug!("Node: sleep vetoed");
                report.vetoed = true;
                return report;
            }
        }

        // 5. Sleep
        info!("Node: going to sleep until {} ({:?})", plan.until, plan.request);
        let arms = plan.lines.arms(Edge::Change);
        let source = io.clock.sleep(&arms, plan.request);

        // 6. Clock restoration
        io.clock.set_millis(restored_millis(&plan, source));

        // 7. Wake hook
        if let Some(hook) = self.wake_hook {
            hook(source);
        }
        info!("Node: awake ({:?}), time is {}", source, io.now());

        report.wake = Some(source);
        report
    }
}

/// Default presentation of one sub-device.
fn present_sub(device: &Device, sub: usize, io: &mut NodeIo<'_>, ack: bool) {
    let Some(s) = device.sub(sub) else {
        return;
    };
    match s.id() {
        DeviceId::Assigned(id) => io.net.present(id, s.sensor_type(), s.description(), ack),
        DeviceId::Auto => warn!("Node: sub-device {} has no id, not presented", sub),
    }
}
