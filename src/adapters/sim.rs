//! Host simulation adapters.
//!
//! In-memory stand-ins for the radio, the EEPROM and the sleep hardware,
//! used by host builds and by the test suites.  [`SimClock`] mimics the
//! reference hardware faithfully: entering sleep resets the millisecond
//! counter to zero, so the node must repair it on wake.

use std::collections::VecDeque;

use log::{debug, info};

use crate::message::{Message, SensorType};
use crate::ports::{ClockPort, Millis, NetworkPort, SleepRequest, StoragePort, WakeArm, WakeSource};

// ── Network ───────────────────────────────────────────────────

/// One recorded presentation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presentation {
    pub id: u8,
    pub sensor_type: SensorType,
    pub description: Option<String>,
    pub ack: bool,
}

/// Network port that records outbound traffic and replays queued inbound
/// messages.
#[derive(Debug, Default)]
pub struct RecordingNetwork {
    /// Successfully sent messages, in order.
    pub sent: Vec<Message>,
    /// Messages whose send was made to fail.
    pub dropped: Vec<Message>,
    pub presented: Vec<Presentation>,
    inbound: VecDeque<Message>,
    fail_next: usize,
}

impl RecordingNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a message for the next `process()` drain.
    pub fn queue_inbound(&mut self, msg: Message) {
        self.inbound.push_back(msg);
    }

    /// Make the next `n` sends fail.
    pub fn fail_next_sends(&mut self, n: usize) {
        self.fail_next = n;
    }

    pub fn pending_inbound(&self) -> usize {
        self.inbound.len()
    }

    /// Messages sent from child `sensor`.
    pub fn sent_by(&self, sensor: u8) -> impl Iterator<Item = &Message> {
        self.sent.iter().filter(move |m| m.sensor == sensor)
    }
}

impl NetworkPort for RecordingNetwork {
    fn send(&mut self, msg: &Message) -> bool {
        if self.fail_next > 0 {
            self.fail_next -= 1;
            debug!("RecordingNetwork: dropping send to child {}", msg.sensor);
            self.dropped.push(msg.clone());
            return false;
        }
        self.sent.push(msg.clone());
        true
    }

    fn present(&mut self, id: u8, sensor_type: SensorType, description: Option<&str>, ack: bool) {
        self.presented.push(Presentation {
            id,
            sensor_type,
            description: description.map(str::to_owned),
            ack,
        });
    }

    fn process(&mut self) -> Option<Message> {
        self.inbound.pop_front()
    }
}

// ── Storage ───────────────────────────────────────────────────

/// Size of the simulated EEPROM.
pub const SIM_EEPROM_SIZE: usize = 2048;

/// Byte-addressed in-memory EEPROM.  Starts erased (all `0xFF`).
/// Out-of-range writes are ignored and reads return `0xFF`.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    bytes: Vec<u8>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        info!("MemoryStorage: simulation backend ({} bytes)", SIM_EEPROM_SIZE);
        Self {
            bytes: vec![0xFF; SIM_EEPROM_SIZE],
        }
    }
}

impl StoragePort for MemoryStorage {
    fn load_state(&self, offset: u16) -> u8 {
        self.bytes.get(usize::from(offset)).copied().unwrap_or(0xFF)
    }

    fn save_state(&mut self, offset: u16, value: u8) {
        if let Some(b) = self.bytes.get_mut(usize::from(offset)) {
            *b = value;
        }
    }
}

// ── Clock / sleep ─────────────────────────────────────────────

/// One recorded sleep call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SleepCall {
    pub started_at: Millis,
    pub arms: Vec<WakeArm>,
    pub request: SleepRequest,
    pub woke_by: WakeSource,
}

/// Simulated millisecond clock with scripted wake-ups.
#[derive(Debug, Default)]
pub struct SimClock {
    now: Millis,
    /// Every sleep the node entered.
    pub sleeps: Vec<SleepCall>,
    script: VecDeque<WakeSource>,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(now: Millis) -> Self {
        Self {
            now,
            ..Self::default()
        }
    }

    /// Move time forward while awake.
    pub fn advance(&mut self, ms: Millis) {
        self.now = self.now.saturating_add(ms);
    }

    /// Decide what ends the next sleep.  Without a script, a timed sleep
    /// ends by timer and an indefinite one by the first armed line.
    pub fn script_wake(&mut self, source: WakeSource) {
        self.script.push_back(source);
    }
}

impl ClockPort for SimClock {
    fn millis(&self) -> Millis {
        self.now
    }

    fn set_millis(&mut self, ms: Millis) {
        self.now = ms;
    }

    fn sleep(&mut self, arms: &[WakeArm], request: SleepRequest) -> WakeSource {
        let woke_by = self.script.pop_front().unwrap_or(match (request, arms.first()) {
            (SleepRequest::Indefinite, Some(arm)) => WakeSource::Interrupt(arm.line),
            _ => WakeSource::Timer,
        });
        debug!("SimClock: sleep {:?} with {} line(s) -> {:?}", request, arms.len(), woke_by);
        self.sleeps.push(SleepCall {
            started_at: self.now,
            arms: arms.to_vec(),
            request,
            woke_by,
        });
        // Reference hardware loses the counter while asleep.
        self.now = 0;
        woke_by
    }
}
