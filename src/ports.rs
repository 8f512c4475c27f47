//! Port traits: the boundary between the scheduler and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Node / Sensor (domain)
//! ```
//!
//! The radio stack, the EEPROM driver and the sleep/clock hardware are
//! external collaborators.  Adapters implement these traits; the
//! [`Node`](crate::scheduler::Node) and every [`Sensor`](crate::sensors::Sensor)
//! only ever see them through a [`NodeIo`] bundle.

use crate::message::{Message, SensorType};

/// Monotonic milliseconds since boot.
pub type Millis = u32;

/// Number of external wake lines the sleep hardware can arm at once.
pub const WAKE_LINE_COUNT: usize = 2;

// ───────────────────────────────────────────────────────────────
// Network port (driven adapter: domain ↔ mesh transport)
// ───────────────────────────────────────────────────────────────

pub trait NetworkPort {
    /// Transmit one message upstream.  Returns `false` on delivery failure.
    fn send(&mut self, msg: &Message) -> bool;

    /// Announce a sub-device to the controller.
    fn present(&mut self, id: u8, sensor_type: SensorType, description: Option<&str>, ack: bool);

    /// Move data through the network and hand back one queued inbound
    /// message, or `None` once the queue is drained.
    fn process(&mut self) -> Option<Message>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ EEPROM / flash)
// ───────────────────────────────────────────────────────────────

/// Byte-addressed persistent state.  See [`crate::persistence`] for the
/// offset layout.
pub trait StoragePort {
    fn load_state(&self, offset: u16) -> u8;

    fn save_state(&mut self, offset: u16, value: u8);
}

// ───────────────────────────────────────────────────────────────
// Clock / sleep port (driven adapter: domain ↔ timer + power hardware)
// ───────────────────────────────────────────────────────────────

/// Identifier of one hardware wake line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WakeLine(u8);

impl WakeLine {
    /// `None` if the hardware has no such line.
    pub const fn new(line: u8) -> Option<Self> {
        if (line as usize) < WAKE_LINE_COUNT {
            Some(Self(line))
        } else {
            None
        }
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
    Change,
}

/// One armed wake source handed to [`ClockPort::sleep`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WakeArm {
    pub line: WakeLine,
    pub edge: Edge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepRequest {
    /// Sleep until one of the armed lines fires.
    Indefinite,
    /// Sleep for at most this many milliseconds.
    For(Millis),
}

/// What ended a sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeSource {
    /// The full requested duration elapsed.
    Timer,
    /// An armed line fired before the timer.
    Interrupt(WakeLine),
    /// The sleep ended before its target with no line to blame, e.g. an
    /// adapter that caps sleep length.
    Early,
}

impl WakeSource {
    pub fn is_interrupt(self) -> bool {
        matches!(self, Self::Interrupt(_))
    }
}

pub trait ClockPort {
    fn millis(&self) -> Millis;

    /// Overwrite the monotonic counter.  Used only to repair it after sleep.
    fn set_millis(&mut self, ms: Millis);

    /// Enter low-power sleep.  The hardware may reset the millisecond
    /// counter as a side effect; the caller repairs it afterwards.
    fn sleep(&mut self, arms: &[WakeArm], request: SleepRequest) -> WakeSource;
}

// ───────────────────────────────────────────────────────────────
// Bundle handed to the node and to every sensor call
// ───────────────────────────────────────────────────────────────

/// Borrowed view of all collaborators for one scheduling cycle.
pub struct NodeIo<'a> {
    pub net: &'a mut dyn NetworkPort,
    pub clock: &'a mut dyn ClockPort,
    pub storage: &'a mut dyn StoragePort,
}

impl<'a> NodeIo<'a> {
    pub fn new(
        net: &'a mut dyn NetworkPort,
        clock: &'a mut dyn ClockPort,
        storage: &'a mut dyn StoragePort,
    ) -> Self {
        Self { net, clock, storage }
    }

    /// Current monotonic time.
    pub fn now(&self) -> Millis {
        self.clock.millis()
    }
}
