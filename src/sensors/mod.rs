//! Sensor capability contract and the reference devices.
//!
//! Every pluggable device implements [`Sensor`].  The node scheduler only
//! talks to devices through this trait:
//!
//! ```text
//!   ready ──▶ sense ──▶ report        (per cycle, when ready)
//!   react                             (per inbound message)
//!   present                           (at boot / on request)
//!   interrupt_line                    (sleep planning)
//! ```
//!
//! Every method has a do-nothing default, so a minimal sensor overrides
//! only what it uses.

pub mod climate;
pub mod heartbeat;
pub mod icon_matrix;
pub mod interval;
pub mod light;
pub mod presence;
pub mod presentation;

use crate::device::Device;
use crate::message::Message;
use crate::ports::{Millis, NodeIo, WakeLine};

/// Absolute time a not-ready sensor wants to be polled again.
///
/// Ordered so that any `At` sorts before `Never`, which makes the
/// scheduler's sleep bound a plain `min`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Deadline {
    At(Millis),
    /// Only an interrupt should wake this sensor.
    Never,
}

impl Deadline {
    pub fn at(self) -> Option<Millis> {
        match self {
            Self::At(ms) => Some(ms),
            Self::Never => None,
        }
    }
}

/// Answer to [`Sensor::ready`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Take a reading now.
    Ready,
    /// Not yet; poll again no later than the deadline.
    Wait(Deadline),
}

impl Readiness {
    pub fn is_ready(self) -> bool {
        self == Self::Ready
    }
}

/// Node-level service a sensor may ask for after it reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRequest {
    /// Re-run presentation for every registered sensor.
    PresentAll,
}

pub trait Sensor {
    fn device(&self) -> &Device;

    fn device_mut(&mut self) -> &mut Device;

    /// Custom presentation.  Return `true` if presentation is fully handled
    /// here; `false` makes the node present every sub-device afterwards.
    fn present(&mut self, _io: &mut NodeIo<'_>) -> bool {
        false
    }

    /// Should the scheduler take a reading now?
    fn ready(&mut self, _io: &mut NodeIo<'_>) -> Readiness {
        Readiness::Wait(Deadline::Never)
    }

    /// Take a reading.  Returns `true` if there is new data worth reporting.
    fn sense(&mut self, _io: &mut NodeIo<'_>) -> bool {
        false
    }

    /// Send the sensed data upstream.  Returns `true` on success.  A sensor
    /// whose report failed must leave itself in a state where a later cycle
    /// sends the update again.
    fn report(&mut self, _io: &mut NodeIo<'_>) -> bool {
        false
    }

    /// Handle an inbound message.  Returns `true` iff the message was fully
    /// handled and no other sensor should see it.
    fn react(&mut self, _msg: &Message, _io: &mut NodeIo<'_>) -> bool {
        false
    }

    /// Wake line this sensor relies on while it is not ready.
    fn interrupt_line(&self) -> Option<WakeLine> {
        None
    }

    /// Node-level service wanted after the last report, consumed on read.
    fn node_request(&mut self) -> Option<NodeRequest> {
        None
    }
}
