//! Sleep planning and clock repair.
//!
//! Pure functions so the timing rules can be checked without a node:
//!
//! | Bound    | Lines armed | Request                          |
//! |----------|-------------|----------------------------------|
//! | `At(t)`  | any         | `For(t - now)`, lines as early wake |
//! | `Never`  | ≥ 1         | `Indefinite`                     |
//! | `Never`  | 0           | `For(MAX - now)` + warning       |

use heapless::Vec;
use log::warn;

use crate::ports::{Edge, Millis, SleepRequest, WAKE_LINE_COUNT, WakeArm, WakeLine, WakeSource};
use crate::sensors::Deadline;

/// Set of armed wake lines, sized by the hardware line count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WakeLineSet {
    armed: [bool; WAKE_LINE_COUNT],
}

impl WakeLineSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, line: WakeLine) {
        self.armed[line.index()] = true;
    }

    pub fn contains(&self, line: WakeLine) -> bool {
        self.armed[line.index()]
    }

    pub fn is_empty(&self) -> bool {
        !self.armed.iter().any(|a| *a)
    }

    pub fn len(&self) -> usize {
        self.armed.iter().filter(|a| **a).count()
    }

    /// Armed lines in ascending order.
    pub fn lines(&self) -> impl Iterator<Item = WakeLine> + '_ {
        self.armed
            .iter()
            .enumerate()
            .filter(|(_, armed)| **armed)
            .filter_map(|(i, _)| WakeLine::new(i as u8))
    }

    /// Arm specifications for the sleep primitive.
    pub fn arms(&self, edge: Edge) -> Vec<WakeArm, WAKE_LINE_COUNT> {
        let mut out = Vec::new();
        for line in self.lines() {
            // At most WAKE_LINE_COUNT lines exist.
            let _ = out.push(WakeArm { line, edge });
        }
        out
    }
}

/// Outcome of sleep planning for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepPlan {
    /// Time before sleeping.
    pub before: Millis,
    /// Absolute time the clock is set to after a timer wake.
    pub until: Millis,
    pub request: SleepRequest,
    pub lines: WakeLineSet,
}

impl SleepPlan {
    /// Relative sleep length, `None` for an indefinite sleep.
    pub fn length(&self) -> Option<Millis> {
        match self.request {
            SleepRequest::For(ms) => Some(ms),
            SleepRequest::Indefinite => None,
        }
    }
}

/// Turn the aggregated sleep-until bound and armed lines into a sleep
/// request.
pub fn plan_sleep(now: Millis, bound: Deadline, lines: WakeLineSet) -> SleepPlan {
    let (until, request) = match bound.at() {
        Some(t) => (t.max(now), SleepRequest::For(t.saturating_sub(now))),
        None if !lines.is_empty() => (Millis::MAX, SleepRequest::Indefinite),
        None => {
            warn!("Node: no deadline and no wake line armed -- sleeping for the longest possible time");
            (Millis::MAX, SleepRequest::For(Millis::MAX - now))
        }
    };
    SleepPlan {
        before: now,
        until,
        request,
        lines,
    }
}

/// Clock value to restore after waking from `plan`.
///
/// A timer wake means the whole duration elapsed, so the target is exact.
/// After an interrupt or an early wake the elapsed time is unknown; the
/// smallest forward step keeps the clock monotonic.  An indefinite sleep has
/// no target, so any wake from it is treated the same way.
pub fn restored_millis(plan: &SleepPlan, source: WakeSource) -> Millis {
    match (source, plan.request) {
        (WakeSource::Timer, SleepRequest::For(_)) => plan.until,
        _ => plan.before.saturating_add(1),
    }
}
