//! Bounded-step geometric fade.
//!
//! Brightness is perceived roughly logarithmically, so levels move by a
//! constant *ratio* per step instead of a constant amount.  The ratio is
//! chosen so the fade lands on the target after `max_steps` steps whatever
//! the distance:
//!
//! ```text
//!   ratio   = (target / start) ^ (1 / max_steps)
//!   level_k = start * ratio^k          (rounded away from start)
//! ```
//!
//! Every step moves at least one unit, the target is never overshot, and
//! the final step is pinned to the target, so a fade always finishes in at
//! most `max_steps` steps in either direction.  Levels of zero are treated
//! as one when computing the ratio.

/// Iterator over the levels of one fade, excluding the starting level.
#[derive(Debug, Clone)]
pub struct Fade {
    base: f32,
    ratio: f32,
    level: u8,
    target: u8,
    step: u8,
    max_steps: u8,
}

impl Fade {
    pub fn new(from: u8, target: u8, max_steps: u8) -> Self {
        let max_steps = max_steps.max(1);
        let base = f32::from(from.max(1));
        let end = f32::from(target.max(1));
        Self {
            base,
            ratio: (end / base).powf(1.0 / f32::from(max_steps)),
            level: from,
            target,
            step: 0,
            max_steps,
        }
    }

    /// Per-step multiplicative factor.
    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn target(&self) -> u8 {
        self.target
    }

    pub fn is_done(&self) -> bool {
        self.level == self.target
    }
}

impl Iterator for Fade {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        if self.level == self.target {
            return None;
        }
        self.step += 1;

        let next = if self.step >= self.max_steps {
            self.target
        } else {
            let exact = self.base * self.ratio.powi(i32::from(self.step));
            if self.target > self.level {
                let candidate = exact.ceil().clamp(0.0, 255.0) as u8;
                candidate.max(self.level + 1).min(self.target)
            } else {
                let candidate = exact.floor().clamp(0.0, 255.0) as u8;
                candidate.min(self.level - 1).max(self.target)
            }
        };

        self.level = next;
        Some(next)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.is_done() {
            return (0, Some(0));
        }
        let by_steps = usize::from(self.max_steps - self.step);
        let by_distance = usize::from(self.level.abs_diff(self.target));
        (1, Some(by_steps.min(by_distance)))
    }
}
