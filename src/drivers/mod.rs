//! Output helpers shared by the reference actuators: fade curves and icon bitmaps.

pub mod fade;
pub mod icons;
