//! Unified error types for the sensor node.
//!
//! Every fallible operation reports through one of these enums.  All
//! variants are `Copy` so they can be logged, stored on a [`Device`] or
//! returned from the scheduler without allocation.
//!
//! [`Device`]: crate::device::Device

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Node or device configuration was rejected or clamped.
    Config(ConfigError),
    /// Persisted state could not be read back.
    Storage(StorageError),
    /// A sensing probe failed to produce a reading.
    Probe(ProbeError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Probe(e) => write!(f, "probe: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Configuration errors never stop the node.  The offending registration
/// is clamped or rejected and the rest of the node keeps running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A device asked for more sub-devices than fit; it was truncated.
    TooManySubDevices { requested: u8, max: u8 },
    /// The node's sensor table is full.
    TooManySensors { max: u8 },
    /// An explicit device id is already owned by another sub-device.
    DuplicateId(u8),
    /// Every assignable device id has been handed out.
    IdSpaceExhausted,
    /// A configuration field failed range validation.
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManySubDevices { requested, max } => {
                write!(f, "too many sub-devices ({requested} requested, max {max})")
            }
            Self::TooManySensors { max } => write!(f, "sensor table full (max {max})"),
            Self::DuplicateId(id) => write!(f, "device id {id} already in use"),
            Self::IdSpaceExhausted => write!(f, "no device ids left"),
            Self::Invalid(msg) => write!(f, "invalid: {msg}"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Storage errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Nothing has been written at the requested region.
    Empty,
    /// The stored blob does not fit the reserved region.
    TooLarge,
    /// The stored blob failed to decode.
    Corrupted,
    /// The backing store could not be opened.
    Unavailable,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "region empty"),
            Self::TooLarge => write!(f, "blob exceeds region"),
            Self::Corrupted => write!(f, "blob corrupted"),
            Self::Unavailable => write!(f, "backing store unavailable"),
        }
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Probe errors
// ---------------------------------------------------------------------------

/// Failure reading a sensing element.  The sensor skips the cycle and
/// tries again at its next interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeError {
    /// The probe did not answer in time.
    Timeout,
    /// The probe answered with a bad checksum.
    Checksum,
    /// The bus or pin driver reported an error.
    Bus,
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "no response"),
            Self::Checksum => write!(f, "checksum mismatch"),
            Self::Bus => write!(f, "bus error"),
        }
    }
}

impl From<ProbeError> for Error {
    fn from(e: ProbeError) -> Self {
        Self::Probe(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Node-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
