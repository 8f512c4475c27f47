//! Persistent-state addressing.
//!
//! ```text
//!   offset  0        4        8            1020     1024 ........ 1024+1+N
//!           ├ id 0 ──┼ id 1 ──┼ ...    ────┼ id 254 ┼ config blob ┤
//!           │s a . . │s a . . │                     │len│postcard │
//! ```
//!
//! Each device id owns a 4-byte slot: `s` is its main state byte, `a` an
//! auxiliary byte (e.g. the last on-level of a light before it was turned
//! off).  The node configuration lives after the last slot.

use log::{info, warn};

use crate::config::NodeConfig;
use crate::device::MAX_DEVICE_ID;
use crate::error::{self, StorageError};
use crate::ports::StoragePort;

/// Bytes reserved per device id.
pub const SLOT_STRIDE: u16 = 4;

/// First offset of the persisted node configuration.
pub const CONFIG_BASE: u16 = (MAX_DEVICE_ID as u16 + 1) * SLOT_STRIDE + SLOT_STRIDE;

/// Largest encoded configuration that fits the region.
pub const CONFIG_MAX_LEN: usize = 96;

/// Offset of the main state byte for `id`.
pub const fn slot(id: u8) -> u16 {
    id as u16 * SLOT_STRIDE
}

/// Offset of the auxiliary state byte for `id`.
pub const fn aux_slot(id: u8) -> u16 {
    slot(id) + 1
}

/// Stores [`NodeConfig`] as a length-prefixed postcard blob.
pub struct ConfigStore;

impl ConfigStore {
    pub fn save(storage: &mut dyn StoragePort, config: &NodeConfig) -> Result<(), StorageError> {
        let bytes = postcard::to_allocvec(config).map_err(|_| StorageError::Corrupted)?;
        if bytes.is_empty() || bytes.len() > CONFIG_MAX_LEN {
            return Err(StorageError::TooLarge);
        }
        storage.save_state(CONFIG_BASE, bytes.len() as u8);
        for (i, b) in bytes.iter().enumerate() {
            storage.save_state(CONFIG_BASE + 1 + i as u16, *b);
        }
        info!("ConfigStore: saved {} bytes", bytes.len());
        Ok(())
    }

    pub fn load(storage: &dyn StoragePort) -> Result<NodeConfig, StorageError> {
        let len = usize::from(storage.load_state(CONFIG_BASE));
        // Erased EEPROM reads back as 0xFF.
        if len == 0 || len > CONFIG_MAX_LEN {
            return Err(StorageError::Empty);
        }
        let mut buf = [0u8; CONFIG_MAX_LEN];
        for (i, b) in buf.iter_mut().take(len).enumerate() {
            *b = storage.load_state(CONFIG_BASE + 1 + i as u16);
        }
        let cfg: NodeConfig = postcard::from_bytes(&buf[..len]).map_err(|_| StorageError::Corrupted)?;
        if cfg.validate().is_err() {
            warn!("ConfigStore: stored config failed validation");
            return Err(StorageError::Corrupted);
        }
        Ok(cfg)
    }

    /// Validate a JSON provisioning document and persist it.
    pub fn provision(storage: &mut dyn StoragePort, json: &str) -> error::Result<NodeConfig> {
        let cfg = NodeConfig::from_json(json)?;
        Self::save(storage, &cfg)?;
        Ok(cfg)
    }

    /// Stored configuration, or the defaults if none is usable.
    pub fn load_or_default(storage: &dyn StoragePort) -> NodeConfig {
        match Self::load(storage) {
            Ok(cfg) => cfg,
            Err(e) => {
                info!("ConfigStore: {} -- using defaults", e);
                NodeConfig::default()
            }
        }
    }
}
