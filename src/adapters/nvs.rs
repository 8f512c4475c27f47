//! Non-volatile state storage.
//!
//! The node addresses storage as a flat byte array (`slot(id)` bytes plus
//! the config blob above them).  This adapter keeps that array as a RAM
//! image and mirrors it into a single NVS blob.
//!
//! - **`target_os = "espidf"`**: image restored from and written back to
//!   `EspNvs` namespace `sensornode`, key `state`.
//! - **`not(target_os = "espidf")`**: RAM image only; writes are counted so
//!   tests can see when the blob would have been flushed.

use log::{info, warn};

use crate::error::StorageError;
use crate::persistence::{CONFIG_BASE, CONFIG_MAX_LEN};
use crate::ports::StoragePort;

#[cfg(target_os = "espidf")]
use esp_idf_svc::nvs::{EspNvs, EspNvsPartition, NvsDefault};

/// Bytes covered by the image: every device slot plus the config region.
pub const STATE_SIZE: usize = CONFIG_BASE as usize + 1 + CONFIG_MAX_LEN;

/// Value of a byte that was never written.
const ERASED: u8 = 0xFF;

#[cfg(target_os = "espidf")]
const NAMESPACE: &str = "sensornode";
#[cfg(target_os = "espidf")]
const STATE_KEY: &str = "state";

pub struct NvsStorage {
    image: [u8; STATE_SIZE],
    #[cfg(target_os = "espidf")]
    nvs: EspNvs<NvsDefault>,
    #[cfg(not(target_os = "espidf"))]
    writes: usize,
}

impl NvsStorage {
    /// Open the default NVS partition and restore the saved image.  A
    /// missing or unreadable blob starts from an erased image.
    #[cfg(target_os = "espidf")]
    pub fn new() -> Result<Self, StorageError> {
        let partition = EspNvsPartition::<NvsDefault>::take().map_err(|_| StorageError::Unavailable)?;
        let nvs = EspNvs::new(partition, NAMESPACE, true).map_err(|_| StorageError::Unavailable)?;

        let mut image = [ERASED; STATE_SIZE];
        let restored = match nvs.get_blob(STATE_KEY, &mut image) {
            Ok(Some(data)) => Some(data.len()),
            Ok(None) => None,
            Err(e) => {
                warn!("NvsStorage: read failed ({:?}), starting erased", e);
                None
            }
        };
        match restored {
            Some(len) => info!("NvsStorage: restored {} bytes", len),
            None => image.fill(ERASED),
        }
        Ok(Self { image, nvs })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Result<Self, StorageError> {
        info!("NvsStorage(sim): RAM image ({} bytes)", STATE_SIZE);
        Ok(Self {
            image: [ERASED; STATE_SIZE],
            writes: 0,
        })
    }

    /// Number of times the image would have been written to flash.
    #[cfg(not(target_os = "espidf"))]
    pub fn writes(&self) -> usize {
        self.writes
    }

    #[cfg(target_os = "espidf")]
    fn persist(&mut self) {
        if let Err(e) = self.nvs.set_blob(STATE_KEY, &self.image) {
            warn!("NvsStorage: write failed ({:?})", e);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn persist(&mut self) {
        self.writes += 1;
    }
}

impl StoragePort for NvsStorage {
    fn load_state(&self, offset: u16) -> u8 {
        self.image.get(usize::from(offset)).copied().unwrap_or(ERASED)
    }

    /// Flash is only touched when the byte actually changes.
    fn save_state(&mut self, offset: u16, value: u8) {
        let Some(byte) = self.image.get_mut(usize::from(offset)) else {
            warn!("NvsStorage: offset {} outside the {}-byte image", offset, STATE_SIZE);
            return;
        };
        if *byte == value {
            return;
        }
        *byte = value;
        self.persist();
    }
}
