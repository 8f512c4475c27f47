//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter    | Implements    | Connects to                         |
//! |------------|---------------|-------------------------------------|
//! | `log_sink` | NetworkPort   | Serial log, wraps any transport     |
//! | `nvs`      | StoragePort   | ESP-IDF NVS blob (RAM image on host)|
//! | `sim`      | NetworkPort   | In-memory radio (host / tests)      |
//! |            | StoragePort   | In-memory EEPROM                    |
//! |            | ClockPort     | Scripted clock and wake sources     |
//! | `time`     | ClockPort     | ESP32 system timer + light sleep    |

pub mod log_sink;
pub mod nvs;
pub mod sim;
pub mod time;
