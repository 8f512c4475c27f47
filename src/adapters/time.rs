//! System clock / sleep adapter.
//!
//! - **`target_os = "espidf"`**: millisecond counter from
//!   `esp_timer_get_time()` plus a software offset (so the node can
//!   overwrite it), light sleep with timer and GPIO wake sources.
//! - **`not(target_os = "espidf")`**: `std::time::Instant` and
//!   `thread::sleep` for host runs.  Host builds have no wake lines, so an
//!   indefinite sleep returns immediately and a capped sleep reports
//!   [`WakeSource::Early`].
//!
//! The software offset is signed and `millis()` saturates, so a counter
//! restored to `Millis::MAX` stays there instead of wrapping.

use log::debug;

use crate::ports::{ClockPort, Millis, SleepRequest, WAKE_LINE_COUNT, WakeArm, WakeSource};

#[cfg(target_os = "espidf")]
use crate::ports::Edge;
#[cfg(target_os = "espidf")]
use esp_idf_sys::*;

/// Longest single host sleep; keeps a misconfigured node responsive.
#[cfg(not(target_os = "espidf"))]
const HOST_SLEEP_CAP_MS: Millis = 60_000;

/// Clock and sleep adapter.  `wake_pins[n]` is the GPIO behind wake line `n`.
pub struct SystemClock {
    offset: i64,
    #[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
    wake_pins: [i32; WAKE_LINE_COUNT],
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl SystemClock {
    /// Configure the wake-line GPIOs as inputs.
    #[cfg(target_os = "espidf")]
    pub fn new(wake_pins: [i32; WAKE_LINE_COUNT]) -> anyhow::Result<Self> {
        for pin in wake_pins {
            // SAFETY: called once at boot from the main task.
            let ret = unsafe { gpio_set_direction(pin, gpio_mode_t_GPIO_MODE_INPUT) };
            if ret != ESP_OK {
                anyhow::bail!("wake pin {} config failed (rc={})", pin, ret);
            }
        }
        log::info!("SystemClock: wake lines on GPIO {:?}", wake_pins);
        Ok(Self { offset: 0, wake_pins })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(wake_pins: [i32; WAKE_LINE_COUNT]) -> anyhow::Result<Self> {
        log::info!("SystemClock(sim): wake lines {:?} not wired on host", wake_pins);
        Ok(Self {
            offset: 0,
            wake_pins,
            start: std::time::Instant::now(),
        })
    }

    #[cfg(target_os = "espidf")]
    fn raw_millis(&self) -> Millis {
        ((unsafe { esp_timer_get_time() }) / 1000) as Millis
    }

    #[cfg(not(target_os = "espidf"))]
    fn raw_millis(&self) -> Millis {
        self.start.elapsed().as_millis() as Millis
    }

    #[cfg(target_os = "espidf")]
    fn sleep_hw(&mut self, arms: &[WakeArm], request: SleepRequest) -> WakeSource {
        // SAFETY: single-threaded scheduler; nothing else touches the sleep
        // configuration while the node is deciding to sleep.
        unsafe {
            if let SleepRequest::For(ms) = request {
                esp_sleep_enable_timer_wakeup(u64::from(ms) * 1000);
            }
            let mut before = [0i32; WAKE_LINE_COUNT];
            for arm in arms {
                let pin = self.wake_pins[arm.line.index()];
                let level = gpio_get_level(pin);
                before[arm.line.index()] = level;
                let wake_high = match arm.edge {
                    Edge::Rising => true,
                    Edge::Falling => false,
                    Edge::Change => level == 0,
                };
                let intr = if wake_high {
                    gpio_int_type_t_GPIO_INTR_HIGH_LEVEL
                } else {
                    gpio_int_type_t_GPIO_INTR_LOW_LEVEL
                };
                gpio_wakeup_enable(pin, intr);
            }
            if !arms.is_empty() {
                esp_sleep_enable_gpio_wakeup();
            }

            esp_light_sleep_start();

            let cause = esp_sleep_get_wakeup_cause();
            let mut source = WakeSource::Timer;
            if cause == esp_sleep_source_t_ESP_SLEEP_WAKEUP_GPIO {
                source = arms
                    .iter()
                    .find(|a| gpio_get_level(self.wake_pins[a.line.index()]) != before[a.line.index()])
                    .or(arms.first())
                    .map_or(WakeSource::Timer, |a| WakeSource::Interrupt(a.line));
            }

            for arm in arms {
                gpio_wakeup_disable(self.wake_pins[arm.line.index()]);
            }
            esp_sleep_disable_wakeup_source(esp_sleep_source_t_ESP_SLEEP_WAKEUP_ALL);
            source
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn sleep_hw(&mut self, arms: &[WakeArm], request: SleepRequest) -> WakeSource {
        match request {
            SleepRequest::For(ms) => {
                let capped = ms.min(HOST_SLEEP_CAP_MS);
                std::thread::sleep(std::time::Duration::from_millis(u64::from(capped)));
                if capped < ms {
                    debug!("SystemClock(sim): sleep capped at {} ms", capped);
                    WakeSource::Early
                } else {
                    WakeSource::Timer
                }
            }
            SleepRequest::Indefinite => {
                log::warn!("SystemClock(sim): indefinite sleep with {} line(s), no interrupts on host", arms.len());
                WakeSource::Early
            }
        }
    }
}

impl ClockPort for SystemClock {
    fn millis(&self) -> Millis {
        (i64::from(self.raw_millis()) + self.offset).clamp(0, i64::from(Millis::MAX)) as Millis
    }

    fn set_millis(&mut self, ms: Millis) {
        self.offset = i64::from(ms) - i64::from(self.raw_millis());
    }

    fn sleep(&mut self, arms: &[WakeArm], request: SleepRequest) -> WakeSource {
        debug!("SystemClock: sleeping {:?}", request);
        self.sleep_hw(arms, request)
    }
}
