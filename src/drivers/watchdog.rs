//! Task watchdog for the control loop.
//!
//! The longest a healthy control iteration blocks is one turn maneuver or
//! one ramp delay. The timeout is sized from those so a wedged loop resets
//! the board instead of leaving the wheels spinning.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use crate::config::DriveConfig;

/// Lower bound on the timeout regardless of config.
const MIN_TIMEOUT_MS: u32 = 2_000;

/// Watchdog timeout for a given configuration: four times the longest
/// blocking step, never below [`MIN_TIMEOUT_MS`].
pub fn timeout_for(config: &DriveConfig) -> u32 {
    let longest = config
        .turn_duration_ms
        .max(config.ramp_step_delay_ms)
        .max(config.ramp_pause_ms)
        .max(config.poll_interval_ms);
    longest.saturating_mul(4).max(MIN_TIMEOUT_MS)
}

pub struct LoopWatchdog {
    timeout_ms: u32,
    #[cfg(target_os = "espidf")]
    subscribed: bool,
}

impl LoopWatchdog {
    /// Subscribe the calling task.
    pub fn new(config: &DriveConfig) -> Self {
        let timeout_ms = timeout_for(config);

        #[cfg(target_os = "espidf")]
        {
            // SAFETY: TWDT calls take no pointers except the task handle;
            // null selects the calling task.
            unsafe {
                let cfg = esp_task_wdt_config_t {
                    timeout_ms,
                    idle_core_mask: 0,
                    trigger_panic: true,
                };
                let ret = esp_task_wdt_reconfigure(&cfg);
                if ret != ESP_OK {
                    log::warn!("watchdog: reconfigure returned {} (may already be configured)", ret);
                }

                let subscribed = esp_task_wdt_add(core::ptr::null_mut()) == ESP_OK;
                if subscribed {
                    log::info!("watchdog: subscribed ({} ms timeout)", timeout_ms);
                } else {
                    log::warn!("watchdog: failed to subscribe control task");
                }
                Self { timeout_ms, subscribed }
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            log::info!("watchdog(sim): {} ms timeout, no-op", timeout_ms);
            Self { timeout_ms }
        }
    }

    /// Call once per control iteration.
    pub fn feed(&self) {
        #[cfg(target_os = "espidf")]
        {
            if self.subscribed {
                // SAFETY: resets the TWDT entry of the calling task only.
                unsafe {
                    esp_task_wdt_reset();
                }
            }
        }
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }
}
