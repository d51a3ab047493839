//! Fuzz target: `DriveConfig::from_json`
//!
//! Arbitrary documents must either be rejected with a typed error or
//! yield a config that passes validation again.
//!
//! cargo fuzz run fuzz_config_json

#![no_main]

use libfuzzer_sys::fuzz_target;
use twindrive::config::DriveConfig;

fuzz_target!(|data: &[u8]| {
    if let Ok(config) = DriveConfig::from_json(data) {
        assert!(config.validate().is_ok());
        assert!(config.clamp_speed(u8::MAX) <= 100);
    }
});
