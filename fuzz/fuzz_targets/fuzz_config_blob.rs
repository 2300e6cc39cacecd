//! Fuzz target: stored configuration blob
//!
//! Writes arbitrary bytes under the config key and loads them back through
//! [`ConfigPort::load`].  A blob is either rejected or yields a config that
//! passes validation; it never panics.
//!
//! cargo fuzz run fuzz_config_blob

#![no_main]

use libfuzzer_sys::fuzz_target;
use watering::adapters::nvs::NvsAdapter;
use watering::app::ports::{ConfigPort, StoragePort};
use watering::app::service::STORAGE_NAMESPACE;

fuzz_target!(|data: &[u8]| {
    let Ok(mut store) = NvsAdapter::new() else {
        return;
    };
    if store.write(STORAGE_NAMESPACE, "config", data).is_err() {
        return;
    }
    if let Ok(cfg) = store.load() {
        assert!(cfg.validate().is_ok());
    }
});
