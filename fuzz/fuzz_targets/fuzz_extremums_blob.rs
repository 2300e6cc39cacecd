//! Fuzz target: persisted min/max statistics
//!
//! cargo fuzz run fuzz_extremums_blob

#![no_main]

use libfuzzer_sys::fuzz_target;
use watering::sensors::extremums::Extremums;

fuzz_target!(|data: &[u8]| {
    if let Ok(stats) = Extremums::from_bytes(data) {
        // Whatever decodes must encode again.
        let bytes = stats.to_bytes().expect("re-encode");
        assert!(Extremums::from_bytes(&bytes).is_ok());
    }
});
