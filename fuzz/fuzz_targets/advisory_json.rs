#![no_main]

use libfuzzer_sys::fuzz_target;
use depwatch_lookup::AdvisoryDb;

fuzz_target!(|data: &[u8]| {
    if let Ok(content) = std::str::from_utf8(data) {
        if let Ok(entries) = AdvisoryDb::parse_entries(content) {
            let _ = AdvisoryDb::from_entries(entries);
        }
    }
});
