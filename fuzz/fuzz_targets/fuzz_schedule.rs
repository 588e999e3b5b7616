#![no_main]

use libfuzzer_sys::fuzz_target;

use parframe_core::Schedule;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    // Anything that parses must be a valid schedule
    if let Ok(schedule) = text.parse::<Schedule>() {
        assert!(schedule.validate().is_ok());
    }
});
