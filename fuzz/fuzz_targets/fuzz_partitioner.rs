#![no_main]

use libfuzzer_sys::fuzz_target;

use parframe_core::partitioner::{check_coverage, partition_range};

fuzz_target!(|data: &[u8]| {
    if data.len() < 18 {
        return;
    }
    let a = i64::from_le_bytes(data[0..8].try_into().unwrap());
    let b = i64::from_le_bytes(data[8..16].try_into().unwrap());
    // parts capped for speed
    let n_parts = usize::from(u16::from_le_bytes([data[16], data[17]]) % 4096);
    let (begin, end) = (a.min(b), a.max(b));

    match partition_range(begin, end, n_parts) {
        Ok(parts) => {
            assert_eq!(parts.len(), n_parts);
            check_coverage(&parts, begin, end).unwrap();
        }
        Err(_) => assert!(n_parts == 0 || begin == end),
    }
});
