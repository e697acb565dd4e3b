#![no_main]

use benchtrack::harness::{parse_harness_output, Tool};
use benchtrack::model::{parse_entry, Commit};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Must reject or accept, never panic
        let _ = parse_entry(input);
        for tool in Tool::ALL {
            let _ = parse_harness_output(tool, input, Commit::with_id("fuzz"), 0);
        }
    }
});
