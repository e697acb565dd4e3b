#![no_main]

use benchtrack::history::History;
use benchtrack::regression::{evaluate, RegressionConfig};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if let Ok(history) = History::from_json_str(input, "fuzz") {
            let names: Vec<String> = history.suite_names().map(str::to_string).collect();
            for suite in names {
                let _ = evaluate(&history, &suite, &RegressionConfig::default());
            }
            let _ = history.to_json_string(true);
        }
    }
});
