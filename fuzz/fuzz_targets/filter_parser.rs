#![no_main]

use libfuzzer_sys::fuzz_target;
use tracepoint::{Category, EventFilter};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Neither parser may panic on arbitrary input
        let _ = EventFilter::from_expr(input);
        let _ = Category::lookup(input);
    }
});
