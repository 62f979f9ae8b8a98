#![no_main]

use libfuzzer_sys::fuzz_target;
use std::rc::Rc;
use tracepoint::replay::{read_events, ReplayHost};
use tracepoint::{Coverage, Tracer};

fuzz_target!(|data: &[u8]| {
    // Whatever parses must also replay, with coverage on, without panicking
    if let Ok(events) = read_events(data) {
        let host = Rc::new(ReplayHost::new());
        let tracer = Tracer::new(Rc::clone(&host));
        tracer.trace(None, |ev| {
            let _ = ev.previous_context();
        });
        let coverage = Coverage::new();
        coverage.start(&tracer);
        host.play(&events);
        coverage.stop(&tracer);
        let _ = coverage.result();
        tracer.shutdown();
    }
});
