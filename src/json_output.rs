//! JSON output format for normalized event traces

use crate::coverage::CoverageResult;
use crate::event::EventRecord;
use crate::stats::UNDEFINED_KIND;
use crate::tracer::DispatchStats;
use serde::{Deserialize, Serialize};

/// A single normalized event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonEvent {
    /// Event kind (e.g., "call", "c-return"), "undefined" if unrecognized
    pub kind: String,
    pub file: String,
    pub line: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Receiver of the active scope, e.g. "Integer(3)"
    #[serde(rename = "self")]
    pub receiver: String,
    pub frame: u64,
    /// Frame of the scope being left (return-like events only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_frame: Option<u64>,
}

impl From<&EventRecord> for JsonEvent {
    fn from(event: &EventRecord) -> Self {
        let frame = event.context().frame().0;
        let previous = event.previous_context().frame().0;
        Self {
            kind: event
                .kind()
                .map_or(UNDEFINED_KIND, |k| k.as_str())
                .to_string(),
            file: event.file().to_string(),
            line: event.line(),
            method: event.method_name().map(str::to_string),
            receiver: event.self_context().to_string(),
            frame,
            previous_frame: (previous != frame).then_some(previous),
        }
    }
}

/// Summary counters for the trace
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonSummary {
    /// Events written to the output
    pub total_events: u64,
    /// Events delivered by the dispatcher, before filtering
    pub dispatched: u64,
    pub suppressed: u64,
    pub undefined: u64,
    pub observer_faults: u64,
}

/// Root JSON output structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonOutput {
    /// Format version identifier
    pub version: String,
    /// Format name
    pub format: String,
    pub events: Vec<JsonEvent>,
    pub summary: JsonSummary,
    /// Per-file line hits (if --coverage enabled)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage: Option<CoverageResult>,
}

impl JsonOutput {
    pub fn new() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: "tracepoint-json-v1".to_string(),
            events: Vec::new(),
            summary: JsonSummary::default(),
            coverage: None,
        }
    }

    pub fn add_event(&mut self, event: &EventRecord) {
        self.summary.total_events += 1;
        if event.is_undefined() {
            self.summary.undefined += 1;
        }
        self.events.push(JsonEvent::from(event));
    }

    /// Copy dispatcher counters into the summary
    pub fn set_dispatch_stats(&mut self, stats: DispatchStats) {
        self.summary.dispatched = stats.events;
        self.summary.suppressed = stats.suppressed;
        self.summary.observer_faults = stats.observer_faults;
    }

    pub fn set_coverage(&mut self, coverage: CoverageResult) {
        self.coverage = Some(coverage);
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Default for JsonOutput {
    fn default() -> Self {
        Self::new()
    }
}
