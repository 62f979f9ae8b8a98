//! Line coverage collected through the tracer
//!
//! Counts `line`, `call` and `end` events per source line. Results are kept
//! per file as a vector indexed by `line - 1`; lines never reached stay
//! `None`. Line numbers above [`MAX_COVERAGE_LINE`] are skipped and counted.

use crate::event::{EventKind, EventRecord};
use crate::tracer::Tracer;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use tracing::warn;

/// Registration name used by [`Coverage::start`]
pub const COVERAGE_OBSERVER: &str = "coverage";

/// Highest line number that gets a coverage slot
pub const MAX_COVERAGE_LINE: u32 = 1_000_000;

/// Per-file line hit counts
pub type CoverageResult = BTreeMap<String, Vec<Option<u64>>>;

/// Line coverage collector
#[derive(Debug, Clone, Default)]
pub struct Coverage {
    ignore: BTreeSet<String>,
    result: Rc<RefCell<CoverageResult>>,
    skipped: Rc<Cell<u64>>,
}

impl Coverage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip events from `file`
    pub fn ignore(mut self, file: impl Into<String>) -> Self {
        self.ignore.insert(file.into());
        self
    }

    pub fn is_ignored(&self, file: &str) -> bool {
        self.ignore.contains(file)
    }

    /// Whether `event` contributes to coverage
    pub fn counts(event: &EventRecord) -> bool {
        matches!(
            event.kind(),
            Some(EventKind::Line | EventKind::Call | EventKind::ScopeEnd)
        )
    }

    /// Count one event
    pub fn record(&self, event: &EventRecord) {
        if !Self::counts(event) || self.is_ignored(event.file()) {
            return;
        }
        // Line 0 marks events without a source position
        let Some(index) = (event.line() as usize).checked_sub(1) else {
            return;
        };
        if event.line() > MAX_COVERAGE_LINE {
            self.skipped.set(self.skipped.get() + 1);
            warn!(
                file = event.file(),
                line = event.line(),
                max = MAX_COVERAGE_LINE,
                "line number out of coverage range, skipped"
            );
            return;
        }
        let mut result = self.result.borrow_mut();
        let lines = result.entry(event.file().to_string()).or_default();
        if lines.len() <= index {
            lines.resize(index + 1, None);
        }
        *lines[index].get_or_insert(0) += 1;
    }

    /// Drop collected counts, keeping the ignore list
    pub fn reset(&self) {
        self.result.borrow_mut().clear();
        self.skipped.set(0);
    }

    /// Events dropped for a line number above [`MAX_COVERAGE_LINE`]
    pub fn skipped(&self) -> u64 {
        self.skipped.get()
    }

    /// Reset, register under [`COVERAGE_OBSERVER`] and activate `tracer`
    pub fn start(&self, tracer: &Tracer) {
        self.reset();
        let collector = self.clone();
        tracer.trace(Some(COVERAGE_OBSERVER), move |event| collector.record(event));
        tracer.activate();
    }

    /// Deactivate `tracer`; collected counts are kept
    pub fn stop(&self, tracer: &Tracer) {
        tracer.deactivate();
    }

    /// Snapshot of the collected counts
    pub fn result(&self) -> CoverageResult {
        self.result.borrow().clone()
    }

    /// Hit count for `file:line`, `None` if never reached
    pub fn hits(&self, file: &str, line: u32) -> Option<u64> {
        let index = (line as usize).checked_sub(1)?;
        self.result
            .borrow()
            .get(file)
            .and_then(|lines| lines.get(index).copied().flatten())
    }

    /// Print per-file coverage summary to stderr
    pub fn print_summary(&self) {
        print_result(&self.result.borrow());
    }
}

/// Print a per-file coverage table to stderr
pub fn print_result(result: &CoverageResult) {
    if result.is_empty() {
        eprintln!("\nNo coverage data collected.");
        return;
    }

    eprintln!();
    eprintln!("{:<50} {:>10} {:>10} {:>12}", "File", "Lines", "Hit", "Executions");
    eprintln!("{}", "─".repeat(85));
    for (file, lines) in result {
        let hit = lines.iter().filter(|l| l.is_some()).count();
        let executions: u64 = lines.iter().flatten().sum();
        eprintln!(
            "{:<50} {:>10} {:>10} {:>12}",
            file,
            lines.len(),
            hit,
            executions
        );
    }
    eprintln!("{}", "─".repeat(85));
}
