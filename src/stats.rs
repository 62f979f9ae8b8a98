//! Event statistics tracking for -c mode

use crate::event::{EventKind, EventRecord};
use std::collections::{BTreeMap, HashMap};

/// Label used for events whose raw kind was not recognized
pub const UNDEFINED_KIND: &str = "undefined";

/// Statistics for a single method name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodStats {
    /// Entries (call, c-call)
    pub calls: u64,
    /// Exits (return, c-return)
    pub returns: u64,
    /// Exceptions raised while this method was innermost
    pub raises: u64,
}

/// Summary totals for all events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatTotals {
    pub total_events: u64,
    pub undefined: u64,
    pub methods: usize,
}

/// Tracks per-kind and per-method event counts
#[derive(Debug, Default)]
pub struct EventStats {
    kinds: BTreeMap<EventKind, u64>,
    undefined: u64,
    methods: HashMap<String, MethodStats>,
}

impl EventStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one normalized event
    pub fn record(&mut self, event: &EventRecord) {
        let Some(kind) = event.kind() else {
            self.undefined += 1;
            return;
        };
        *self.kinds.entry(kind).or_default() += 1;

        if let Some(method) = event.method_name() {
            let entry = self.methods.entry(method.to_string()).or_default();
            match kind {
                EventKind::Call | EventKind::NativeCall => entry.calls += 1,
                EventKind::Return | EventKind::NativeReturn => entry.returns += 1,
                EventKind::Raise => entry.raises += 1,
                _ => {}
            }
        }
    }

    pub fn kind_count(&self, kind: EventKind) -> u64 {
        self.kinds.get(&kind).copied().unwrap_or(0)
    }

    pub fn undefined_count(&self) -> u64 {
        self.undefined
    }

    pub fn method(&self, name: &str) -> Option<&MethodStats> {
        self.methods.get(name)
    }

    /// Per-kind counts in kind order, undefined last
    pub fn kind_rows(&self) -> Vec<(&'static str, u64)> {
        let mut rows: Vec<_> = self.kinds.iter().map(|(k, n)| (k.as_str(), *n)).collect();
        if self.undefined > 0 {
            rows.push((UNDEFINED_KIND, self.undefined));
        }
        rows
    }

    /// Per-method counts sorted by calls (descending), then name
    pub fn method_rows(&self) -> Vec<(&str, &MethodStats)> {
        let mut rows: Vec<_> = self.methods.iter().map(|(n, s)| (n.as_str(), s)).collect();
        rows.sort_by(|a, b| b.1.calls.cmp(&a.1.calls).then_with(|| a.0.cmp(b.0)));
        rows
    }

    pub fn totals(&self) -> StatTotals {
        StatTotals {
            total_events: self.kinds.values().sum::<u64>() + self.undefined,
            undefined: self.undefined,
            methods: self.methods.len(),
        }
    }

    /// Print statistics summary to stderr
    pub fn print_summary(&self) {
        let totals = self.totals();
        if totals.total_events == 0 {
            eprintln!("No events traced.");
            return;
        }

        eprintln!("% events     count kind");
        eprintln!("-------- --------- ----------------");
        for (kind, count) in self.kind_rows() {
            let percent = (count as f64 / totals.total_events as f64) * 100.0;
            eprintln!("{:8.2} {:>9} {}", percent, count, kind);
        }
        eprintln!("-------- --------- ----------------");
        eprintln!("  100.00 {:>9} total", totals.total_events);

        let methods = self.method_rows();
        if methods.is_empty() {
            return;
        }
        eprintln!();
        eprintln!("{:<32} {:>9} {:>9} {:>9}", "method", "calls", "returns", "raises");
        eprintln!("{}", "─".repeat(62));
        for (name, stats) in methods {
            eprintln!(
                "{:<32} {:>9} {:>9} {:>9}",
                name,
                stats.calls,
                stats.returns,
                if stats.raises > 0 {
                    stats.raises.to_string()
                } else {
                    String::new()
                }
            );
        }
    }
}
