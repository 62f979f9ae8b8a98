//! Event filtering for -e trace= expressions
//!
//! Supports:
//! - Individual kinds: -e trace=call,line
//! - Categories: -e trace=before,after
//! - Everything: -e trace=all
//!
//! An optional method-name regex narrows the selection further.

use crate::classifier::Category;
use crate::error::{Result, TraceError};
use crate::event::EventRecord;
use regex::Regex;
use std::collections::BTreeSet;
use tracing::warn;

/// Filter that determines which normalized events to report
#[derive(Debug, Clone)]
pub struct EventFilter {
    /// Categories to include (None = all events)
    include: Option<BTreeSet<Category>>,
    /// Only events whose method name matches
    method: Option<Regex>,
}

impl EventFilter {
    /// Create a filter that includes all events
    pub fn all() -> Self {
        Self {
            include: None,
            method: None,
        }
    }

    /// Parse a filter expression like "trace=call,line" or "trace=before"
    pub fn from_expr(expr: &str) -> Result<Self> {
        match expr.strip_prefix("trace=") {
            Some(spec) => Self::from_trace_spec(spec),
            None => Err(TraceError::InvalidFilter(format!(
                "{expr}. Expected format: trace=SPEC"
            ))),
        }
    }

    /// Parse a trace specification (the part after "trace=")
    fn from_trace_spec(spec: &str) -> Result<Self> {
        let mut categories = BTreeSet::new();

        for part in spec.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let category = Category::lookup(part).ok_or_else(|| {
                warn!(category = part, "unknown category in filter");
                TraceError::InvalidFilter(format!("unknown category '{part}'"))
            })?;
            categories.insert(category);
        }

        if categories.contains(&Category::All) {
            return Ok(Self::all());
        }
        Ok(Self {
            include: Some(categories),
            method: None,
        })
    }

    /// Restrict to methods matching `pattern`
    pub fn with_method_pattern(mut self, pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern)
            .map_err(|e| TraceError::InvalidFilter(format!("method pattern: {e}")))?;
        self.method = Some(regex);
        Ok(self)
    }

    /// Check if an event should be reported
    pub fn should_trace(&self, event: &EventRecord) -> bool {
        if let Some(set) = &self.include {
            if !set.iter().any(|c| event.matches(*c)) {
                return false;
            }
        }
        match &self.method {
            None => true,
            Some(re) => event.method_name().is_some_and(|m| re.is_match(m)),
        }
    }
}
