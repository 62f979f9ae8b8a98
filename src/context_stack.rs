//! Shadow call stack used to reconcile return events with their calls
//!
//! Hosts reliably hand a context to call-like events but often not to the
//! matching return. Every call-like event pushes the context it carried; every
//! return-like event pops, and the popped context fills in for a missing one.

use crate::context::Context;
use crate::event::EventKind;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Contexts resolved for a single event
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Reconciled {
    /// Context the event record should carry
    pub context: Option<Context>,
    /// Context captured at the matching call, for return-like events
    pub previous: Option<Context>,
    /// A return-like event arrived with nothing to pop
    pub underflow: bool,
}

#[derive(Debug, Default)]
pub(crate) struct ContextStack {
    frames: VecDeque<Option<Context>>,
    /// 0 = unbounded
    max_depth: usize,
}

impl ContextStack {
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            frames: VecDeque::new(),
            max_depth,
        }
    }

    pub fn push(&mut self, context: Option<Context>) {
        if self.max_depth > 0 && self.frames.len() >= self.max_depth {
            warn!(
                max_depth = self.max_depth,
                "context stack full, discarding outermost entry"
            );
            self.frames.pop_front();
        }
        self.frames.push_back(context);
    }

    /// Pop the innermost entry; `None` on underflow or when the entry was empty
    pub fn pop(&mut self) -> Option<Context> {
        self.frames.pop_back().flatten()
    }

    /// Innermost entry that carries a context
    pub fn peek(&self) -> Option<&Context> {
        self.frames.iter().rev().find_map(Option::as_ref)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Apply push/pop discipline for one event and resolve its contexts
    pub fn reconcile(&mut self, kind: Option<EventKind>, supplied: Option<Context>) -> Reconciled {
        match kind {
            Some(kind) if kind.is_call_like() => {
                let context = supplied.clone().or_else(|| self.peek().cloned());
                self.push(supplied);
                Reconciled {
                    context,
                    previous: None,
                    underflow: false,
                }
            }
            Some(kind) if kind.is_return_like() => {
                let underflow = self.is_empty();
                if underflow {
                    debug!(%kind, "return with empty context stack");
                }
                let popped = self.pop();
                let context = supplied
                    .or_else(|| popped.clone())
                    .or_else(|| self.peek().cloned());
                Reconciled {
                    context,
                    previous: popped,
                    underflow,
                }
            }
            _ => Reconciled {
                context: supplied.or_else(|| self.peek().cloned()),
                previous: None,
                underflow: false,
            },
        }
    }
}
