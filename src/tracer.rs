//! Trace point dispatcher
//!
//! A [`Tracer`] owns the observer registry and the activation state of one
//! trace session. While active it sits in its host's hook slot: every raw
//! event is filtered, reconciled against the shadow call stack, turned into
//! an [`EventRecord`] and handed to each observer in registration order.
//!
//! The handle is `Rc`-based and therefore confined to the thread that owns
//! the host. Observers may call back into the tracer (register, clear,
//! deactivate) while they run; events the host raises during delivery are
//! dropped rather than traced.

use crate::config::TracerConfig;
use crate::context_stack::ContextStack;
use crate::error::{Result, TraceError};
use crate::event::{EventKind, EventRecord};
use crate::host::{RawEvent, RawHook, TraceHost};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};
use tracing::{debug, error, trace, warn};

type SharedObserver = Rc<RefCell<dyn FnMut(&EventRecord)>>;

struct Registration {
    id: u64,
    /// Name for named registrations, `#<id>` otherwise
    label: Rc<str>,
    observer: SharedObserver,
}

/// Counters kept over the lifetime of a tracer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Records built and offered to observers
    pub events: u64,
    /// Raw events dropped by the re-entrancy guard or a suppression rule
    pub suppressed: u64,
    /// Return-like events that found the context stack empty
    pub underflows: u64,
    /// Raw events whose kind string was not recognized
    pub unknown_kinds: u64,
    /// Observer invocations that panicked
    pub observer_faults: u64,
}

struct TracerState {
    active: bool,
    dispatching: bool,
    registrations: Vec<Registration>,
    index: HashMap<String, u64>,
    next_id: u64,
    stack: ContextStack,
    stats: DispatchStats,
    config: TracerConfig,
}

/// Observer registry and activation state for one trace session
#[derive(Clone)]
pub struct Tracer {
    state: Rc<RefCell<TracerState>>,
    host: Rc<dyn TraceHost>,
}

impl Tracer {
    /// Create an inactive tracer for `host` with the default configuration
    pub fn new<H: TraceHost + 'static>(host: Rc<H>) -> Self {
        Self::with_config(host, TracerConfig::default())
    }

    pub fn with_config<H: TraceHost + 'static>(host: Rc<H>, config: TracerConfig) -> Self {
        let state = TracerState {
            active: false,
            dispatching: false,
            registrations: Vec::new(),
            index: HashMap::new(),
            next_id: 1,
            stack: ContextStack::with_max_depth(config.max_stack_depth),
            stats: DispatchStats::default(),
            config,
        };
        Self {
            state: Rc::new(RefCell::new(state)),
            host,
        }
    }

    /// Register an observer
    ///
    /// Registering under a name that is already taken replaces that
    /// observer in place, keeping its position in the delivery order.
    /// Registration does not depend on the activation state.
    pub fn trace<F>(&self, name: Option<&str>, observer: F)
    where
        F: FnMut(&EventRecord) + 'static,
    {
        let observer: SharedObserver = Rc::new(RefCell::new(observer));
        let mut s = self.state.borrow_mut();

        let existing = name.and_then(|n| s.index.get(n).copied());
        if let Some(id) = existing {
            if let Some(reg) = s.registrations.iter_mut().find(|r| r.id == id) {
                reg.observer = observer;
                debug!(name = ?name, "observer replaced");
                return;
            }
        }

        let id = s.next_id;
        s.next_id += 1;
        let label: Rc<str> = match name {
            Some(n) => {
                s.index.insert(n.to_string(), id);
                Rc::from(n)
            }
            None => Rc::from(format!("#{id}")),
        };
        debug!(observer = %label, "observer registered");
        s.registrations.push(Registration {
            id,
            label,
            observer,
        });
    }

    pub fn is_active(&self) -> bool {
        self.state.borrow().active
    }

    /// Install the hook and start delivering events
    ///
    /// The context stack starts empty. Activating an active tracer
    /// reinstalls the hook and resets the stack.
    pub fn activate(&self) {
        {
            let mut s = self.state.borrow_mut();
            s.stack.clear();
            s.active = true;
        }

        let weak: Weak<RefCell<TracerState>> = Rc::downgrade(&self.state);
        let hook: RawHook = Rc::new(move |raw: &RawEvent<'_>| {
            if let Some(state) = weak.upgrade() {
                dispatch(&state, raw);
            }
        });
        self.host.set_trace_func(Some(hook));
        debug!(observers = self.observer_count(), "tracing activated");
    }

    /// Uninstall the hook; a no-op when already inactive
    ///
    /// Registrations are kept.
    pub fn deactivate(&self) {
        let was_active = std::mem::replace(&mut self.state.borrow_mut().active, false);
        if was_active {
            self.host.set_trace_func(None);
            debug!("tracing deactivated");
        }
    }

    /// Remove the observer registered as `name`, or reset everything
    ///
    /// With no name the tracer is deactivated, every observer is dropped and
    /// the context stack is emptied.
    pub fn clear(&self, name: Option<&str>) -> Result<()> {
        match name {
            Some(name) => {
                let mut s = self.state.borrow_mut();
                let id = s
                    .index
                    .remove(name)
                    .ok_or_else(|| TraceError::UndefinedTrace(name.to_string()))?;
                s.registrations.retain(|r| r.id != id);
                debug!(name, "observer removed");
                Ok(())
            }
            None => {
                self.deactivate();
                let mut s = self.state.borrow_mut();
                s.registrations.clear();
                s.index.clear();
                s.stack.clear();
                debug!("tracer cleared");
                Ok(())
            }
        }
    }

    /// Full reset: deactivate and drop every observer
    pub fn shutdown(&self) {
        // Unnamed clear cannot fail
        let _ = self.clear(None);
    }

    pub fn observer_count(&self) -> usize {
        self.state.borrow().registrations.len()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.state.borrow().index.contains_key(name)
    }

    pub fn stats(&self) -> DispatchStats {
        self.state.borrow().stats
    }

    pub fn config(&self) -> TracerConfig {
        self.state.borrow().config.clone()
    }
}

impl fmt::Debug for Tracer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state.try_borrow() {
            Ok(s) => f
                .debug_struct("Tracer")
                .field("active", &s.active)
                .field("observers", &s.registrations.len())
                .field("depth", &s.stack.depth())
                .field("stats", &s.stats)
                .finish(),
            Err(_) => f.debug_struct("Tracer").finish_non_exhaustive(),
        }
    }
}

/// Clears the dispatching flag even if an observer unwinds
struct DispatchGuard<'a>(&'a RefCell<TracerState>);

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut s) = self.0.try_borrow_mut() {
            s.dispatching = false;
        }
    }
}

/// Hook body: filter, reconcile, build the record and fan it out
fn dispatch(state: &RefCell<TracerState>, raw: &RawEvent<'_>) {
    let Ok(mut s) = state.try_borrow_mut() else {
        return;
    };
    if !s.active {
        return;
    }
    if s.dispatching || s.config.is_suppressed(raw.owner, raw.method) {
        s.stats.suppressed += 1;
        trace!(kind = raw.kind, method = ?raw.method, owner = ?raw.owner, "event suppressed");
        return;
    }

    let kind = EventKind::from_raw(raw.kind);
    if kind.is_none() {
        s.stats.unknown_kinds += 1;
        warn!(kind = raw.kind, file = raw.file, line = raw.line, "unrecognized event kind");
    }

    let reconciled = s.stack.reconcile(kind, raw.context.cloned());
    if reconciled.underflow {
        s.stats.underflows += 1;
    }
    let record = EventRecord::new(
        kind,
        raw.file,
        raw.line,
        raw.method.map(str::to_string),
        reconciled.context,
    )
    .with_previous(reconciled.previous);
    s.stats.events += 1;

    if s.registrations.is_empty() {
        return;
    }
    let isolate = s.config.isolate_observer_faults;
    // Observers registered while this event is delivered start with the next one
    let limit = s.next_id;
    s.dispatching = true;
    drop(s);

    let _guard = DispatchGuard(state);
    let mut cursor = 0;
    while let Some((id, label, observer)) = next_observer(state, cursor, limit) {
        cursor = id;
        if !isolate {
            (&mut *observer.borrow_mut())(&record);
            continue;
        }
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            (&mut *observer.borrow_mut())(&record);
        }));
        if let Err(payload) = outcome {
            error!(
                observer = %label,
                message = panic_message(payload.as_ref()),
                kind = ?record.kind(),
                "observer panicked, continuing with remaining observers"
            );
            state.borrow_mut().stats.observer_faults += 1;
        }
    }
}

/// First live registration after `cursor` whose id is below `limit`
///
/// Registrations stay sorted by id: new ones are appended with a fresh id
/// and replacements keep theirs. Looking the next one up on every step means
/// an observer cleared mid-delivery is never called afterwards.
fn next_observer(
    state: &RefCell<TracerState>,
    cursor: u64,
    limit: u64,
) -> Option<(u64, Rc<str>, SharedObserver)> {
    let s = state.borrow();
    let at = s.registrations.partition_point(|r| r.id <= cursor);
    s.registrations
        .get(at)
        .filter(|r| r.id < limit)
        .map(|r| (r.id, Rc::clone(&r.label), Rc::clone(&r.observer)))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}
