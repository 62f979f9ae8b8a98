//! Tracepoint - normalized runtime trace hooks
//!
//! This library sits in a host runtime's single trace hook slot and turns the
//! raw `(kind, file, line, method, context, owner)` callbacks into classified
//! [`EventRecord`]s. Contexts the host omits on return events are recovered
//! from a shadow call stack, and the records are delivered to any number of
//! registered observers.
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use tracepoint::{Runtime, Tracer};
//!
//! let rt = Rc::new(Runtime::new("main.rb"));
//! let tracer = Tracer::new(Rc::clone(&rt));
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&seen);
//! tracer.trace(None, move |ev| {
//!     if ev.is_before() {
//!         sink.borrow_mut().push(ev.method_name().unwrap_or("").to_string());
//!     }
//! });
//!
//! tracer.activate();
//! rt.int_add(1, 1, 1);
//! tracer.deactivate();
//!
//! assert_eq!(*seen.borrow(), vec!["+"]);
//! ```

pub mod classifier;
pub mod cli;
pub mod config;
pub mod context;
mod context_stack;
pub mod coverage;
pub mod csv_output;
pub mod error;
pub mod event;
pub mod filter;
pub mod host;
pub mod json_output;
pub mod replay;
pub mod session;
pub mod stats;
pub mod tracer;

pub use classifier::Category;
pub use config::{SuppressRule, TracerConfig};
pub use context::{Context, FrameId, ObjectRef};
pub use coverage::Coverage;
pub use error::{Result, TraceError};
pub use event::{EventKind, EventRecord};
pub use filter::EventFilter;
pub use host::{RawEvent, RawHook, Runtime, TraceHost};
pub use replay::ReplayHost;
pub use tracer::{DispatchStats, Tracer};
