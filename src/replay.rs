//! Offline replay of captured raw event streams
//!
//! A capture is a JSON-lines file, one raw hook invocation per line:
//!
//! ```text
//! {"kind":"c-call","file":"a.rb","line":1,"method":"+","context":{"frame":2,"owner":{"class":"Integer","id":3}},"owner":"Integer"}
//! {"kind":"c-return","file":"a.rb","line":1,"method":"+","owner":"Integer"}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. [`ReplayHost`] plays
//! the events into whatever hook a [`crate::Tracer`] installs.

use crate::context::Context;
use crate::error::{Result, TraceError};
use crate::host::{RawEvent, RawHook, TraceHost};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// One captured raw event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedEvent {
    pub kind: String,
    pub file: String,
    pub line: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Context>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl CapturedEvent {
    pub fn new(kind: &str, file: &str, line: u32) -> Self {
        Self {
            kind: kind.to_string(),
            file: file.to_string(),
            line,
            method: None,
            context: None,
            owner: None,
        }
    }

    pub fn method(mut self, method: &str) -> Self {
        self.method = Some(method.to_string());
        self
    }

    pub fn context(mut self, context: Context) -> Self {
        self.context = Some(context);
        self
    }

    pub fn owner(mut self, owner: &str) -> Self {
        self.owner = Some(owner.to_string());
        self
    }

    pub fn as_raw(&self) -> RawEvent<'_> {
        RawEvent {
            kind: &self.kind,
            file: &self.file,
            line: self.line,
            method: self.method.as_deref(),
            context: self.context.as_ref(),
            owner: self.owner.as_deref(),
        }
    }
}

/// Parse a JSON-lines capture
pub fn read_events<R: BufRead>(reader: R) -> Result<Vec<CapturedEvent>> {
    let mut events = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let event = serde_json::from_str(trimmed).map_err(|source| TraceError::Replay {
            line: index + 1,
            source,
        })?;
        events.push(event);
    }
    Ok(events)
}

/// Load a JSON-lines capture from disk
pub fn load<P: AsRef<Path>>(path: P) -> Result<Vec<CapturedEvent>> {
    let file = File::open(path.as_ref())?;
    read_events(BufReader::new(file))
}

/// Host that feeds captured events to the installed hook
#[derive(Default)]
pub struct ReplayHost {
    hook: RefCell<Option<RawHook>>,
}

impl ReplayHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_hooked(&self) -> bool {
        self.hook.borrow().is_some()
    }

    /// Deliver one raw event; returns whether a hook was installed
    pub fn emit_raw(&self, raw: &RawEvent<'_>) -> bool {
        let hook = self.hook.borrow().clone();
        match hook {
            Some(hook) => {
                hook(raw);
                true
            }
            None => false,
        }
    }

    pub fn emit(&self, event: &CapturedEvent) -> bool {
        self.emit_raw(&event.as_raw())
    }

    /// Deliver every event in order; returns how many reached a hook
    pub fn play(&self, events: &[CapturedEvent]) -> usize {
        events.iter().filter(|e| self.emit(e)).count()
    }
}

impl TraceHost for ReplayHost {
    fn set_trace_func(&self, hook: Option<RawHook>) {
        *self.hook.borrow_mut() = hook;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{FrameId, ObjectRef};
    use std::io::Cursor;
    use std::rc::Rc;

    const CAPTURE: &str = r#"
# captured from a.rb
{"kind":"c-call","file":"a.rb","line":1,"method":"+","context":{"frame":2,"owner":{"class":"Integer","id":3}},"owner":"Integer"}

{"kind":"c-return","file":"a.rb","line":1,"method":"+","owner":"Integer"}
"#;

    #[test]
    fn test_read_events_skips_comments_and_blanks() {
        let events = read_events(Cursor::new(CAPTURE)).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, "c-call");
        assert_eq!(
            events[0].context,
            Some(Context::new(FrameId(2), ObjectRef::new("Integer", 3)))
        );
        assert_eq!(events[1].context, None);
        assert_eq!(events[1].method.as_deref(), Some("+"));
    }

    #[test]
    fn test_read_events_reports_line_number() {
        let input = "{\"kind\":\"line\",\"file\":\"a.rb\",\"line\":1}\nnot json\n";
        let err = read_events(Cursor::new(input)).unwrap_err();
        assert!(matches!(err, TraceError::Replay { line: 2, .. }));
    }

    #[test]
    fn test_builder_serializes_compactly() {
        let event = CapturedEvent::new("line", "a.rb", 4).method("main");
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"kind":"line","file":"a.rb","line":4,"method":"main"}"#);
    }

    #[test]
    fn test_emit_without_hook() {
        let host = ReplayHost::new();
        assert!(!host.emit(&CapturedEvent::new("line", "a.rb", 1)));
    }

    #[test]
    fn test_play_delivers_in_order() {
        let host = ReplayHost::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        host.set_trace_func(Some(Rc::new(move |raw: &RawEvent<'_>| {
            sink.borrow_mut().push(raw.kind.to_string());
        })));
        let events = read_events(Cursor::new(CAPTURE)).unwrap();
        assert_eq!(host.play(&events), 2);
        assert_eq!(*seen.borrow(), vec!["c-call", "c-return"]);

        host.set_trace_func(None);
        assert!(!host.is_hooked());
        assert_eq!(host.play(&events), 0);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(load("/nonexistent/capture.jsonl"), Err(TraceError::Io(_))));
    }
}
