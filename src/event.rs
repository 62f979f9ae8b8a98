//! Normalized trace events
//!
//! An [`EventRecord`] is built once per raw hook invocation and handed, read
//! only, to every registered observer. The per-category predicates
//! (`is_call`, `is_before`, ...) are generated alongside the category table in
//! [`crate::classifier`].

use crate::classifier::{self, Category};
use crate::context::{Context, ObjectRef};
use std::fmt;

/// Raw event kinds delivered by a host's trace hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    /// A scripted method was entered
    Call,
    /// A native (host-implemented) method was entered
    NativeCall,
    Return,
    NativeReturn,
    /// A new source line is about to run
    Line,
    /// A class or module body was entered
    Class,
    /// A class or module body was left
    ScopeEnd,
    Raise,
}

impl EventKind {
    pub const ALL: [EventKind; 8] = [
        EventKind::Call,
        EventKind::NativeCall,
        EventKind::Return,
        EventKind::NativeReturn,
        EventKind::Line,
        EventKind::Class,
        EventKind::ScopeEnd,
        EventKind::Raise,
    ];

    /// Parse the kind string a host passes to the hook
    ///
    /// Accepts the classic hook spellings (`c-call`, `end`) as well as the
    /// descriptive ones (`native-call`, `scope-end`, `class-enter`).
    pub fn from_raw(raw: &str) -> Option<Self> {
        match raw {
            "call" => Some(Self::Call),
            "c-call" | "native-call" => Some(Self::NativeCall),
            "return" => Some(Self::Return),
            "c-return" | "native-return" => Some(Self::NativeReturn),
            "line" => Some(Self::Line),
            "class" | "class-enter" => Some(Self::Class),
            "end" | "scope-end" => Some(Self::ScopeEnd),
            "raise" => Some(Self::Raise),
            _ => None,
        }
    }

    /// The classic hook spelling of this kind
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::NativeCall => "c-call",
            Self::Return => "return",
            Self::NativeReturn => "c-return",
            Self::Line => "line",
            Self::Class => "class",
            Self::ScopeEnd => "end",
            Self::Raise => "raise",
        }
    }

    /// Events that open a scope and push onto the context stack
    pub fn is_call_like(self) -> bool {
        matches!(self, Self::Call | Self::NativeCall | Self::Class)
    }

    /// Events that close a scope and pop the context stack
    pub fn is_return_like(self) -> bool {
        matches!(self, Self::Return | Self::NativeReturn | Self::ScopeEnd)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized trace event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    kind: Option<EventKind>,
    file: String,
    line: u32,
    method: Option<String>,
    context: Option<Context>,
    previous: Option<Context>,
}

impl EventRecord {
    /// Build a record; the previous context defaults to `context`
    pub fn new(
        kind: Option<EventKind>,
        file: impl Into<String>,
        line: u32,
        method: Option<String>,
        context: Option<Context>,
    ) -> Self {
        Self {
            kind,
            file: file.into(),
            line,
            method,
            previous: context.clone(),
            context,
        }
    }

    /// Override the previous context; `None` keeps the default
    pub fn with_previous(mut self, previous: Option<Context>) -> Self {
        if previous.is_some() {
            self.previous = previous;
        }
        self
    }

    pub fn kind(&self) -> Option<EventKind> {
        self.kind
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    /// Name of the method active at this event
    pub fn method_name(&self) -> Option<&str> {
        self.method.as_deref()
    }

    /// Alias of [`EventRecord::method_name`]
    pub fn called(&self) -> Option<&str> {
        self.method_name()
    }

    /// Context active at this event, or the top-level context
    pub fn context(&self) -> &Context {
        self.context.as_ref().unwrap_or_else(|| Context::top_level())
    }

    /// Context captured at the matching call-like event
    pub fn previous_context(&self) -> &Context {
        self.previous.as_ref().unwrap_or_else(|| self.context())
    }

    /// Whether a real context was supplied or backfilled
    pub fn has_context(&self) -> bool {
        self.context.is_some()
    }

    /// Object that owns the active context (`self` in the traced program)
    pub fn self_context(&self) -> &ObjectRef {
        self.context().owner()
    }

    pub fn is_defined(&self) -> bool {
        self.kind.is_some()
    }

    pub fn is_undefined(&self) -> bool {
        self.kind.is_none()
    }

    /// Membership test against a category
    pub fn matches(&self, category: Category) -> bool {
        self.kind
            .is_some_and(|kind| category.kinds().contains(&kind))
    }

    /// Membership test against a category given by name
    ///
    /// Unknown names never match.
    pub fn matches_name(&self, name: &str) -> bool {
        self.kind
            .is_some_and(|kind| classifier::kinds_for_name(name).contains(&kind))
    }

    /// Every category this event belongs to, in table order
    pub fn categories(&self) -> Vec<Category> {
        self.kind.map(classifier::categories_for).unwrap_or_default()
    }

    /// First of `arms` this event belongs to
    ///
    /// Lets callers dispatch over categories with a plain `match`:
    ///
    /// ```
    /// use tracepoint::{Category, EventKind, EventRecord};
    ///
    /// let ev = EventRecord::new(Some(EventKind::NativeCall), "a.rb", 1, None, None);
    /// let label = match ev.select(&[Category::Before, Category::After]) {
    ///     Some(Category::Before) => "enter",
    ///     Some(_) => "leave",
    ///     None => "other",
    /// };
    /// assert_eq!(label, "enter");
    /// ```
    pub fn select(&self, arms: &[Category]) -> Option<Category> {
        arms.iter().copied().find(|c| self.matches(*c))
    }
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.kind.map_or("?", EventKind::as_str);
        write!(f, "{:<8} {}:{}", kind, self.file, self.line)?;
        if let Some(method) = &self.method {
            write!(f, " {}#{}", self.self_context().class, method)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::FrameId;

    fn ctx(frame: u64, class: &str) -> Context {
        Context::new(FrameId(frame), ObjectRef::new(class, frame * 10))
    }

    #[test]
    fn test_from_raw_round_trips_classic_spellings() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_raw(kind.as_str()), Some(kind));
        }
        assert_eq!(EventKind::from_raw("native-call"), Some(EventKind::NativeCall));
        assert_eq!(EventKind::from_raw("scope-end"), Some(EventKind::ScopeEnd));
        assert_eq!(EventKind::from_raw("c_call"), None);
        assert_eq!(EventKind::from_raw(""), None);
    }

    #[test]
    fn test_call_and_return_like_are_disjoint() {
        for kind in EventKind::ALL {
            assert!(!(kind.is_call_like() && kind.is_return_like()));
        }
        assert!(!EventKind::Line.is_call_like());
        assert!(!EventKind::Raise.is_return_like());
    }

    #[test]
    fn test_missing_context_falls_back_to_top_level() {
        let ev = EventRecord::new(Some(EventKind::Line), "main.rb", 3, None, None);
        assert!(!ev.has_context());
        assert!(ev.context().is_top_level());
        assert!(ev.previous_context().is_top_level());
        assert_eq!(ev.self_context().class, "Object");
    }

    #[test]
    fn test_previous_defaults_to_context() {
        let c = ctx(1, "Greeter");
        let ev = EventRecord::new(Some(EventKind::Call), "g.rb", 1, Some("greet".into()), Some(c.clone()));
        assert_eq!(ev.previous_context(), &c);

        let ev = ev.with_previous(None);
        assert_eq!(ev.previous_context(), &c);
    }

    #[test]
    fn test_with_previous_overrides() {
        let callee = ctx(2, "Integer");
        let caller = ctx(1, "Object");
        let ev = EventRecord::new(Some(EventKind::NativeReturn), "a.rb", 1, Some("+".into()), Some(caller.clone()))
            .with_previous(Some(callee.clone()));
        assert_eq!(ev.context(), &caller);
        assert_eq!(ev.previous_context(), &callee);
    }

    #[test]
    fn test_called_aliases_method_name() {
        let ev = EventRecord::new(Some(EventKind::NativeCall), "a.rb", 1, Some("+".into()), None);
        assert_eq!(ev.called(), Some("+"));
        assert_eq!(ev.method_name(), ev.called());
    }

    #[test]
    fn test_defined_undefined() {
        let ev = EventRecord::new(None, "a.rb", 1, None, None);
        assert!(ev.is_undefined());
        assert!(!ev.is_defined());
        assert!(!ev.matches(Category::All));
        assert!(ev.categories().is_empty());
    }

    #[test]
    fn test_matches_unknown_name_is_false() {
        let ev = EventRecord::new(Some(EventKind::Call), "a.rb", 1, None, None);
        assert!(!ev.matches_name("nonexistent"));
        assert!(ev.matches_name("call"));
        assert!(ev.matches_name(":before"));
    }

    #[test]
    fn test_select_prefers_first_arm() {
        let ev = EventRecord::new(Some(EventKind::Return), "a.rb", 1, None, None);
        assert_eq!(ev.select(&[Category::Return, Category::After]), Some(Category::Return));
        assert_eq!(ev.select(&[Category::After, Category::Return]), Some(Category::After));
        assert_eq!(ev.select(&[Category::Line]), None);
    }

    #[test]
    fn test_display() {
        let ev = EventRecord::new(
            Some(EventKind::NativeCall),
            "a.rb",
            4,
            Some("+".into()),
            Some(ctx(3, "Integer")),
        );
        assert_eq!(ev.to_string(), "c-call   a.rb:4 Integer#+");
    }
}
