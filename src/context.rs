//! Execution context handles
//!
//! A context stands in for the lexical scope that was active when an event
//! fired: the object that owns it (`self` in the traced program) and the call
//! frame it belongs to. Hosts hand contexts to the trace hook; the tracer only
//! compares, stores and returns them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Frame id reserved for the top-level scope
pub const TOP_LEVEL_FRAME: FrameId = FrameId(0);

static TOP_LEVEL: LazyLock<Context> =
    LazyLock::new(|| Context::new(TOP_LEVEL_FRAME, ObjectRef::new("Object", 0)));

/// Identifier of a call frame in the traced program
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameId(pub u64);

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame#{}", self.0)
    }
}

/// Identity of an object in the traced program
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    /// Class (or module) name of the object
    pub class: String,
    /// Host-assigned object id
    pub id: u64,
}

impl ObjectRef {
    pub fn new(class: impl Into<String>, id: u64) -> Self {
        Self {
            class: class.into(),
            id,
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.class, self.id)
    }
}

/// Opaque handle to the scope active at a trace event
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Context {
    frame: FrameId,
    owner: ObjectRef,
}

impl Context {
    pub fn new(frame: FrameId, owner: ObjectRef) -> Self {
        Self { frame, owner }
    }

    /// The top-level scope, used whenever no better context is known
    pub fn top_level() -> &'static Context {
        &TOP_LEVEL
    }

    /// Object identity that owns this scope
    pub fn owner(&self) -> &ObjectRef {
        &self.owner
    }

    pub fn frame(&self) -> FrameId {
        self.frame
    }

    pub fn is_top_level(&self) -> bool {
        self == Self::top_level()
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.owner, self.frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_level_is_stable() {
        let a = Context::top_level();
        let b = Context::top_level();
        assert!(std::ptr::eq(a, b));
        assert!(a.is_top_level());
        assert_eq!(a.frame(), TOP_LEVEL_FRAME);
        assert_eq!(a.owner().class, "Object");
    }

    #[test]
    fn test_context_equality_uses_frame_and_owner() {
        let owner = ObjectRef::new("Integer", 3);
        let a = Context::new(FrameId(4), owner.clone());
        let b = Context::new(FrameId(4), owner.clone());
        let c = Context::new(FrameId(5), owner);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(!a.is_top_level());
    }

    #[test]
    fn test_display() {
        let ctx = Context::new(FrameId(2), ObjectRef::new("Greeter", 17));
        assert_eq!(ctx.to_string(), "Greeter(17) @ frame#2");
    }

    #[test]
    fn test_serde_shape() {
        let ctx = Context::new(FrameId(9), ObjectRef::new("Integer", 3));
        let json = serde_json::to_string(&ctx).unwrap();
        assert_eq!(json, r#"{"frame":9,"owner":{"class":"Integer","id":3}}"#);
        let back: Context = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ctx);
    }
}
