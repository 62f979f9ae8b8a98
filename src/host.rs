//! Host runtime boundary
//!
//! A host owns exactly one trace hook slot. It calls the installed hook
//! synchronously, inline with the traced program, once per qualifying event.
//!
//! [`Runtime`] is a small frame-tracking host. It behaves like the classic
//! `set_trace_func` runtimes the tracer was designed around: it supplies a
//! context on call-like events but not on returns, and it reports its own
//! hook-installation primitive as a native call on `Kernel`.

use crate::context::{Context, FrameId, ObjectRef};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// One raw hook invocation: `(kind, file, line, method, context, owner)`
#[derive(Debug, Clone, Copy)]
pub struct RawEvent<'a> {
    /// Kind string, e.g. `"c-call"`
    pub kind: &'a str,
    pub file: &'a str,
    pub line: u32,
    pub method: Option<&'a str>,
    /// Scope handle, when the host has one for this event
    pub context: Option<&'a Context>,
    /// Enclosing class or module name
    pub owner: Option<&'a str>,
}

/// Callback installed into a host
pub type RawHook = Rc<dyn Fn(&RawEvent<'_>)>;

/// The host's trace hook slot
pub trait TraceHost {
    /// Install `hook`, replacing any previous one; `None` uninstalls
    ///
    /// Uninstalling when nothing is installed must be a no-op.
    fn set_trace_func(&self, hook: Option<RawHook>);
}

/// Owner reported for the hook-installation primitive
pub const KERNEL: &str = "Kernel";
/// Method name reported for the hook-installation primitive
pub const SET_TRACE_FUNC: &str = "set_trace_func";

struct Frame {
    context: Context,
    method: Option<String>,
}

/// Minimal frame-tracking host runtime
pub struct Runtime {
    file: String,
    hook: RefCell<Option<RawHook>>,
    frames: RefCell<Vec<Frame>>,
    next_frame: Cell<u64>,
    next_object: Cell<u64>,
}

impl Runtime {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            hook: RefCell::new(None),
            frames: RefCell::new(Vec::new()),
            next_frame: Cell::new(1),
            next_object: Cell::new(1),
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn is_hooked(&self) -> bool {
        self.hook.borrow().is_some()
    }

    /// Allocate a fresh object of `class`
    ///
    /// Ids are even so they never collide with integer identities.
    pub fn object(&self, class: &str) -> ObjectRef {
        let id = self.next_object.get();
        self.next_object.set(id + 1);
        ObjectRef::new(class, id << 1)
    }

    /// Identity of an integer value
    pub fn integer(&self, value: i64) -> ObjectRef {
        ObjectRef::new("Integer", ((value as u64) << 1) | 1)
    }

    /// Context of the innermost frame
    pub fn current(&self) -> Context {
        self.frames
            .borrow()
            .last()
            .map(|f| f.context.clone())
            .unwrap_or_else(|| Context::top_level().clone())
    }

    /// Method of the innermost frame, if it is a method frame
    pub fn current_method(&self) -> Option<String> {
        self.frames.borrow().last().and_then(|f| f.method.clone())
    }

    pub fn depth(&self) -> usize {
        self.frames.borrow().len()
    }

    fn new_context(&self, owner: &ObjectRef) -> Context {
        let frame = self.next_frame.get();
        self.next_frame.set(frame + 1);
        Context::new(FrameId(frame), owner.clone())
    }

    fn push_frame(&self, context: &Context, method: Option<&str>) {
        self.frames.borrow_mut().push(Frame {
            context: context.clone(),
            method: method.map(str::to_string),
        });
    }

    fn emit(
        &self,
        kind: &str,
        line: u32,
        method: Option<&str>,
        context: Option<&Context>,
        owner: Option<&str>,
    ) {
        // Clone out of the slot so the hook may reinstall or uninstall itself
        let hook = self.hook.borrow().clone();
        if let Some(hook) = hook {
            hook(&RawEvent {
                kind,
                file: &self.file,
                line,
                method,
                context,
                owner,
            });
        }
    }

    /// Execute a source line in the current frame
    pub fn line(&self, line: u32) {
        let ctx = self.current();
        let method = self.current_method();
        self.emit("line", line, method.as_deref(), Some(&ctx), Some(&ctx.owner().class));
    }

    /// Call a scripted method on `receiver`
    pub fn invoke<R>(
        &self,
        receiver: &ObjectRef,
        method: &str,
        line: u32,
        body: impl FnOnce(&Runtime) -> R,
    ) -> R {
        let ctx = self.new_context(receiver);
        self.push_frame(&ctx, Some(method));
        self.emit("call", line, Some(method), Some(&ctx), Some(&receiver.class));
        let result = body(self);
        self.frames.borrow_mut().pop();
        self.emit("return", line, Some(method), None, Some(&receiver.class));
        result
    }

    /// Call a host-implemented method on `receiver`
    pub fn invoke_native<R>(
        &self,
        receiver: &ObjectRef,
        method: &str,
        line: u32,
        body: impl FnOnce() -> R,
    ) -> R {
        let ctx = self.new_context(receiver);
        self.emit("c-call", line, Some(method), Some(&ctx), Some(&receiver.class));
        let result = body();
        self.emit("c-return", line, Some(method), None, Some(&receiver.class));
        result
    }

    /// Run a class body
    pub fn class_body<R>(&self, name: &str, line: u32, body: impl FnOnce(&Runtime) -> R) -> R {
        let class = self.object(name);
        let ctx = self.new_context(&class);
        self.push_frame(&ctx, None);
        self.emit("class", line, None, Some(&ctx), Some(name));
        let result = body(self);
        self.frames.borrow_mut().pop();
        self.emit("end", line, None, None, Some(name));
        result
    }

    /// Signal that an exception is being raised from the current frame
    pub fn raise(&self, line: u32) {
        let ctx = self.current();
        let method = self.current_method();
        self.emit("raise", line, method.as_deref(), Some(&ctx), Some(&ctx.owner().class));
    }

    /// Native integer addition: `a + b`
    pub fn int_add(&self, a: i64, b: i64, line: u32) -> i64 {
        let receiver = self.integer(a);
        self.invoke_native(&receiver, "+", line, || a.wrapping_add(b))
    }
}

impl TraceHost for Runtime {
    fn set_trace_func(&self, hook: Option<RawHook>) {
        let ctx = self.current();
        match hook {
            Some(hook) => {
                *self.hook.borrow_mut() = Some(hook);
                self.emit("c-return", 0, Some(SET_TRACE_FUNC), Some(&ctx), Some(KERNEL));
            }
            None => {
                self.emit("c-call", 0, Some(SET_TRACE_FUNC), Some(&ctx), Some(KERNEL));
                *self.hook.borrow_mut() = None;
            }
        }
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("file", &self.file)
            .field("hooked", &self.is_hooked())
            .field("depth", &self.depth())
            .finish()
    }
}
