#![forbid(unsafe_code)]

//! The host text surface an engine is attached to.
//!
//! A surface is the only thing the engine reads from or writes to: one line of
//! text, a disabled / read-only state, and a single "value committed" channel
//! that hosts bridge to their own change events.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;

bitflags! {
    /// Interaction state reported by a surface.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SurfaceFlags: u8 {
        const DISABLED = 0b0000_0001;
        const READ_ONLY = 0b0000_0010;
    }
}

impl SurfaceFlags {
    /// True when the engine must not write to the surface.
    #[inline]
    #[must_use]
    pub const fn is_locked(self) -> bool {
        self.intersects(Self::DISABLED.union(Self::READ_ONLY))
    }
}

/// What kind of control backs a surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceKind {
    /// Single-line text input.
    Text,
    /// Native numeric input.
    Number,
    /// Anything else (multi-line areas, selects, buttons...). Rejected at attach.
    Other(String),
}

impl SurfaceKind {
    #[must_use]
    pub fn accepts_spinner(&self) -> bool {
        matches!(self, Self::Text | Self::Number)
    }
}

impl fmt::Display for SurfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Number => f.write_str("number"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

/// Host-implemented text surface.
pub trait ValueSurface {
    fn kind(&self) -> SurfaceKind {
        SurfaceKind::Text
    }

    /// Current raw text.
    fn text(&self) -> String;

    /// Replace the raw text. Must not fire change events on its own.
    fn set_text(&mut self, text: &str);

    fn flags(&self) -> SurfaceFlags {
        SurfaceFlags::empty()
    }

    /// Called exactly once per constrained write that changed the text.
    fn value_committed(&mut self) {}
}

#[derive(Debug, Default)]
struct MemoryInner {
    kind: Option<SurfaceKind>,
    text: String,
    flags: SurfaceFlags,
    commits: usize,
}

/// In-memory surface with a shared handle.
///
/// Clones refer to the same text, so a host (or test) can keep one handle
/// while the engine owns another and still edit the text, toggle flags, and
/// count committed changes.
#[derive(Debug, Clone, Default)]
pub struct MemorySurface {
    inner: Rc<RefCell<MemoryInner>>,
}

impl MemorySurface {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        let surface = Self::default();
        surface.inner.borrow_mut().text = text.into();
        surface
    }

    /// A surface reporting a custom kind, for exercising attach validation.
    #[must_use]
    pub fn with_kind(kind: SurfaceKind) -> Self {
        let surface = Self::default();
        surface.inner.borrow_mut().kind = Some(kind);
        surface
    }

    /// Edit the text as a user would, without committing.
    pub fn type_text(&self, text: impl Into<String>) {
        self.inner.borrow_mut().text = text.into();
    }

    #[must_use]
    pub fn current_text(&self) -> String {
        self.inner.borrow().text.clone()
    }

    pub fn set_flags(&self, flags: SurfaceFlags) {
        self.inner.borrow_mut().flags = flags;
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.inner
            .borrow_mut()
            .flags
            .set(SurfaceFlags::DISABLED, disabled);
    }

    pub fn set_read_only(&self, read_only: bool) {
        self.inner
            .borrow_mut()
            .flags
            .set(SurfaceFlags::READ_ONLY, read_only);
    }

    /// Number of committed changes so far.
    #[must_use]
    pub fn commit_count(&self) -> usize {
        self.inner.borrow().commits
    }

    pub fn reset_commit_count(&self) {
        self.inner.borrow_mut().commits = 0;
    }
}

impl ValueSurface for MemorySurface {
    fn kind(&self) -> SurfaceKind {
        self.inner
            .borrow()
            .kind
            .clone()
            .unwrap_or(SurfaceKind::Text)
    }

    fn text(&self) -> String {
        self.current_text()
    }

    fn set_text(&mut self, text: &str) {
        let mut inner = self.inner.borrow_mut();
        inner.text.clear();
        inner.text.push_str(text);
    }

    fn flags(&self) -> SurfaceFlags {
        self.inner.borrow().flags
    }

    fn value_committed(&mut self) {
        self.inner.borrow_mut().commits += 1;
    }
}
