//! Per-thread stack of active contexts.
//!
//! The top of the stack is the *current* context. Every thread starts with an
//! empty stack, so a context made current on one thread is never current on
//! another.
//!
//! [`activate`] and [`deactivate`] push and pop. [`ContextGuard`] pairs them
//! for a scope and restores the previous top on every exit path, including
//! early returns through `?` and unwinding.
//!
//! ```
//! # use alkit::prelude::*;
//! # use alkit::context::registry;
//! # fn main() -> alkit::AlResult<()> {
//! let device = Device::open_default()?;
//! let first = device.create_context()?;
//! let second = device.create_context()?;
//! {
//!     let _outer = first.activate()?;
//!     {
//!         let _inner = second.activate()?;
//!         assert!(second.is_current());
//!     }
//!     assert!(first.is_current());
//! }
//! assert!(registry::current().is_none());
//! # Ok(())
//! # }
//! ```
use std::{cell::RefCell, marker::PhantomData, rc::Rc};

use crate::context::{inner::ContextInner, ContextRef};

thread_local! {
    // Destroyed contexts leave `None` behind so depths recorded by live
    // guards stay valid.
    static STACK: RefCell<Vec<Option<Rc<ContextInner>>>> = const { RefCell::new(Vec::new()) };
}

/// Pushes `context`, making it current until the matching [`deactivate`].
pub fn activate(context: &ContextRef) {
    push(context.inner.clone());
}

/// Pops the top entry. Does nothing on an empty stack.
pub fn deactivate() {
    STACK.with(|s| {
        s.borrow_mut().pop();
    });
    tracing::trace!(depth = depth(), "context deactivated");
}

/// The current context, if any.
pub fn current() -> Option<ContextRef> {
    current_inner().map(|inner| ContextRef { inner })
}

/// Number of entries on this thread's stack, including cleared ones.
pub fn depth() -> usize {
    STACK.with(|s| s.borrow().len())
}

pub(crate) fn push(inner: Rc<ContextInner>) -> usize {
    let name = inner.name;
    let depth = STACK.with(|s| {
        let mut stack = s.borrow_mut();
        stack.push(Some(inner));
        stack.len()
    });
    tracing::trace!(context = name, depth, "context activated");
    depth
}

pub(crate) fn current_inner() -> Option<Rc<ContextInner>> {
    STACK.with(|s| s.borrow().last().cloned().flatten())
}

/// Replaces the top entry, or pushes when the stack is empty.
pub(crate) fn replace_top(inner: Option<Rc<ContextInner>>) {
    STACK.with(|s| {
        let mut stack = s.borrow_mut();
        match stack.last_mut() {
            Some(top) => *top = inner,
            None => stack.push(inner),
        }
    });
}

pub(crate) fn truncate(depth: usize) {
    STACK.with(|s| s.borrow_mut().truncate(depth));
}

/// Clears every entry referring to `inner` on this thread.
pub(crate) fn forget(inner: &Rc<ContextInner>) {
    STACK.with(|s| {
        for entry in s.borrow_mut().iter_mut() {
            if entry.as_ref().is_some_and(|e| Rc::ptr_eq(e, inner)) {
                *entry = None;
            }
        }
    });
}

/// Keeps a context current for a scope.
///
/// Created by [`ContextOps::activate`](crate::context::ContextOps::activate).
/// Dropping the guard pops back to the entry that was on top when it was
/// created.
#[must_use = "the context is deactivated as soon as the guard is dropped"]
pub struct ContextGuard<'a> {
    depth: usize,
    _context: PhantomData<&'a ContextInner>,
}

impl<'a> ContextGuard<'a> {
    pub(crate) fn new(inner: &'a Rc<ContextInner>) -> Self {
        let depth = push(inner.clone());
        Self {
            depth,
            _context: PhantomData,
        }
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        truncate(self.depth.saturating_sub(1));
        tracing::trace!(depth = depth(), "context guard released");
    }
}
