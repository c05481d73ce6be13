//! A generic chain of name-binding frames.
//!
//! [`ScopeStack`] is the lookup discipline shared by the type checker's
//! symbol table and the IR builder's name environment: `declares` inspects
//! only the innermost frame, the `_recursive` variants walk outwards to the
//! global frame.

use indexmap::IndexMap;

/// A stack of insertion-ordered name frames.
#[derive(Debug, Clone)]
pub struct ScopeStack<T> {
    frames: Vec<IndexMap<String, T>>,
}

impl<T> ScopeStack<T> {
    /// A stack holding only the global frame.
    pub fn new() -> Self {
        ScopeStack {
            frames: vec![IndexMap::new()],
        }
    }

    /// Enter a new innermost frame.
    pub fn push(&mut self) {
        self.frames.push(IndexMap::new());
    }

    /// Leave the innermost frame. The global frame is never popped.
    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Does the innermost frame bind `name`?
    pub fn declares(&self, name: &str) -> bool {
        self.frames.last().is_some_and(|f| f.contains_key(name))
    }

    /// Does any frame bind `name`?
    pub fn declares_recursive(&self, name: &str) -> bool {
        self.frames.iter().rev().any(|f| f.contains_key(name))
    }

    /// Bind `name` in the innermost frame, replacing any existing binding
    /// there. Callers guard with [`declares`](Self::declares) when shadowing
    /// within a frame must be rejected.
    pub fn insert(&mut self, name: impl Into<String>, value: T) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.into(), value);
        }
    }

    /// Look up `name` in the innermost frame only.
    pub fn get(&self, name: &str) -> Option<&T> {
        self.frames.last().and_then(|f| f.get(name))
    }

    /// Look up `name` from the innermost frame outwards.
    pub fn get_recursive(&self, name: &str) -> Option<&T> {
        self.frames.iter().rev().find_map(|f| f.get(name))
    }

    /// Number of frames currently on the stack.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

impl<T> Default for ScopeStack<T> {
    fn default() -> Self {
        ScopeStack::new()
    }
}
