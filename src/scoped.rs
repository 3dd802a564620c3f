// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scoped tree value: immutable inheritance of per-builder defaults.
//!
//! A [`ScopedTreeValue`] is a small parent-pointer node used to propagate
//! process-wide defaults (loggers, indentation, the `printCommand` flag) down
//! through a tree of command builders without requiring every builder to
//! carry an owned copy. Reading walks up to the nearest ancestor-or-self that
//! was ever given a value; writing only ever touches the node it was called
//! on.

use std::sync::Arc;

use parking_lot::Mutex;

struct Node<T> {
    value: Mutex<Option<T>>,
    parent: Option<ScopedTreeValue<T>>,
}

/// A node in a scoped-value tree.
///
/// Cloning a `ScopedTreeValue` is cheap (it clones an `Arc`) and all clones
/// refer to the same node, so `setValue` through any clone is visible to the
/// others — this is what lets a long-lived default (e.g. a logger installed
/// once at the root) propagate to children created afterwards.
pub struct ScopedTreeValue<T> {
    node: Arc<Node<T>>,
}

impl<T> Clone for ScopedTreeValue<T> {
    fn clone(&self) -> Self {
        Self {
            node: Arc::clone(&self.node),
        }
    }
}

impl<T: Clone> ScopedTreeValue<T> {
    /// Create a new root node carrying `value`.
    pub fn new(value: T) -> Self {
        Self {
            node: Arc::new(Node {
                value: Mutex::new(Some(value)),
                parent: None,
            }),
        }
    }

    /// Create a root node with no value; `getValue` on it (and on children
    /// that never override) returns `None`.
    pub fn empty() -> Self {
        Self {
            node: Arc::new(Node {
                value: Mutex::new(None),
                parent: None,
            }),
        }
    }

    /// Create a fresh child node whose parent is `self`. The child starts
    /// with no value of its own, so it inherits whatever `self.get_value()`
    /// returns until `set_value` is called on the child.
    pub fn create_child(&self) -> Self {
        Self {
            node: Arc::new(Node {
                value: Mutex::new(None),
                parent: Some(self.clone()),
            }),
        }
    }

    /// Walk parent links until a node carrying a value is found, and return
    /// a clone of it. Returns `None` if neither this node nor any ancestor
    /// has ever been given a value.
    pub fn get_value(&self) -> Option<T> {
        let mut current = self;
        loop {
            if let Some(v) = current.node.value.lock().clone() {
                return Some(v);
            }
            match current.node.parent.as_ref() {
                Some(parent) => current = parent,
                None => return None,
            }
        }
    }

    /// Set this node's own value, shadowing whatever ancestors would
    /// otherwise supply. Does not affect the parent or any sibling that
    /// branched off the same parent.
    pub fn set_value(&self, value: T) {
        *self.node.value.lock() = Some(value);
    }
}

#[cfg(test)]
#[path = "scoped_tests.rs"]
mod tests;
